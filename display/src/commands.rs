//! Console commands.

use anyhow::{bail, Context, Result};

use overlay_ipc::{DisplayConfig, HostCommand, OverlayConfig};

/// Help text printed for `help` and unknown commands.
pub const HELP: &str = "commands: start | stop | retry | state | config <json> | quit";

/// Parse one console line.
///
/// Returns `Ok(None)` for blank lines.
pub fn parse_command(line: &str, config: &DisplayConfig) -> Result<Option<HostCommand>> {
    let line = line.trim();
    let (name, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(name, rest)| (name, rest.trim()));

    let command = match name {
        "" => return Ok(None),
        "start" => HostCommand::Start {
            config: config.clone(),
        },
        "stop" => HostCommand::Stop,
        "retry" => HostCommand::Retry,
        "state" => HostCommand::GetState,
        "config" => {
            let overrides: OverlayConfig =
                serde_json::from_str(rest).context("config expects a JSON object")?;
            HostCommand::UpdateConfig(overrides)
        }
        "quit" | "exit" => HostCommand::Shutdown,
        other => bail!("unknown command '{other}'"),
    };

    Ok(Some(command))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<Option<HostCommand>> {
        parse_command(line, &DisplayConfig::default())
    }

    #[test]
    fn test_simple_commands() {
        assert!(matches!(parse("retry"), Ok(Some(HostCommand::Retry))));
        assert!(matches!(parse("  state "), Ok(Some(HostCommand::GetState))));
        assert!(matches!(parse("stop"), Ok(Some(HostCommand::Stop))));
        assert!(matches!(parse("quit"), Ok(Some(HostCommand::Shutdown))));
        assert!(matches!(parse("start"), Ok(Some(HostCommand::Start { .. }))));
        assert!(matches!(parse(""), Ok(None)));
    }

    #[test]
    fn test_config_command() {
        match parse(r#"config {"fontSize": 32, "showUsernames": false}"#) {
            Ok(Some(HostCommand::UpdateConfig(config))) => {
                assert_eq!(config["fontSize"], 32);
                assert_eq!(config["showUsernames"], false);
            }
            other => panic!("unexpected: {:?}", other),
        }

        assert!(parse("config [1, 2]").is_err());
        assert!(parse("config").is_err());
    }

    #[test]
    fn test_unknown_command() {
        let err = parse("dance").unwrap_err();
        assert_eq!(err.to_string(), "unknown command 'dance'");
    }
}
