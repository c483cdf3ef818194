//! Event stream endpoint URL.

use url::Url;

use overlay_ipc::ConnectionConfig;

use crate::error::TransportError;
use crate::TransportResult;

/// Build the WebSocket URL for a connection.
pub fn build_websocket_url(config: &ConnectionConfig) -> TransportResult<Url> {
    if !config.has_credentials() {
        return Err(TransportError::MissingCredentials);
    }

    let mut url =
        Url::parse(&config.endpoint).map_err(|e| TransportError::InvalidUrl(e.to_string()))?;

    if url.scheme() != "ws" && url.scheme() != "wss" {
        return Err(TransportError::InvalidUrl(
            "URL must start with ws:// or wss://".to_string(),
        ));
    }

    url.query_pairs_mut()
        .append_pair("uniqueId", config.unique_id.trim())
        .append_pair("jwtKey", config.jwt_key.trim())
        .append_pair("schemaVersion", &config.schema_version.to_string())
        .append_pair("bundleEvents", if config.bundle_events { "true" } else { "false" });

    Ok(url)
}
