//! Connection statistics reporting.

use std::time::{Duration, Instant};

use tracing::trace;

use overlay_ipc::ConnectionStats;
use overlay_transport::TransportStatistics;

/// Default period between statistics reports.
pub const STATS_INTERVAL: Duration = Duration::from_secs(5);

/// Decides when statistics are due and builds the report.
#[derive(Debug, Clone)]
pub struct StatsReporter {
    interval: Duration,
    last_report: Option<Instant>,
}

impl StatsReporter {
    /// Create a reporter firing every `interval`.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_report: None,
        }
    }

    /// Whether a report is due at `now`.
    pub fn is_due(&self, now: Instant) -> bool {
        self.last_report
            .map_or(true, |last| now.duration_since(last) >= self.interval)
    }

    /// Build a report and mark it sent.
    pub fn report(
        &mut self,
        statistics: TransportStatistics,
        connected_at: Option<Instant>,
        now: Instant,
    ) -> ConnectionStats {
        self.last_report = Some(now);

        let uptime_seconds = connected_at
            .map(|start| now.saturating_duration_since(start).as_secs())
            .unwrap_or(0);
        trace!(uptime_seconds, "Reporting connection stats");

        ConnectionStats {
            frames_received: statistics.frames_received,
            events_dispatched: statistics.events_dispatched,
            parse_failures: statistics.parse_failures,
            handler_failures: statistics.handler_failures,
            connection_attempts: statistics.connection_attempts,
            uptime_seconds,
        }
    }

    /// Forget the last report so the next connection reports immediately.
    pub fn reset(&mut self) {
        self.last_report = None;
    }
}

impl Default for StatsReporter {
    fn default() -> Self {
        Self::new(STATS_INTERVAL)
    }
}
