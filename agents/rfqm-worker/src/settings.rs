use std::time::Duration;

use serde::Deserialize;

/// Worker configuration. All fields have production defaults; deployments
/// override them through the agent's config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WorkerSettings {
    /// Number of independent worker slots the process runs.
    pub worker_count: u32,
    /// Milliseconds between receipt polls while watching a submission.
    pub transaction_watch_interval_ms: u64,
    /// Milliseconds to wait for a maker's last-look signature before the
    /// attempt counts as failed.
    pub quote_server_timeout_ms: u64,
    /// Seconds a declining maker is kept on cooldown for the traded pair.
    pub maker_cooldown_s: u64,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            worker_count: 8,
            transaction_watch_interval_ms: 12_000,
            quote_server_timeout_ms: 10_000,
            maker_cooldown_s: 300,
        }
    }
}

impl WorkerSettings {
    pub fn transaction_watch_interval(&self) -> Duration {
        Duration::from_millis(self.transaction_watch_interval_ms)
    }

    pub fn quote_server_timeout(&self) -> Duration {
        Duration::from_millis(self.quote_server_timeout_ms)
    }

    pub fn maker_cooldown(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.maker_cooldown_s as i64)
    }
}
