//! Escrow service configuration.

use crate::error::{EscrowError, EscrowResult};
use deadlock_crypto::ESCROW_KEY_ENV;
use deadlock_vault::CheckInPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable overriding the sweep interval, in milliseconds.
pub const MONITOR_INTERVAL_ENV: &str = "DEADMAN_MONITOR_INTERVAL_MS";

/// Configuration for [`crate::EscrowService`] and [`crate::DeadManMonitor`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowConfig {
    /// Environment variable holding the escrow key.
    pub escrow_key_env: String,

    /// Dead-man sweep interval (milliseconds).
    pub sweep_interval_ms: u64,

    /// Nominee count every vault must have.
    pub required_nominees: usize,

    /// Approval threshold every vault must use.
    pub required_threshold: usize,

    /// Policy applied when a new vault does not bring its own.
    pub default_policy: CheckInPolicy,
}

impl Default for EscrowConfig {
    fn default() -> Self {
        Self {
            escrow_key_env: ESCROW_KEY_ENV.to_string(),
            sweep_interval_ms: 60_000,
            required_nominees: 3,
            required_threshold: 3,
            default_policy: CheckInPolicy::default(),
        }
    }
}

impl EscrowConfig {
    /// Defaults overlaid with `DEADMAN_MONITOR_INTERVAL_MS` when set.
    pub fn from_env() -> EscrowResult<Self> {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var(MONITOR_INTERVAL_ENV) {
            config.sweep_interval_ms = parse_interval_ms(&raw)?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> EscrowResult<()> {
        if self.sweep_interval_ms == 0 {
            return Err(EscrowError::Config(
                "sweep interval must be positive".to_string(),
            ));
        }
        if self.required_threshold < 2 || self.required_threshold > self.required_nominees {
            return Err(EscrowError::Config(format!(
                "required threshold {} does not fit {} nominees",
                self.required_threshold, self.required_nominees
            )));
        }
        self.default_policy
            .validate()
            .map_err(|e| EscrowError::Config(e.to_string()))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

fn parse_interval_ms(raw: &str) -> EscrowResult<u64> {
    raw.trim().parse::<u64>().map_err(|e| {
        EscrowError::Config(format!("{MONITOR_INTERVAL_ENV} must be milliseconds: {e}"))
    })
}
