use deadlock_escrow::{EscrowConfig, EscrowError};
use deadlock_vault::CheckInPolicy;
use std::time::Duration;

#[test]
fn default_config() {
    let config = EscrowConfig::default();
    assert_eq!(config.escrow_key_env, "MASTER_SHARE_ENCRYPTION_KEY");
    assert_eq!(config.sweep_interval_ms, 60_000);
    assert_eq!(config.sweep_interval(), Duration::from_secs(60));
    assert_eq!(config.required_nominees, 3);
    assert_eq!(config.required_threshold, 3);
    assert_eq!(config.default_policy, CheckInPolicy::default());
    assert!(config.validate().is_ok());
}

#[test]
fn config_serde_roundtrip() {
    let config = EscrowConfig {
        sweep_interval_ms: 5_000,
        ..Default::default()
    };
    let json = serde_json::to_string(&config).unwrap();
    let parsed: EscrowConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, config);
}

#[test]
fn zero_interval_is_rejected() {
    let config = EscrowConfig {
        sweep_interval_ms: 0,
        ..Default::default()
    };
    assert!(matches!(config.validate(), Err(EscrowError::Config(_))));
}

#[test]
fn threshold_must_fit_nominees() {
    let too_high = EscrowConfig {
        required_threshold: 4,
        ..Default::default()
    };
    assert!(matches!(too_high.validate(), Err(EscrowError::Config(_))));

    let too_low = EscrowConfig {
        required_threshold: 1,
        ..Default::default()
    };
    assert!(matches!(too_low.validate(), Err(EscrowError::Config(_))));
}

#[test]
fn zero_day_policy_is_rejected() {
    let config = EscrowConfig {
        default_policy: CheckInPolicy {
            interval_days: 0,
            ..Default::default()
        },
        ..Default::default()
    };
    assert!(matches!(config.validate(), Err(EscrowError::Config(_))));
}
