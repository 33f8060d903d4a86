use crate::beacon::BeaconConfig;

/// Cross-field validation, called automatically during `BeaconConfig::from_str` / `load`.
pub(crate) fn validate(config: &BeaconConfig) -> anyhow::Result<()> {
    if config.system.cycle_time_ms == 0 {
        anyhow::bail!("system.cycle_time_ms must be > 0");
    }
    if config.system.buffer_capacity == 0 {
        anyhow::bail!("system.buffer_capacity must be > 0");
    }
    if let Some(period) = config.runtime.cycle_period {
        if period.as_duration().is_zero() {
            anyhow::bail!("runtime.cycle_period must be > 0");
        }
    }
    if config.runtime.backoff_max_attempts == 0 {
        anyhow::bail!("runtime.backoff_max_attempts must be > 0");
    }
    if config.runtime.backoff_base_delay.as_duration().is_zero() {
        anyhow::bail!("runtime.backoff_base_delay must be > 0");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate(&BeaconConfig::default()).is_ok());
    }

    #[test]
    fn rejects_zero_cycle_time() {
        let mut config = BeaconConfig::default();
        config.system.cycle_time_ms = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_zero_buffer_capacity() {
        let mut config = BeaconConfig::default();
        config.system.buffer_capacity = 0;
        assert!(validate(&config).is_err());
    }
}
