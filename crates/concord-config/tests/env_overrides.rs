use concord_config::ConcordConfig;
use figment::Jail;

#[test]
fn env_overrides_nested_sections() {
    Jail::expect_with(|jail| {
        jail.set_env("CONCORD_COORDINATOR__TRANSACTION_TIMEOUT_MS", "1234");
        jail.set_env("CONCORD_COORDINATOR__RETRY__MAX_DELAY_MS", "9000");
        jail.set_env("CONCORD_RECONCILE__DRY_RUN", "true");

        let config = ConcordConfig::load().map_err(|e| e.to_string())?;
        assert_eq!(config.coordinator.transaction_timeout_ms, 1234);
        assert_eq!(config.coordinator.retry.max_delay_ms, 9000);
        assert!(config.reconcile.dry_run);
        Ok(())
    });
}

#[test]
fn env_beats_project_toml() {
    Jail::expect_with(|jail| {
        jail.create_dir(".concord")?;
        jail.create_file(
            ".concord/config.toml",
            r"
            [reconcile]
            max_retries = 7
            ",
        )?;
        jail.set_env("CONCORD_RECONCILE__MAX_RETRIES", "1");

        let config = ConcordConfig::load().map_err(|e| e.to_string())?;
        assert_eq!(config.reconcile.max_retries, 1);
        Ok(())
    });
}

#[test]
fn unrelated_env_vars_are_ignored() {
    Jail::expect_with(|jail| {
        jail.set_env("OTHER_COORDINATOR__TRANSACTION_TIMEOUT_MS", "1");

        let config = ConcordConfig::load().map_err(|e| e.to_string())?;
        assert_eq!(config.coordinator.transaction_timeout_ms, 30_000);
        Ok(())
    });
}
