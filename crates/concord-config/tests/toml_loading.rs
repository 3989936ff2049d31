use concord_config::ConcordConfig;
use figment::{
    Figment, Jail,
    providers::{Format, Serialized, Toml},
};
use pretty_assertions::assert_eq;

#[test]
fn toml_file_overrides_defaults() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
            [coordinator]
            transaction_timeout_ms = 5000

            [coordinator.retry]
            max_attempts = 5

            [reconcile]
            require_confirmation = false
            required_fields = ["name", "elements"]
            "#,
        )?;

        let config: ConcordConfig = Figment::from(Serialized::defaults(ConcordConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        assert_eq!(config.coordinator.transaction_timeout_ms, 5000);
        assert_eq!(config.coordinator.retry.max_attempts, 5);
        assert_eq!(config.coordinator.retry.base_delay_ms, 100);
        assert!(!config.reconcile.require_confirmation);
        assert_eq!(config.reconcile.required_fields, vec!["name", "elements"]);
        assert_eq!(config.reconcile.max_retries, 2);
        Ok(())
    });
}

#[test]
fn project_config_is_picked_up_by_load() {
    Jail::expect_with(|jail| {
        jail.create_dir(".concord")?;
        jail.create_file(
            ".concord/config.toml",
            r#"
            [storage]
            data_dir = "/tmp/concord-data"
            journal = "txlog.jsonl"

            [health]
            timeout_ms = 750
            "#,
        )?;

        let config = ConcordConfig::load().map_err(|e| e.to_string())?;
        assert_eq!(config.storage.data_dir, "/tmp/concord-data");
        assert_eq!(
            config.storage.journal_path(),
            std::path::PathBuf::from("/tmp/concord-data/txlog.jsonl")
        );
        assert_eq!(config.health.timeout_ms, 750);
        Ok(())
    });
}

#[test]
fn invalid_toml_value_fails_validation() {
    Jail::expect_with(|jail| {
        jail.create_dir(".concord")?;
        jail.create_file(
            ".concord/config.toml",
            r"
            [health]
            timeout_ms = 0
            ",
        )?;

        let err = ConcordConfig::load().unwrap_err();
        assert!(err.to_string().contains("health.timeout_ms"));
        Ok(())
    });
}
