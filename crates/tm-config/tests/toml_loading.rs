//! Integration tests for TOML configuration loading.
//!
//! Uses `figment::Jail` for sandboxed files and env vars.

use figment::{
    Figment, Jail,
    providers::{Format, Serialized, Toml},
};
use pretty_assertions::assert_eq;
use tm_config::ToolmineConfig;

#[test]
fn loads_budget_and_thresholds_from_toml() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[budget]
ceiling_minutes = 120.0
safety_margin_minutes = 10.0
minutes_per_publication = 1.5

[thresholds]
validation_accept = 0.75
fuzzy_match = 0.9
"#,
        )?;

        let config: ToolmineConfig = Figment::from(Serialized::defaults(ToolmineConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        assert!((config.budget.ceiling_minutes - 120.0).abs() < f64::EPSILON);
        assert!((config.budget.minutes_per_publication - 1.5).abs() < f64::EPSILON);
        // untouched fields keep their defaults
        assert!((config.budget.setup_overhead_minutes - 10.0).abs() < f64::EPSILON);
        assert!((config.thresholds.validation_accept - 0.75).abs() < f64::EPSILON);
        assert!((config.thresholds.critical_field_min - 0.6).abs() < f64::EPSILON);
        Ok(())
    });
}

#[test]
fn project_config_is_picked_up() {
    Jail::expect_with(|jail| {
        jail.create_dir(".toolmine")?;
        jail.create_file(
            ".toolmine/config.toml",
            r#"
[paths]
data_dir = "state"

[run]
parallel_workers = 8
skip_screening = true
"#,
        )?;

        let config = ToolmineConfig::load().expect("config loads");
        assert_eq!(config.paths.data_dir, "state");
        assert_eq!(config.run.parallel_workers, 8);
        assert!(config.run.skip_screening);
        Ok(())
    });
}

#[test]
fn explicit_file_overrides_project_file() {
    Jail::expect_with(|jail| {
        jail.create_dir(".toolmine")?;
        jail.create_file(".toolmine/config.toml", "[run]\nparallel_workers = 8\n")?;
        jail.create_file("ci.toml", "[run]\nparallel_workers = 2\n")?;

        let config = ToolmineConfig::load_from(std::path::Path::new("ci.toml"))
            .expect("config loads");
        assert_eq!(config.run.parallel_workers, 2);
        Ok(())
    });
}

#[test]
fn invalid_values_fail_validation() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", "[run]\nparallel_workers = 0\n")?;

        let config: ToolmineConfig = Figment::from(Serialized::defaults(ToolmineConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("run.parallel_workers"));
        Ok(())
    });
}
