use figment::Jail;
use tm_config::ToolmineConfig;

#[test]
fn env_vars_fill_nested_sections() {
    Jail::expect_with(|jail| {
        jail.set_env("TOOLMINE_REVIEW__API_KEY", "sk-test");
        jail.set_env("TOOLMINE_BUDGET__CEILING_MINUTES", "90");

        let config = ToolmineConfig::load().expect("config loads");
        assert_eq!(config.review.api_key, "sk-test");
        assert!(config.review.is_configured());
        assert!((config.budget.ceiling_minutes - 90.0).abs() < f64::EPSILON);
        Ok(())
    });
}

#[test]
fn env_beats_project_file() {
    Jail::expect_with(|jail| {
        jail.create_dir(".toolmine")?;
        jail.create_file(".toolmine/config.toml", "[run]\nforce_rerun = false\n")?;
        jail.set_env("TOOLMINE_RUN__FORCE_RERUN", "true");

        let config = ToolmineConfig::load().expect("config loads");
        assert!(config.run.force_rerun);
        Ok(())
    });
}

#[test]
fn non_positive_rate_from_env_is_fatal() {
    Jail::expect_with(|jail| {
        jail.set_env("TOOLMINE_BUDGET__MINUTES_PER_PUBLICATION", "0");

        let config = ToolmineConfig::load().expect("config loads");
        assert!(config.validate().is_err());
        Ok(())
    });
}
