use anyhow::Context;
use tm_config::ToolmineConfig;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::ConfigArgs;
use crate::output::output;

const REDACTED: &str = "<redacted>";

/// The configuration with credentials masked.
fn redacted(config: &ToolmineConfig) -> ToolmineConfig {
    let mut shown = config.clone();
    if !shown.review.api_key.is_empty() {
        shown.review.api_key = REDACTED.to_string();
    }
    shown
}

/// Handle `toolmine config`.
pub fn handle(args: &ConfigArgs, config: &ToolmineConfig, flags: &GlobalFlags) -> anyhow::Result<()> {
    let shown = redacted(config);
    if args.toml {
        let text = toml::to_string_pretty(&shown).context("failed to render configuration as TOML")?;
        print!("{text}");
        return Ok(());
    }
    output(&shown, flags.format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_is_masked_in_toml() {
        let mut config = ToolmineConfig::default();
        config.review.api_key = "sk-secret".into();
        let text = toml::to_string_pretty(&redacted(&config)).unwrap();
        assert!(!text.contains("sk-secret"));
        assert!(text.contains(REDACTED));
        assert!(text.contains("[budget]"));
    }

    #[test]
    fn empty_key_stays_empty() {
        let shown = redacted(&ToolmineConfig::default());
        assert!(shown.review.api_key.is_empty());
    }
}
