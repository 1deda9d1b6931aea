//! Conversion of CLI arguments into filter settings and a model policy

use crate::cli::main_impl::Cli;
use crate::{
    config::FilterSettings,
    security::SecurityPolicy,
    utils::{ColorParser, ConfigValidator, ExecutionProviderManager, IntegrityChecker},
};
use anyhow::{bail, Context, Result};

pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build settings: a JSON settings file first, then individual flags on top
    pub(crate) fn settings_from_cli(cli: &Cli) -> Result<FilterSettings> {
        let mut settings = match &cli.settings {
            Some(path) => FilterSettings::from_json_file(path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?,
            None => FilterSettings::default(),
        };

        if let Some(model) = &cli.model {
            settings.model_path = Some(model.clone());
        }
        if let Some(sha256) = &cli.sha256 {
            settings.model_sha256 = Some(sha256.clone());
        }
        if let Some(threshold) = cli.threshold {
            settings.threshold = threshold;
        }
        if cli.blur {
            settings.blur_background = true;
        }
        if let Some(amount) = cli.blur_amount {
            settings.blur_amount = amount;
        }
        if cli.no_replace {
            settings.replace_background = false;
        }
        if let Some(color) = &cli.color {
            settings.replacement_color = ColorParser::parse_hex(color)
                .with_context(|| format!("Invalid replacement color '{}'", color))?;
        }
        if let Some(smoothing) = cli.edge_smoothing {
            settings.edge_smoothing = smoothing;
        }
        if cli.no_smooth_edges {
            settings.smooth_edges = false;
        }
        if let Some(providers) = &cli.providers {
            settings.execution_providers = ExecutionProviderManager::parse_provider_list(providers)
                .context("Invalid execution provider list")?;
        }

        Ok(settings)
    }

    /// The plugin allow-list extended with any `--allow-dir` entries
    pub(crate) fn policy_from_cli(cli: &Cli) -> SecurityPolicy {
        cli.allow_dir
            .iter()
            .fold(SecurityPolicy::plugin_default(), |policy, dir| policy.with_allowed_dir(dir))
    }

    /// Reject out-of-range tunables up front instead of silently falling back to defaults
    pub(crate) fn validate(settings: &FilterSettings) -> Result<()> {
        ConfigValidator::check(
            settings.threshold,
            settings.blur_amount,
            settings.edge_smoothing,
        )
        .context("Invalid filter settings")?;

        if let Some(digest) = settings.model_sha256.as_deref().map(str::trim) {
            if !digest.is_empty() && !IntegrityChecker::is_sha256_hex(digest) {
                bail!("Expected model SHA-256 must be 64 hex digits, got '{}'", digest);
            }
        }
        Ok(())
    }
}
