//! Configuration conversion utilities for CLI arguments

use crate::cache::default_artifact_dir;
use crate::cli::main_impl::Cli;
use crate::config::{PipelineConfig, RemovalClientConfig};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Fallback for `--output-dir`
pub(crate) const ENV_CACHE_DIR: &str = "BGCUTOUT_CACHE_DIR";
/// Fallback for `--endpoint`
pub(crate) const ENV_ENDPOINT: &str = "BGCUTOUT_ENDPOINT";
/// Fallback for `--api-key`
pub(crate) const ENV_API_KEY: &str = "BGCUTOUT_API_KEY";

/// Convert CLI arguments (plus environment fallbacks) to library configuration
///
/// `env` looks up an environment variable; tests pass a closure over a map.
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build the pipeline settings
    pub(crate) fn pipeline_config(cli: &Cli) -> Result<PipelineConfig> {
        PipelineConfig::builder()
            .picker_quality(cli.quality)
            .cutout_file_name(cli.file_name.clone())
            .target_screen(cli.screen.clone())
            .removal_timeout(cli.timeout_secs.map(Duration::from_secs))
            .build()
            .context("Invalid pipeline configuration")
    }

    /// Build the removal client settings; flags win over the environment
    pub(crate) fn removal_config<F>(cli: &Cli, env: F) -> Result<RemovalClientConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = non_blank(cli.endpoint.clone())
            .or_else(|| non_blank(env(ENV_ENDPOINT)))
            .with_context(|| {
                format!(
                    "No removal endpoint configured. Pass --endpoint or set {}",
                    ENV_ENDPOINT
                )
            })?;

        let mut config =
            RemovalClientConfig::new(endpoint).with_api_key_header(cli.api_key_header.clone());
        if let Some(key) = non_blank(cli.api_key.clone()).or_else(|| non_blank(env(ENV_API_KEY))) {
            config = config.with_api_key(key);
        }

        config.validate().context("Invalid removal service settings")?;
        Ok(config)
    }

    /// Directory cutouts are cached in
    pub(crate) fn artifact_dir<F>(cli: &Cli, env: F) -> Result<PathBuf>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = &cli.output_dir {
            return Ok(dir.clone());
        }
        if let Some(dir) = non_blank(env(ENV_CACHE_DIR)) {
            return Ok(PathBuf::from(dir));
        }
        default_artifact_dir().context("Failed to determine cache directory")
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
