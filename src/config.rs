//! Configuration types for the acquisition pipeline

use crate::error::{CutoutError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Compression factor requested from the picker (0.0 = smallest, 1.0 = best)
pub const DEFAULT_PICKER_QUALITY: f32 = 0.2;

/// Logical file name every cutout is cached under
pub const DEFAULT_CUTOUT_FILE_NAME: &str = "cutout.png";

/// Screen that receives the transition payload
pub const DEFAULT_TARGET_SCREEN: &str = "Editor";

/// Header carrying the removal service API key
pub const DEFAULT_API_KEY_HEADER: &str = "X-Api-Key";

/// Media types the picker may offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Images,
}

/// Options passed to the picker on every invocation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PickerOptions {
    pub media_type: MediaType,
    pub quality: f32,
}

impl Default for PickerOptions {
    fn default() -> Self {
        Self {
            media_type: MediaType::Images,
            quality: DEFAULT_PICKER_QUALITY,
        }
    }
}

impl PickerOptions {
    /// JPEG quality (1-100) equivalent of the compression factor
    #[must_use]
    pub fn jpeg_quality(&self) -> u8 {
        ((self.quality.clamp(0.0, 1.0) * 100.0).round() as u8).max(1)
    }
}

/// Configuration for one orchestrator instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Compression factor handed to the picker
    pub picker_quality: f32,

    /// File name the cutout is persisted under (overwritten each run)
    pub cutout_file_name: String,

    /// Navigation target for the transition payload
    pub target_screen: String,

    /// Upper bound on the removal call; `None` waits indefinitely
    pub removal_timeout: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            picker_quality: DEFAULT_PICKER_QUALITY,
            cutout_file_name: DEFAULT_CUTOUT_FILE_NAME.to_string(),
            target_screen: DEFAULT_TARGET_SCREEN.to_string(),
            removal_timeout: None,
        }
    }
}

impl PipelineConfig {
    #[must_use]
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Picker options derived from this configuration
    #[must_use]
    pub fn picker_options(&self) -> PickerOptions {
        PickerOptions {
            media_type: MediaType::Images,
            quality: self.picker_quality,
        }
    }

    /// Validate all configuration parameters
    ///
    /// # Errors
    /// - Picker quality outside 0.0-1.0
    /// - Empty or path-like cutout file name
    /// - Empty target screen
    /// - Zero removal timeout
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.picker_quality) {
            return Err(CutoutError::config_value_error(
                "picker quality",
                self.picker_quality,
                "0.0-1.0",
                Some(DEFAULT_PICKER_QUALITY),
            ));
        }

        crate::store::validate_file_name(&self.cutout_file_name)?;

        if self.target_screen.trim().is_empty() {
            return Err(CutoutError::invalid_config("Target screen cannot be empty"));
        }

        if self.removal_timeout == Some(Duration::ZERO) {
            return Err(CutoutError::invalid_config(
                "Removal timeout must be greater than zero (omit it to wait indefinitely)",
            ));
        }

        Ok(())
    }
}

/// Builder for `PipelineConfig`
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    #[must_use]
    pub fn picker_quality(mut self, quality: f32) -> Self {
        self.config.picker_quality = quality;
        self
    }

    #[must_use]
    pub fn cutout_file_name<S: Into<String>>(mut self, name: S) -> Self {
        self.config.cutout_file_name = name.into();
        self
    }

    #[must_use]
    pub fn target_screen<S: Into<String>>(mut self, screen: S) -> Self {
        self.config.target_screen = screen.into();
        self
    }

    #[must_use]
    pub fn removal_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.removal_timeout = timeout;
        self
    }

    /// Build and validate the configuration
    ///
    /// # Errors
    /// - Any rule checked by [`PipelineConfig::validate`]
    pub fn build(self) -> Result<PipelineConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Connection settings for the HTTP removal service
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct RemovalClientConfig {
    /// Full URL the image is POSTed to
    pub endpoint: String,

    /// Optional API key
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Header the API key is sent in
    pub api_key_header: String,

    pub user_agent: String,
}

impl RemovalClientConfig {
    pub fn new<S: Into<String>>(endpoint: S) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: None,
            api_key_header: DEFAULT_API_KEY_HEADER.to_string(),
            user_agent: format!("bgcutout/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    #[must_use]
    pub fn with_api_key<S: Into<String>>(mut self, key: S) -> Self {
        self.api_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_api_key_header<S: Into<String>>(mut self, header: S) -> Self {
        self.api_key_header = header.into();
        self
    }

    /// # Errors
    /// - Empty endpoint or endpoint without an http(s) scheme
    /// - Empty API key header name
    pub fn validate(&self) -> Result<()> {
        validate_endpoint(&self.endpoint)?;
        if self.api_key_header.trim().is_empty() {
            return Err(CutoutError::invalid_config("API key header cannot be empty"));
        }
        Ok(())
    }
}

impl std::fmt::Debug for RemovalClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemovalClientConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_key_header", &self.api_key_header)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// Validate that a removal endpoint is a usable http(s) URL
///
/// # Errors
/// - Empty URL
/// - Missing `http://` / `https://` scheme
/// - Missing host
pub fn validate_endpoint(url: &str) -> Result<()> {
    if url.is_empty() {
        return Err(CutoutError::invalid_config("Removal endpoint cannot be empty"));
    }

    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or_else(|| {
            CutoutError::invalid_config(format!(
                "Unsupported endpoint: {}. Expected an http:// or https:// URL",
                url
            ))
        })?;

    let host = rest.split('/').next().unwrap_or_default();
    if host.is_empty() {
        return Err(CutoutError::invalid_config(format!(
            "Removal endpoint has no host: {}",
            url
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert!((config.picker_quality - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.cutout_file_name, "cutout.png");
        assert_eq!(config.target_screen, "Editor");
        assert!(config.removal_timeout.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_validation() {
        let config = PipelineConfig::builder()
            .picker_quality(0.5)
            .cutout_file_name("subject.png")
            .target_screen("Compose")
            .removal_timeout(Some(Duration::from_secs(30)))
            .build()
            .unwrap();
        assert_eq!(config.cutout_file_name, "subject.png");
        assert_eq!(config.removal_timeout, Some(Duration::from_secs(30)));

        let err = PipelineConfig::builder().picker_quality(1.5).build().unwrap_err();
        assert!(err.to_string().contains("picker quality"));
        assert!(err.to_string().contains("0.0-1.0"));

        assert!(PipelineConfig::builder().cutout_file_name("../escape.png").build().is_err());
        assert!(PipelineConfig::builder().cutout_file_name("").build().is_err());
        assert!(PipelineConfig::builder().target_screen("  ").build().is_err());
        assert!(PipelineConfig::builder()
            .removal_timeout(Some(Duration::ZERO))
            .build()
            .is_err());
    }

    #[test]
    fn test_picker_options_quality_mapping() {
        assert_eq!(PickerOptions::default().jpeg_quality(), 20);
        let options = PickerOptions {
            media_type: MediaType::Images,
            quality: 0.0,
        };
        assert_eq!(options.jpeg_quality(), 1);
        let options = PickerOptions {
            media_type: MediaType::Images,
            quality: 1.0,
        };
        assert_eq!(options.jpeg_quality(), 100);
    }

    #[test]
    fn test_validate_endpoint() {
        assert!(validate_endpoint("https://api.example.com/v1/removebg").is_ok());
        assert!(validate_endpoint("http://127.0.0.1:8080/remove").is_ok());

        assert!(validate_endpoint("").is_err());
        assert!(validate_endpoint("ftp://example.com").is_err());
        assert!(validate_endpoint("https://").is_err());
        assert!(validate_endpoint("example.com/remove").is_err());
    }

    #[test]
    fn test_client_config_redacts_api_key() {
        let config = RemovalClientConfig::new("https://api.example.com/remove").with_api_key("secret");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("<redacted>"));

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
        assert!(config.validate().is_ok());
        assert!(config.with_api_key_header("").validate().is_err());
    }
}
