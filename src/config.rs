use crate::segmentation::{ConfigError, ContourConfig};
use serde::Deserialize;
use std::path::Path;

/// Optional TOML configuration file
///
/// ```toml
/// [contour]
/// canny_low = 20
/// blur = 31
///
/// [logging]
/// level = "debug"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub contour: ContourConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LoggingConfig {
    /// Parsed log level (`trace`, `debug`, `info`, `warn` or `error`)
    pub fn max_level(&self) -> Result<tracing::Level, ConfigError> {
        self.level
            .parse()
            .map_err(|_| ConfigError::LogLevel(self.level.clone()))
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a configuration document
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.contour.validate()?;
        config.logging.max_level()?;
        Ok(config)
    }
}

fn default_log_level() -> String {
    "info".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config.contour, ContourConfig::default());
        assert_eq!(config.logging.max_level().unwrap(), tracing::Level::INFO);
    }

    #[test]
    fn partial_contour_table_keeps_other_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [contour]
            background_subtraction_threshold = 45
            canny_low = 20
            blur = 31
            min_contour_area_proportion = 0.001

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.contour.background_subtraction_threshold, 45);
        assert_eq!(config.contour.canny_low, 20.0);
        assert_eq!(config.contour.canny_high, 150.0);
        assert_eq!(config.contour.blur, 31);
        assert_eq!(config.contour.mask_dilate_iter, 5);
        assert_eq!(config.contour.min_contour_area_proportion, 0.001);
        assert_eq!(config.logging.max_level().unwrap(), tracing::Level::DEBUG);
    }

    #[test]
    fn invalid_values_fail_at_load() {
        let err = AppConfig::from_toml_str("[contour]\nblur = 10\n").unwrap_err();
        assert!(matches!(err, ConfigError::EvenBlur(10)));

        let err = AppConfig::from_toml_str("[contour]\nblur = \"wide\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = AppConfig::load(Path::new("/nonexistent/produce-matte.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile(..)));
    }

    #[test]
    fn unknown_log_level_fails_at_load() {
        let err = AppConfig::from_toml_str("[logging]\nlevel = \"chatty\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::LogLevel(ref level) if level == "chatty"));

        let logging = LoggingConfig {
            level: "chatty".into(),
        };
        assert!(logging.max_level().is_err());
    }

    #[test]
    fn log_level_names_are_case_insensitive() {
        let config = AppConfig::from_toml_str("[logging]\nlevel = \"WARN\"\n").unwrap();
        assert_eq!(config.logging.max_level().unwrap(), tracing::Level::WARN);
    }
}
