// -- imports
use serde::Deserialize;
use std::path::Path;

use crate::error::{RecognitionError, Result};
use crate::recognize::RecognizeArgs;

// -- config

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct TomlConfig {
    recognize: RecognizeArgs,
}

impl TomlConfig {
    /// Parse TOML config file with explicit project root for path resolution.
    ///
    /// # Arguments
    ///
    /// * `toml_path` - Path to the TOML config file
    /// * `project_root` - Base directory for resolving relative paths
    ///
    /// # Errors
    ///
    /// Returns `RecognitionError` if:
    /// - The path is not a valid toml file
    /// - File read fails
    /// - TOML parsing fails
    /// - `top_k` is zero
    pub fn from_toml(toml_path: &Path, project_root: &Path) -> Result<Self> {
        if !toml_path.is_file() || toml_path.extension().is_none_or(|ext| ext != "toml") {
            return Err(RecognitionError::Config(format!(
                "TOML config path is not a valid .toml file: {:?}",
                toml_path
            )));
        }

        let content = std::fs::read_to_string(toml_path)?;
        let mut config: Self = toml::from_str(&content)?;

        if config.recognize.top_k == 0 {
            return Err(RecognitionError::Config(
                "recognize.top_k must be at least 1".to_string(),
            ));
        }

        config.resolve_paths(project_root);
        Ok(config)
    }

    /// Resolve relative paths against project root
    fn resolve_paths(&mut self, project_root: &Path) {
        if !self.recognize.model.as_os_str().is_empty() && !self.recognize.model.is_absolute() {
            self.recognize.model = project_root.join(&self.recognize.model);
        }
    }
}

impl From<TomlConfig> for RecognizeArgs {
    fn from(config: TomlConfig) -> Self {
        config.recognize
    }
}

// -- public API

/// Parse TOML config file and return RecognizeArgs.
///
/// # Errors
///
/// Returns `RecognitionError` if TOML parsing or validation fails.
pub fn parse_toml(toml_path: &Path, project_root: &Path) -> Result<RecognizeArgs> {
    TomlConfig::from_toml(toml_path, project_root).map(Into::into)
}

// -- tests

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_from_toml_with_custom_values() {
        let temp_dir = TempDir::new().unwrap();
        let toml_path = temp_dir.path().join("config.toml");
        let toml_content = r#"
[recognize]
model = "models/yolo11n-cls.onnx"
device = "cpu"
imgsz = 224
half = true
top_k = 3
timeout_ms = 1500
verbose = true
"#;
        fs::write(&toml_path, toml_content).unwrap();

        let config = TomlConfig::from_toml(&toml_path, temp_dir.path()).unwrap();
        let args = config.recognize;

        assert_eq!(args.model, temp_dir.path().join("models/yolo11n-cls.onnx"));
        assert_eq!(args.device.as_deref(), Some("cpu"));
        assert_eq!(args.imgsz, Some(224));
        assert!(args.half);
        assert_eq!(args.top_k, 3);
        assert_eq!(args.timeout(), Some(Duration::from_millis(1500)));
        assert!(args.verbose);
    }

    #[test]
    fn test_parse_toml_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let toml_path = temp_dir.path().join("config.toml");
        fs::write(&toml_path, "[recognize]\nmodel = \"/abs/model.onnx\"\n").unwrap();

        let args = parse_toml(&toml_path, temp_dir.path()).unwrap();

        assert_eq!(args.model, PathBuf::from("/abs/model.onnx"));
        assert_eq!(args.top_k, 5);
        assert_eq!(args.timeout(), Some(Duration::from_secs(30)));
        assert!(args.device.is_none());
        assert!(!args.half);
    }

    #[test]
    fn test_timeout_can_be_disabled() {
        let temp_dir = TempDir::new().unwrap();
        let toml_path = temp_dir.path().join("config.toml");
        fs::write(&toml_path, "[recognize]\ntimeout_ms = 0\n").unwrap();

        let args = parse_toml(&toml_path, temp_dir.path()).unwrap();
        assert_eq!(args.timeout(), None);
    }

    #[test]
    fn test_zero_top_k_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let toml_path = temp_dir.path().join("config.toml");
        fs::write(&toml_path, "[recognize]\ntop_k = 0\n").unwrap();

        let err = parse_toml(&toml_path, temp_dir.path()).unwrap_err();
        assert!(matches!(err, RecognitionError::Config(_)));
    }

    #[test]
    fn test_from_toml_invalid_path() {
        let invalid_path = PathBuf::from("/nonexistent/config.toml");
        let project_root = PathBuf::from("/tmp");
        assert!(TomlConfig::from_toml(&invalid_path, &project_root).is_err());
    }

    #[test]
    fn test_from_toml_invalid_extension() {
        let temp_dir = TempDir::new().unwrap();
        let invalid_path = temp_dir.path().join("config.txt");
        fs::write(&invalid_path, "recognize = { model = \"test.onnx\" }").unwrap();
        assert!(TomlConfig::from_toml(&invalid_path, temp_dir.path()).is_err());
    }

    #[test]
    fn test_parse_toml_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let invalid_toml_path = temp_dir.path().join("invalid.toml");
        fs::write(&invalid_toml_path, "invalid toml [[[").unwrap();
        let err = parse_toml(&invalid_toml_path, temp_dir.path()).unwrap_err();
        assert!(matches!(err, RecognitionError::TomlConfig(_)));
    }
}
