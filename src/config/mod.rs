//! epsonscan2 settings template.
//!
//! A settings file (`.sf2`) is a JSON document exported by the Epson Scan 2
//! GUI. Only two leaves matter here, both inside the first preset block at
//! `Preset[0]["0"][0]`:
//!
//! ```text
//! { "Preset": [ { "0": [ { "UserDefinePath": { "string": "<dir>" },
//!                          "FileNamePrefix": { "string": "<stem>" },
//!                          ... } ] } ] }
//! ```
//!
//! Everything else is carried through untouched, in its original key order.

use camino::{Utf8Path, Utf8PathBuf};
use serde_json::Value;
use std::fs;
use thiserror::Error;

/// JSON pointer to the settings block holding the two session fields.
pub const PRESET_POINTER: &str = "/Preset/0/0/0";

/// Key of the output directory field inside the preset block.
pub const OUTPUT_DIRECTORY_KEY: &str = "UserDefinePath";

/// Key of the file name prefix field inside the preset block.
pub const FILE_PREFIX_KEY: &str = "FileNamePrefix";

/// Both fields wrap their value in `{ "string": ... }`.
const STRING_LEAF: &str = "string";

/// Errors raised while reading or writing a settings document
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read settings file {path}: {source}")]
    Load {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Settings file {path} is not valid JSON: {source}")]
    Parse {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Settings document has no {0}")]
    Shape(String),

    #[error("Failed to write settings file {path}: {source}")]
    Write {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A loaded settings document with accessors for the session fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanConfiguration {
    document: Value,
}

impl ScanConfiguration {
    /// Load and validate a settings file.
    pub fn load<P: AsRef<Utf8Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Load {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_json_str(&contents).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;

        tracing::info!("Loaded scan settings from {}", path);
        Ok(config)
    }

    /// Parse a settings document from a string.
    pub fn from_json_str(contents: &str) -> Result<Self, ConfigError> {
        let document: Value = serde_json::from_str(contents).map_err(|source| ConfigError::Parse {
            path: Utf8PathBuf::new(),
            source,
        })?;
        Self::from_value(document)
    }

    /// Wrap an already parsed document, checking its shape.
    pub fn from_value(document: Value) -> Result<Self, ConfigError> {
        let preset = document
            .pointer(PRESET_POINTER)
            .ok_or_else(|| ConfigError::Shape(format!("preset block at {}", PRESET_POINTER)))?;

        let preset = preset
            .as_object()
            .ok_or_else(|| ConfigError::Shape(format!("object at {}", PRESET_POINTER)))?;

        for key in [OUTPUT_DIRECTORY_KEY, FILE_PREFIX_KEY] {
            if !preset.get(key).is_some_and(Value::is_object) {
                return Err(ConfigError::Shape(format!("{}/{} object", PRESET_POINTER, key)));
            }
        }

        Ok(Self { document })
    }

    /// Point the driver at `dir` for its image output.
    ///
    /// The directory is not checked; the session workspace creates it.
    pub fn set_output_directory(&mut self, dir: &Utf8Path) -> Result<(), ConfigError> {
        self.set_string_leaf(OUTPUT_DIRECTORY_KEY, dir.as_str())
    }

    /// Set the file name stem for the next captured image.
    pub fn set_file_prefix(&mut self, prefix: &str) -> Result<(), ConfigError> {
        self.set_string_leaf(FILE_PREFIX_KEY, prefix)
    }

    pub fn output_directory(&self) -> Option<&str> {
        self.string_leaf(OUTPUT_DIRECTORY_KEY)
    }

    pub fn file_prefix(&self) -> Option<&str> {
        self.string_leaf(FILE_PREFIX_KEY)
    }

    /// The full document, including pass-through fields.
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Write the current document to `out_path`, replacing any existing file.
    pub fn materialize(&self, out_path: &Utf8Path) -> Result<(), ConfigError> {
        let bytes = serde_json::to_vec(&self.document).map_err(|source| ConfigError::Write {
            path: out_path.to_path_buf(),
            source: source.into(),
        })?;

        fs::write(out_path, bytes).map_err(|source| ConfigError::Write {
            path: out_path.to_path_buf(),
            source,
        })?;

        tracing::debug!("Wrote scan settings to {}", out_path);
        Ok(())
    }

    fn string_leaf(&self, key: &str) -> Option<&str> {
        self.document
            .pointer(PRESET_POINTER)?
            .get(key)?
            .get(STRING_LEAF)?
            .as_str()
    }

    fn set_string_leaf(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let field = self
            .document
            .pointer_mut(PRESET_POINTER)
            .and_then(|preset| preset.get_mut(key))
            .and_then(Value::as_object_mut)
            .ok_or_else(|| ConfigError::Shape(format!("{}/{} object", PRESET_POINTER, key)))?;

        field.insert(STRING_LEAF.to_string(), Value::String(value.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn sample() -> Value {
        json!({
            "Preset": [{
                "0": [{
                    "Resolution": { "int": 300 },
                    "UserDefinePath": { "string": "/home/user/Documents" },
                    "FileNamePrefix": { "string": "img" },
                    "ImageFormat": { "int": 0 }
                }]
            }],
            "Version": "1.0"
        })
    }

    #[test]
    fn test_accessors() {
        let config = ScanConfiguration::from_value(sample()).unwrap();
        assert_eq!(config.output_directory(), Some("/home/user/Documents"));
        assert_eq!(config.file_prefix(), Some("img"));
    }

    #[test]
    fn test_set_fields() {
        let mut config = ScanConfiguration::from_value(sample()).unwrap();
        config.set_output_directory(Utf8Path::new("scan_20240101_120000")).unwrap();
        config.set_file_prefix("scan001").unwrap();

        assert_eq!(config.output_directory(), Some("scan_20240101_120000"));
        assert_eq!(config.file_prefix(), Some("scan001"));
    }

    #[test]
    fn test_missing_string_leaf_is_created() {
        let mut doc = sample();
        doc["Preset"][0]["0"][0]["FileNamePrefix"] = json!({});
        let mut config = ScanConfiguration::from_value(doc).unwrap();

        assert_eq!(config.file_prefix(), None);
        config.set_file_prefix("scan007").unwrap();
        assert_eq!(config.file_prefix(), Some("scan007"));
    }

    #[test]
    fn test_shape_errors() {
        let no_preset = json!({ "Version": "1.0" });
        assert!(matches!(
            ScanConfiguration::from_value(no_preset),
            Err(ConfigError::Shape(_))
        ));

        let empty_block = json!({ "Preset": [{ "0": [] }] });
        assert!(matches!(
            ScanConfiguration::from_value(empty_block),
            Err(ConfigError::Shape(_))
        ));

        let mut no_prefix = sample();
        no_prefix["Preset"][0]["0"][0]
            .as_object_mut()
            .unwrap()
            .remove(FILE_PREFIX_KEY);
        assert!(matches!(
            ScanConfiguration::from_value(no_prefix),
            Err(ConfigError::Shape(_))
        ));
    }

    #[test]
    fn test_load_errors() {
        let temp_dir = TempDir::new().unwrap();
        let dir = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();

        let missing = ScanConfiguration::load(dir.join("missing.sf2"));
        assert!(matches!(missing, Err(ConfigError::Load { .. })));

        let broken = dir.join("broken.sf2");
        fs::write(&broken, "{ not json").unwrap();
        match ScanConfiguration::load(&broken) {
            Err(ConfigError::Parse { path, .. }) => assert_eq!(path, broken),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_materialize_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let dir = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let out = dir.join("settings.sf2");

        let mut config = ScanConfiguration::from_value(sample()).unwrap();
        config.set_file_prefix("scan001").unwrap();
        config.materialize(&out).unwrap();
        config.set_file_prefix("scan002").unwrap();
        config.materialize(&out).unwrap();

        let written = ScanConfiguration::load(&out).unwrap();
        assert_eq!(written.file_prefix(), Some("scan002"));
        assert_eq!(written, config);
    }

    #[test]
    fn test_materialize_into_missing_dir_fails() {
        let temp_dir = TempDir::new().unwrap();
        let dir = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let config = ScanConfiguration::from_value(sample()).unwrap();

        let result = config.materialize(&dir.join("nope").join("settings.sf2"));
        assert!(matches!(result, Err(ConfigError::Write { .. })));
    }
}
