//! Conversion settings.
//!
//! Every field has a default aimed at the Arabic catalog, so an empty (or
//! absent) config file is valid. Example:
//!
//! ```toml
//! default_title = "Untitled"
//! unknown_author = "Unknown"
//! language = "en"
//! max_index_parts = 50
//!
//! [text]
//! preserve_blocks = true
//! max_blank_lines = 1
//!
//! [labels]
//! volume = "vol."
//! page = "p."
//!
//! [epub]
//! compression_level = 9
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::decode::DecodeOptions;
use crate::endpoints::Endpoints;
use crate::error::{Error, Result};
use crate::export::{ComposeOptions, EpubConfig, Labels};
use crate::text::PlainTextOptions;

/// Settings for one conversion.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConvertConfig {
    /// Title of chapters made from pages no index entry claims.
    pub default_title: String,
    /// Substituted for authors without a name.
    pub unknown_author: String,
    pub language: String,
    pub labels: Labels,
    pub text: PlainTextOptions,
    pub epub: EpubSettings,
    pub endpoints: Endpoints,
    /// Upper bound on index parts fetched for one book.
    pub max_index_parts: u32,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            default_title: "بدون عنوان".into(),
            unknown_author: "مؤلف غير معروف".into(),
            language: "ar".into(),
            labels: Labels::default(),
            text: PlainTextOptions::default(),
            epub: EpubSettings::default(),
            endpoints: Endpoints::default(),
            max_index_parts: 100,
        }
    }
}

/// The file-configurable subset of [`EpubConfig`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EpubSettings {
    pub compression_level: Option<u32>,
    pub modified: Option<String>,
}

impl ConvertConfig {
    /// Load settings from a TOML file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|source| Error::ResourceUnavailable {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&contents).map_err(|message| Error::Config {
            path: path.to_path_buf(),
            message,
        })?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse settings from TOML text.
    pub fn from_toml(contents: &str) -> std::result::Result<Self, String> {
        let config: Self = toml::from_str(contents).map_err(|e| e.to_string())?;
        if let Some(level) = config.epub.compression_level
            && level > 9
        {
            return Err(format!("epub.compression_level must be 0-9, got {level}"));
        }
        Ok(config)
    }

    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions::new(self.unknown_author.clone()).with_text(self.text.clone())
    }

    pub fn compose_options(&self) -> ComposeOptions {
        ComposeOptions {
            language: self.language.clone(),
            labels: self.labels.clone(),
        }
    }

    pub fn epub_config(&self) -> EpubConfig {
        EpubConfig {
            compression_level: self.epub.compression_level,
            identifier: None,
            modified: self.epub.modified.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        assert_eq!(ConvertConfig::from_toml("").unwrap(), ConvertConfig::default());
    }

    #[test]
    fn test_partial_overrides() {
        let config = ConvertConfig::from_toml(
            r#"
            language = "en"
            default_title = "Untitled"

            [labels]
            volume = "vol."

            [text]
            preserve_blocks = false
            "#,
        )
        .unwrap();

        assert_eq!(config.language, "en");
        assert_eq!(config.default_title, "Untitled");
        assert_eq!(config.labels.volume, "vol.");
        // Untouched label keeps its default
        assert_eq!(config.labels.page, "ص");
        assert!(!config.text.preserve_blocks);
        assert_eq!(config.text.max_blank_lines, 1);
        assert_eq!(config.compose_options().language, "en");
    }

    #[test]
    fn test_rejects_unknown_keys_and_bad_levels() {
        assert!(ConvertConfig::from_toml("languge = \"en\"").is_err());
        assert!(ConvertConfig::from_toml("[epub]\ncompression_level = 12").is_err());
    }

    #[test]
    fn test_load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "max_index_parts = \"many\"").unwrap();
        let err = ConvertConfig::load(&path).unwrap_err();
        assert!(matches!(err, Error::Config { path: p, .. } if p == path));

        std::fs::write(&path, "max_index_parts = 3").unwrap();
        assert_eq!(ConvertConfig::load(&path).unwrap().max_index_parts, 3);
    }
}
