use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::{TypeMarker, TypeMarkers};
use crate::error::SeqDedupError;
use crate::fasta::DEFAULT_LINE_WIDTH;

pub const DEFAULT_CONFIG_FILE: &str = "seqdedup.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub type_markers: Vec<TypeMarkerEntry>,
    #[serde(default)]
    pub line_width: Option<usize>,
    #[serde(default)]
    pub manifest: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum TypeMarkerEntry {
    Shorthand(String),
    Detailed(TypeMarkerObject),
}

#[derive(Debug, Deserialize, Serialize)]
pub struct TypeMarkerObject {
    pub marker: String,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub type_markers: TypeMarkers,
    pub line_width: usize,
    pub manifest: Option<String>,
}

impl ResolvedConfig {
    /// Appends markers given on the command line after the configured ones.
    pub fn with_type_markers<S: AsRef<str>>(mut self, values: &[S]) -> Result<Self, SeqDedupError> {
        for value in values {
            self.type_markers.insert(value.as_ref().parse::<TypeMarker>()?);
        }
        Ok(self)
    }
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            schema_version: 1,
            type_markers: TypeMarkers::new(),
            line_width: DEFAULT_LINE_WIDTH,
            manifest: None,
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path`, or `seqdedup.json` from the working directory when no
    /// path is given. Only the default location may be absent.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, SeqDedupError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Err(SeqDedupError::MissingConfig);
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| SeqDedupError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| SeqDedupError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    /// Like [`ConfigLoader::resolve`], but falls back to defaults when the
    /// default config file does not exist.
    pub fn resolve_or_default(path: Option<&str>) -> Result<ResolvedConfig, SeqDedupError> {
        match Self::resolve(path) {
            Err(SeqDedupError::MissingConfig) => Ok(ResolvedConfig::default()),
            other => other,
        }
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, SeqDedupError> {
        let schema_version = config.schema_version.unwrap_or(1);

        let type_markers = config
            .type_markers
            .into_iter()
            .map(|entry| match entry {
                TypeMarkerEntry::Shorthand(value) => value.parse::<TypeMarker>(),
                TypeMarkerEntry::Detailed(obj) => obj.marker.parse::<TypeMarker>(),
            })
            .collect::<Result<TypeMarkers, SeqDedupError>>()?;

        Ok(ResolvedConfig {
            schema_version,
            type_markers,
            line_width: config.line_width.unwrap_or(DEFAULT_LINE_WIDTH),
            manifest: config.manifest,
        })
    }
}
