use crate::builder::TopLevelPolicy;
use crate::pipeline::{default_workers, PipelineOptions};
use crate::sink::OutputFormat;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Contents of `codechunk.toml`; every field is optional
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ChunkerConfig {
    pub output: Option<PathBuf>,
    pub workers: Option<usize>,
    pub format: Option<OutputFormat>,
    pub extensions: Option<Vec<String>>,
    pub excludes: Vec<String>,
    pub top_level: Option<TopLevelPolicy>,
    pub provenance: Option<bool>,
}

impl ChunkerConfig {
    /// Fully populated config written by `codechunk init`
    pub fn starter() -> Self {
        let defaults = PipelineOptions::default();
        Self {
            output: Some(PathBuf::from("chunks")),
            workers: Some(defaults.workers),
            format: Some(OutputFormat::default()),
            extensions: Some(defaults.extensions),
            excludes: Vec::new(),
            top_level: Some(defaults.top_level),
            provenance: Some(defaults.provenance),
        }
    }

    /// Pipeline options from this config, built-in defaults filling the gaps
    pub fn pipeline_options(&self) -> PipelineOptions {
        let defaults = PipelineOptions::default();
        PipelineOptions {
            workers: self.workers.filter(|w| *w > 0).unwrap_or_else(default_workers),
            provenance: self.provenance.unwrap_or(defaults.provenance),
            top_level: self.top_level.unwrap_or(defaults.top_level),
            extensions: self.extensions.clone().unwrap_or(defaults.extensions),
            excludes: self.excludes.clone(),
            ..defaults
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("codechunk.toml")
}

/// Load the config file.
///
/// A missing default file means "no config"; a missing explicit path is an error.
pub fn load_config(path: Option<&Path>) -> Result<Option<ChunkerConfig>> {
    let explicit = path.is_some();
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        if explicit {
            return Err(Error::Config(format!("config file {} not found", path.display())));
        }
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: ChunkerConfig = toml::from_str(&contents)
        .map_err(|e| Error::Config(format!("invalid config {}: {}", path.display(), e)))?;
    tracing::debug!("Loaded config from {}", path.display());
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &ChunkerConfig, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(Error::Config(format!(
            "config already exists at {} (use --force to overwrite)",
            path.display()
        )));
    }

    let contents = toml::to_string_pretty(config).map_err(|e| Error::Config(e.to_string()))?;
    std::fs::write(path, contents)?;
    Ok(())
}
