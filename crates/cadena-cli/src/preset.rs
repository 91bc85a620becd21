//! Preset file format for pipeline stage chains.
//!
//! Presets are stored as TOML files naming the stages to insert between
//! the decoder and the encoder, looked up by registry id.

use serde::Deserialize;
use std::collections::HashMap;

/// Preset file format.
#[derive(Debug, Deserialize)]
pub struct Pipeline {
    /// Name of the pipeline
    pub name: String,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
    /// Stages in pipe order
    pub stages: Vec<StageConfig>,
}

/// Configuration for a single stage in a preset.
#[derive(Debug, Deserialize)]
pub struct StageConfig {
    /// Registry id of the stage (e.g. "gain", "fade")
    pub id: String,
    /// Stage parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}
