//! Stage factory and parameter parsing for presets.

use std::collections::HashMap;

use cadena_core::{SharedProcessor, registry, shared};
use cadena_effects::{Fade, Gain};

/// Error type for stage creation.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("unknown parameter '{param}' for stage '{stage}'")]
    UnknownParameter { stage: String, param: String },

    #[error("invalid value for '{param}': {message}")]
    InvalidValue { param: String, message: String },

    #[error("stage '{id}' takes no parameters")]
    NoParameters { id: String },

    #[error(transparent)]
    Registry(#[from] cadena_core::Error),
}

/// Build a pipeline stage from its registry id and preset parameters.
///
/// `gain` and `fade` have dedicated parameter handling; every other id
/// falls through to the registry factory and accepts no parameters.
pub fn create_stage(
    id: &str,
    samplerate: u32,
    params: &HashMap<String, String>,
) -> Result<SharedProcessor, StageError> {
    match id {
        "gain" => {
            let mut gain = Gain::default();
            for (key, value) in params {
                match key.as_str() {
                    "factor" => gain = Gain::new(parse_f32(key, value)?),
                    "db" => gain = Gain::from_db(parse_f32(key, value)?),
                    _ => {
                        return Err(StageError::UnknownParameter {
                            stage: id.to_string(),
                            param: key.to_string(),
                        });
                    }
                }
            }
            Ok(shared(gain))
        }
        "fade" => {
            let mut fade_in = 0.0f32;
            let mut fade_out = 0.0f32;
            for (key, value) in params {
                match key.as_str() {
                    "fade_in" | "in" => fade_in = parse_f32(key, value)?,
                    "fade_out" | "out" => fade_out = parse_f32(key, value)?,
                    _ => {
                        return Err(StageError::UnknownParameter {
                            stage: id.to_string(),
                            param: key.to_string(),
                        });
                    }
                }
            }
            Ok(shared(Fade::new(
                seconds_to_frames(fade_in, samplerate),
                seconds_to_frames(fade_out, samplerate),
            )))
        }
        _ => {
            if !params.is_empty() {
                return Err(StageError::NoParameters { id: id.to_string() });
            }
            Ok(registry::create(id)?)
        }
    }
}

/// Convert a seconds value from a preset or flag into whole frames.
pub fn seconds_to_frames(seconds: f32, samplerate: u32) -> u64 {
    (f64::from(seconds) * f64::from(samplerate)).round() as u64
}

fn parse_f32(key: &str, value: &str) -> Result<f32, StageError> {
    value.parse().map_err(|_| StageError::InvalidValue {
        param: key.to_string(),
        message: format!("'{value}' is not a number"),
    })
}
