//! Checkpoint loading functionality

use super::model::CheckpointState;
use crate::{Error, Result};
use std::fs;
use std::path::Path;

/// Load a checkpoint written by [`save_checkpoint`](super::save_checkpoint)
pub fn load_checkpoint(path: impl AsRef<Path>) -> Result<CheckpointState> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .map_err(|e| Error::io(format!("reading checkpoint {}", path.display()), e))?;

    serde_json::from_str(&content).map_err(|e| Error::Checkpoint {
        path: path.to_path_buf(),
        message: format!("JSON deserialization failed: {e}"),
    })
}
