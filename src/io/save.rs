//! Checkpoint saving functionality

use super::model::CheckpointState;
use crate::{Error, Result};
use std::fs;
use std::path::Path;

/// Save a checkpoint as JSON
///
/// The state is written to a sibling `.tmp` file which is then renamed over
/// `path`, so a file at `path` is always complete. Parent directories are
/// created as needed.
pub fn save_checkpoint(state: &CheckpointState, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| Error::io(format!("creating {}", parent.display()), e))?;
    }

    let data = serde_json::to_string(state)
        .map_err(|e| Error::Serialization(format!("JSON serialization failed: {e}")))?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    fs::write(&tmp, data.as_bytes())
        .map_err(|e| Error::io(format!("writing {}", Path::new(&tmp).display()), e))?;
    fs::rename(&tmp, path).map_err(|e| Error::io(format!("replacing {}", path.display()), e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{load_checkpoint, ModelState};
    use crate::model::{AttentionSeq2Seq, ModelConfig};
    use crate::optim::{Adam, Optimizer};
    use tempfile::TempDir;

    fn state(epoch: usize) -> CheckpointState {
        let model =
            AttentionSeq2Seq::new(ModelConfig { arch: "attention_tiny".into(), embed_dim: 2 }, 4, 5, 0);
        CheckpointState {
            epoch,
            best_loss: Some(12.5),
            val_loss: Some(13.0),
            model: ModelState::capture(&model),
            optimizer: Adam::default_params(0.1).state(),
        }
    }

    #[test]
    fn test_save_creates_directories_and_leaves_no_tmp() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/checkpoints/checkpoint_last.json");

        save_checkpoint(&state(1), &path).unwrap();

        assert!(path.exists());
        assert!(!dir.path().join("nested/checkpoints/checkpoint_last.json.tmp").exists());
    }

    #[test]
    fn test_save_overwrites_previous() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("checkpoint_last.json");

        save_checkpoint(&state(1), &path).unwrap();
        save_checkpoint(&state(2), &path).unwrap();

        assert_eq!(load_checkpoint(&path).unwrap().epoch, 2);
    }
}
