//! JSON file persistence for deployment state.
//!
//! One pretty-printed JSON document per deployment, written atomically via
//! a temporary file in the same directory.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::{DeploymentState, StateError, StateResult};

/// File-based state store keeping one `<deployment>.json` per deployment.
#[derive(Debug, Clone)]
pub struct JsonStateStore {
    state_dir: PathBuf,
}

impl JsonStateStore {
    /// Opens (and creates if needed) a store rooted at `state_dir`.
    pub fn new(state_dir: impl Into<PathBuf>) -> StateResult<Self> {
        let state_dir = state_dir.into();
        fs::create_dir_all(&state_dir)?;
        Ok(Self { state_dir })
    }

    /// The directory documents are stored in.
    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    fn document_path(&self, deployment: &str) -> PathBuf {
        self.state_dir.join(format!("{deployment}.json"))
    }

    /// Loads the state of a deployment.
    pub fn load(&self, deployment: &str) -> StateResult<DeploymentState> {
        let path = self.document_path(deployment);
        if !path.exists() {
            return Err(StateError::DeploymentNotFound(deployment.to_string()));
        }
        let file = File::open(&path)?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).map_err(|e| StateError::Corrupt {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Loads the state of a deployment, or starts a fresh one.
    pub fn load_or_new(&self, deployment: &str) -> StateResult<DeploymentState> {
        match self.load(deployment) {
            Ok(state) => Ok(state),
            Err(StateError::DeploymentNotFound(_)) => Ok(DeploymentState::new(deployment)),
            Err(e) => Err(e),
        }
    }

    /// Writes a deployment's state atomically.
    pub fn save(&self, state: &DeploymentState) -> StateResult<()> {
        let path = self.document_path(&state.name);
        let tmp = NamedTempFile::new_in(&self.state_dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut writer, state)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }
        tmp.persist(&path).map_err(|e| StateError::Io(e.error))?;
        tracing::debug!(deployment = %state.name, serial = state.serial, "state saved");
        Ok(())
    }

    /// Lists the deployments the store knows about, sorted by name.
    pub fn list(&self) -> StateResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.state_dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Deletes a deployment's state document.
    pub fn delete(&self, deployment: &str) -> StateResult<()> {
        let path = self.document_path(deployment);
        if !path.exists() {
            return Err(StateError::DeploymentNotFound(deployment.to_string()));
        }
        fs::remove_file(path)?;
        Ok(())
    }
}
