//! Per-sender "expanded message" preference.
//!
//! Long messages render collapsed; the ids a user expanded are remembered per
//! sender in a small JSON file. This is the only client state that outlives
//! the process, and it never contains message content.

use crate::model::{Identity, MessageId};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Failure reading or writing the preference file.
#[derive(Debug, Error)]
pub enum PrefsError {
    /// The file exists but could not be read, or could not be written.
    #[error("Preference file {path:?}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid preference JSON.
    #[error("Invalid preference file {path:?}: {source}")]
    Parse {
        /// File involved.
        path: PathBuf,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },
}

/// Default preference file: `~/.local/state/smsview/expanded-messages.json`.
pub fn default_prefs_path() -> PathBuf {
    match dirs::state_dir() {
        Some(state_dir) => state_dir.join("smsview").join("expanded-messages.json"),
        None => PathBuf::from("expanded-messages.json"),
    }
}

/// Expanded message ids keyed by sender.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpandedMessages {
    by_sender: BTreeMap<Identity, BTreeSet<MessageId>>,
}

impl ExpandedMessages {
    /// Nothing expanded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `path`. A missing file yields an empty set.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, PrefsError> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let raw = std::fs::read_to_string(path).map_err(|source| PrefsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let by_sender = serde_json::from_str(&raw).map_err(|source| PrefsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self { by_sender })
    }

    /// Write to `path`, creating its directory on demand.
    ///
    /// # Errors
    ///
    /// Fails if the directory or file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), PrefsError> {
        let io_err = |source| PrefsError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(&self.by_sender).map_err(|source| {
            PrefsError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })?;
        std::fs::write(path, json).map_err(io_err)?;
        debug!(
            path = %path.display(),
            senders = self.by_sender.len(),
            "Saved expanded-message preferences"
        );
        Ok(())
    }

    /// Flip the expanded state of `id` for `sender`. Returns the new state.
    pub fn toggle(&mut self, sender: &Identity, id: &MessageId) -> bool {
        let ids = self.by_sender.entry(sender.clone()).or_default();
        let expanded = if ids.remove(id) {
            false
        } else {
            ids.insert(id.clone());
            true
        };
        if ids.is_empty() {
            self.by_sender.remove(sender);
        }
        expanded
    }

    /// Whether `id` is expanded for `sender`.
    pub fn is_expanded(&self, sender: &Identity, id: &MessageId) -> bool {
        self.by_sender
            .get(sender)
            .is_some_and(|ids| ids.contains(id))
    }

    /// Expanded ids of `sender`.
    pub fn expanded_for(&self, sender: &Identity) -> impl Iterator<Item = &MessageId> {
        self.by_sender.get(sender).into_iter().flatten()
    }
}
