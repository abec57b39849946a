//! # Startup Recovery
//!
//! Opens the block store and repairs it when the previous run left it
//! unusable: either the store fails to open, or its processing flag says a
//! chain mutation was cut short.
//!
//! ```text
//! open ──ok, not processing──────────────────────────────► Clean
//!   │
//!   └─ failed / processing ─► wipe chain dir
//!                               │
//!             checkpoint? ──yes─► restore ─► open ──ok──► RestoredFromCheckpoint
//!                 │                           │
//!                 no                       failed ─► wipe chain dir + checkpoint
//!                 │                           │
//!                 └──────────────► open empty ◄┘ ─────────► Rebuilt
//!
//! still processing after all of this ─► RecoveryError::StillProcessing
//! ```
//!
//! On a clean shutdown the runtime copies the chain directory into the
//! checkpoint through [`Checkpoint::save`].

use crate::adapters::storage::{open_backend, NodeBlockStore};
use crate::container::config::StorageBackend;
use fs2::FileExt;
use hx_01_block_store::{
    BincodeBlockSerializer, BlockStore, BlockStoreApi, BlockStoreDependencies, StoreError,
};
use shared_bus::EventPublisher;
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Name of the lock file inside the data directory.
pub const LOCK_FILE_NAME: &str = "LOCK";

#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("data directory {} is in use by another node", .path.display())]
    AlreadyLocked { path: PathBuf },

    #[error("I/O error on {}: {message}", .path.display())]
    Io { path: PathBuf, message: String },

    /// Even an empty store could not be opened.
    #[error("cannot open block store: {0}")]
    Store(#[from] StoreError),

    #[error(
        "block store at {} is still marked as mid-update after recovery; \
         delete the data directory and restart",
        .path.display()
    )]
    StillProcessing { path: PathBuf },
}

impl RecoveryError {
    fn io(path: &Path, error: std::io::Error) -> Self {
        RecoveryError::Io {
            path: path.to_path_buf(),
            message: error.to_string(),
        }
    }
}

/// How the store came to be usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// Opened as-is.
    Clean,
    /// Replaced by the last checkpoint.
    RestoredFromCheckpoint,
    /// Started over from an empty store.
    Rebuilt,
}

/// A saved copy of the store directory.
pub trait Checkpoint: Send + Sync {
    fn exists(&self) -> bool;

    /// Replace the checkpoint with a copy of `source`.
    fn save(&self, source: &Path) -> Result<(), RecoveryError>;

    /// Copy the checkpoint into `target`, which must not exist.
    fn restore(&self, target: &Path) -> Result<(), RecoveryError>;

    fn discard(&self) -> Result<(), RecoveryError>;
}

/// Checkpoint kept as a plain directory copy.
#[derive(Debug, Clone)]
pub struct DirectoryCheckpoint {
    dir: PathBuf,
}

impl DirectoryCheckpoint {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    fn staging_dir(&self) -> PathBuf {
        let mut name = self
            .dir
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.dir.with_file_name(name)
    }
}

impl Checkpoint for DirectoryCheckpoint {
    fn exists(&self) -> bool {
        self.dir.is_dir()
    }

    fn save(&self, source: &Path) -> Result<(), RecoveryError> {
        let staging = self.staging_dir();
        remove_dir_if_exists(&staging)?;
        copy_dir_all(source, &staging)?;
        remove_dir_if_exists(&self.dir)?;
        fs::rename(&staging, &self.dir).map_err(|e| RecoveryError::io(&self.dir, e))?;
        info!(checkpoint = %self.dir.display(), "Checkpoint saved");
        Ok(())
    }

    fn restore(&self, target: &Path) -> Result<(), RecoveryError> {
        copy_dir_all(&self.dir, target)?;
        info!(checkpoint = %self.dir.display(), "Checkpoint restored");
        Ok(())
    }

    fn discard(&self) -> Result<(), RecoveryError> {
        remove_dir_if_exists(&self.dir)
    }
}

/// Exclusive lock on the data directory, released on drop.
#[derive(Debug)]
pub struct DataDirLock {
    file: File,
    path: PathBuf,
}

impl DataDirLock {
    pub fn acquire(data_dir: &Path) -> Result<Self, RecoveryError> {
        fs::create_dir_all(data_dir).map_err(|e| RecoveryError::io(data_dir, e))?;
        let path = data_dir.join(LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| RecoveryError::io(&path, e))?;
        file.try_lock_exclusive()
            .map_err(|_| RecoveryError::AlreadyLocked {
                path: data_dir.to_path_buf(),
            })?;
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DataDirLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(path = %self.path.display(), error = %e, "Failed to release data directory lock");
        }
    }
}

/// Opens block stores over one backend and directory.
pub struct StoreOpener {
    pub backend: StorageBackend,
    pub chain_dir: PathBuf,
    pub publisher: Arc<dyn EventPublisher>,
}

impl StoreOpener {
    pub fn open(&self) -> Result<NodeBlockStore, StoreError> {
        let kv_store = open_backend(self.backend, &self.chain_dir)?;
        BlockStore::open(BlockStoreDependencies {
            kv_store,
            serializer: BincodeBlockSerializer,
            publisher: self.publisher.clone(),
        })
    }

    fn wipe(&self) -> Result<(), RecoveryError> {
        remove_dir_if_exists(&self.chain_dir)
    }

    /// Open the store, repairing it as described in the module docs.
    pub fn open_with_recovery(
        &self,
        checkpoint: Option<&dyn Checkpoint>,
    ) -> Result<(NodeBlockStore, RecoveryOutcome), RecoveryError> {
        match self.open() {
            Ok(store) if !store.is_processing() => return Ok((store, RecoveryOutcome::Clean)),
            Ok(store) => {
                warn!(
                    height = store.height(),
                    "Block store was interrupted mid-update, recreating it"
                );
            }
            Err(e) => warn!(error = %e, "Block store failed to open, recreating it"),
        }
        self.wipe()?;

        let (store, outcome) = match checkpoint.filter(|c| c.exists()) {
            Some(checkpoint) => {
                checkpoint.restore(&self.chain_dir)?;
                match self.open() {
                    Ok(store) => (store, RecoveryOutcome::RestoredFromCheckpoint),
                    Err(e) => {
                        warn!(error = %e, "Checkpoint is unusable, starting from an empty store");
                        self.wipe()?;
                        checkpoint.discard()?;
                        (self.open()?, RecoveryOutcome::Rebuilt)
                    }
                }
            }
            None => (self.open()?, RecoveryOutcome::Rebuilt),
        };

        if store.is_processing() {
            return Err(RecoveryError::StillProcessing {
                path: self.chain_dir.clone(),
            });
        }
        info!(height = store.height(), ?outcome, "Block store recovered");
        Ok((store, outcome))
    }
}

fn remove_dir_if_exists(path: &Path) -> Result<(), RecoveryError> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(RecoveryError::io(path, e)),
    }
}

fn copy_dir_all(source: &Path, target: &Path) -> Result<(), RecoveryError> {
    fs::create_dir_all(target).map_err(|e| RecoveryError::io(target, e))?;
    let entries = fs::read_dir(source).map_err(|e| RecoveryError::io(source, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| RecoveryError::io(source, e))?;
        let from = entry.path();
        let to = target.join(entry.file_name());
        let file_type = entry.file_type().map_err(|e| RecoveryError::io(&from, e))?;
        if file_type.is_dir() {
            copy_dir_all(&from, &to)?;
        } else {
            fs::copy(&from, &to).map_err(|e| RecoveryError::io(&from, e))?;
        }
    }
    Ok(())
}
