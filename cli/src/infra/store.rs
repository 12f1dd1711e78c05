//! Infrastructure implementation of the `MachineStore` port.
//!
//! `MachineDataDir` keeps the identity and metadata files in the host's
//! per-machine directory. Writes use `tokio::task::spawn_blocking` with an
//! atomic temp-file rename; removal ignores files that are already gone.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use orbstack_common::MachineMetadata;

use crate::application::ports::MachineStore;
use crate::domain::ProviderError;

/// Identity file name (plain text, the generated machine name).
pub const IDENTITY_FILE: &str = "id";

/// Metadata file name (JSON).
pub const METADATA_FILE: &str = "metadata.json";

/// Per-machine data directory.
#[derive(Debug, Clone)]
pub struct MachineDataDir {
    dir: PathBuf,
}

impl MachineDataDir {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn identity_path(&self) -> PathBuf {
        self.dir.join(IDENTITY_FILE)
    }

    #[must_use]
    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join(METADATA_FILE)
    }

    fn load_identity_sync(&self) -> Result<Option<String>, ProviderError> {
        let path = self.identity_path();
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let id = content.trim();
                Ok((!id.is_empty()).then(|| id.to_string()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ProviderError::storage(path, e)),
        }
    }

    fn load_metadata_sync(&self) -> Result<Option<MachineMetadata>, ProviderError> {
        let path = self.metadata_path();
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ProviderError::storage(path, e)),
        };
        serde_json::from_str(&content).map(Some).map_err(|e| {
            ProviderError::storage(path, std::io::Error::new(ErrorKind::InvalidData, e))
        })
    }

    fn save_sync(&self, metadata: &MachineMetadata) -> Result<(), ProviderError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| ProviderError::storage(&self.dir, e))?;
        let json = serde_json::to_string_pretty(metadata).map_err(|e| {
            ProviderError::storage(
                self.metadata_path(),
                std::io::Error::new(ErrorKind::InvalidData, e),
            )
        })?;
        write_atomic(&self.metadata_path(), &json)?;
        write_atomic(&self.identity_path(), &format!("{}\n", metadata.machine_name))
    }

    fn clear_sync(&self) -> Result<(), ProviderError> {
        remove_if_present(&self.identity_path())?;
        remove_if_present(&self.metadata_path())
    }
}

impl MachineStore for MachineDataDir {
    async fn load_identity(&self) -> Result<Option<String>, ProviderError> {
        let store = self.clone();
        blocking(move || store.load_identity_sync()).await
    }

    async fn load_metadata(&self) -> Result<Option<MachineMetadata>, ProviderError> {
        let store = self.clone();
        blocking(move || store.load_metadata_sync()).await
    }

    async fn save(&self, metadata: &MachineMetadata) -> Result<(), ProviderError> {
        let store = self.clone();
        let metadata = metadata.clone();
        blocking(move || store.save_sync(&metadata)).await
    }

    async fn clear(&self) -> Result<(), ProviderError> {
        let store = self.clone();
        blocking(move || store.clear_sync()).await
    }
}

async fn blocking<T, F>(f: F) -> Result<T, ProviderError>
where
    F: FnOnce() -> Result<T, ProviderError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        ProviderError::storage(
            PathBuf::new(),
            std::io::Error::other(format!("storage task failed: {e}")),
        )
    })?
}

fn write_atomic(path: &Path, content: &str) -> Result<(), ProviderError> {
    let temp_path = path.with_extension("tmp");
    std::fs::write(&temp_path, content).map_err(|e| ProviderError::storage(&temp_path, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600))
            .map_err(|e| ProviderError::storage(&temp_path, e))?;
    }

    std::fs::rename(&temp_path, path).map_err(|e| ProviderError::storage(path, e))
}

fn remove_if_present(path: &Path) -> Result<(), ProviderError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ProviderError::storage(path, e)),
    }
}
