use {
    crate::{Error, Network, Registry},
    std::{
        fs,
        io::{self, Write},
        path::{Path, PathBuf},
    },
    tempfile::NamedTempFile,
};

/// File backed registry storage: one pretty printed JSON file per network
/// inside a deployments directory.
///
/// There is no locking. Two processes saving the registry of the same
/// network concurrently will lose one of the updates.
#[derive(Clone, Debug)]
pub struct Store {
    dir: PathBuf,
}

impl Store {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, network: &Network) -> PathBuf {
        self.dir.join(format!("{network}.json"))
    }

    /// Reads the registry of `network`.
    ///
    /// Returns `Ok(None)` if nothing was ever saved for the network. A file
    /// that exists but cannot be read or decoded is an error.
    pub fn load(&self, network: &Network) -> Result<Option<Registry>, Error> {
        let path = self.path(network);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(Error::Io { path, source }),
        };
        serde_json::from_slice(&data)
            .map(Some)
            .map_err(|source| Error::Decode { path, source })
    }

    /// Replaces the registry of `network`, creating the deployments directory
    /// if needed.
    ///
    /// The content is written to a temporary file next to the target and
    /// then renamed over it, so readers never observe a partial write.
    pub fn save(&self, network: &Network, registry: &Registry) -> Result<(), Error> {
        let path = self.path(network);
        let io_error = |source| Error::Io {
            path: path.clone(),
            source,
        };

        if !self.dir.exists() {
            tracing::debug!(dir = ?self.dir, "creating deployments directory");
        }
        fs::create_dir_all(&self.dir).map_err(io_error)?;

        let mut data = serde_json::to_vec_pretty(registry).map_err(Error::Encode)?;
        data.push(b'\n');

        let mut file = NamedTempFile::new_in(&self.dir).map_err(io_error)?;
        file.write_all(&data).map_err(io_error)?;
        file.as_file().sync_all().map_err(io_error)?;
        file.persist(&path).map_err(|err| io_error(err.error))?;
        Ok(())
    }
}
