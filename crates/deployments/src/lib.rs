//! Durable per-network record of contract deployments.
//!
//! A [`Registry`] maps a contract type to the chronological list of its
//! deployments on one [`Network`]. The [`Store`] persists one registry per
//! network as a JSON file, and the [`version`] and [`tag`] modules hold the
//! pure policies applied before a new record is appended.

pub mod record;
pub mod registry;
pub mod store;
pub mod tag;
pub mod version;

pub use {
    record::{Args, DeploymentRecord, Kind},
    registry::{Network, Registry},
    store::Store,
};

use std::{io, path::PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid network name {0:?}")]
    InvalidNetwork(String),
    #[error("I/O error on {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed deployment registry {path:?}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode deployment registry")]
    Encode(#[source] serde_json::Error),
}
