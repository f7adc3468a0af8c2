//! Failures that can surface before steady-state ticking begins

use thiserror::Error;

use crate::assets::AssetKey;

/// `mount` precondition failures; nothing is created when these are returned
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MountError {
    #[error("a container element is required to mount the city")]
    MissingContainer,
}

/// Asset loading failures reported by the boot sequence
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BootError {
    #[error("failed to load {asset:?} from {url}: {reason}")]
    AssetLoad {
        asset: AssetKey,
        url: String,
        reason: String,
    },
}
