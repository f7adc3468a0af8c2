//! One-shot asset loader
//!
//! The host performs the actual fetches and reports each result back. No
//! retries: the first failure is terminal and surfaces as a status message.

use std::collections::BTreeSet;

use glam::Vec2;

use crate::assets::{AssetCatalog, AssetKey, AssetRequest};
use crate::channel::{EventChannel, Status};
use crate::error::BootError;

#[derive(Debug, Clone, PartialEq)]
pub enum BootState {
    Idle,
    Loading { pending: BTreeSet<AssetKey> },
    Complete,
    Failed(BootError),
}

/// Result of reporting one asset
#[derive(Debug, Clone, PartialEq)]
pub enum BootProgress {
    /// Still waiting on this many assets
    Pending(usize),
    /// Last asset arrived; scenes may start
    Complete,
    Failed(BootError),
    /// Report for an asset that was not pending (late, duplicate, or after failure)
    Ignored,
}

#[derive(Debug)]
pub struct BootSequence {
    catalog: AssetCatalog,
    state: BootState,
    world_size: Option<Vec2>,
}

impl BootSequence {
    pub fn new(catalog: AssetCatalog) -> Self {
        Self {
            catalog,
            state: BootState::Idle,
            world_size: None,
        }
    }

    pub fn state(&self) -> &BootState {
        &self.state
    }

    pub fn catalog(&self) -> &AssetCatalog {
        &self.catalog
    }

    /// Backdrop dimensions, once known
    pub fn world_size(&self) -> Option<Vec2> {
        self.world_size
    }

    /// Begin loading; returns the requests the host must fulfil. Calling it
    /// again after the first time returns nothing.
    pub fn start(&mut self, channel: &EventChannel) -> Vec<AssetRequest> {
        if self.state != BootState::Idle {
            return Vec::new();
        }
        let requests = self.catalog.requests();
        self.state = BootState::Loading {
            pending: requests.iter().map(|r| r.key).collect(),
        };
        log::info!(
            "loading {} assets from {}",
            requests.len(),
            self.catalog.base_url()
        );
        channel.publish_status(Status::Loading);
        requests
    }

    /// An asset arrived; images report their natural size
    pub fn asset_loaded(&mut self, key: AssetKey, size: Option<Vec2>) -> BootProgress {
        let BootState::Loading { pending } = &mut self.state else {
            return BootProgress::Ignored;
        };
        if !pending.remove(&key) {
            return BootProgress::Ignored;
        }
        if key == AssetKey::Backdrop {
            self.world_size = size.filter(|s| s.x > 0.0 && s.y > 0.0);
        }
        log::debug!("loaded {key:?}, {} remaining", pending.len());
        if pending.is_empty() {
            self.state = BootState::Complete;
            log::info!("boot complete");
            BootProgress::Complete
        } else {
            BootProgress::Pending(pending.len())
        }
    }

    pub fn asset_failed(
        &mut self,
        key: AssetKey,
        reason: impl Into<String>,
        channel: &EventChannel,
    ) -> BootProgress {
        match &self.state {
            BootState::Loading { pending } if pending.contains(&key) => {}
            _ => return BootProgress::Ignored,
        }
        let err = BootError::AssetLoad {
            asset: key,
            url: self.catalog.url(key),
            reason: reason.into(),
        };
        log::warn!("{err}");
        self.state = BootState::Failed(err.clone());
        channel.publish_status(Status::LoadFailed);
        BootProgress::Failed(err)
    }
}
