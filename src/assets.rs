//! Asset catalog
//!
//! Declares every resource the simulation needs and resolves it against the
//! base path the page is served from.

use serde::{Deserialize, Serialize};

/// Directory (under the base path) holding the simulation assets
pub const ASSET_DIR: &str = "phaser/";

/// What kind of loader an asset needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Image,
    Audio,
}

/// Every resource the simulation loads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AssetKey {
    /// City backdrop; its size defines the world bounds
    Backdrop,
    /// Player avatar
    Robot,
    /// Living cat
    CatAlive,
    /// Cat corpse
    CatCorpse,
    /// Car hazard
    Car,
    /// Crash sound effect
    CrashSfx,
}

impl AssetKey {
    pub const ALL: [AssetKey; 6] = [
        AssetKey::Backdrop,
        AssetKey::Robot,
        AssetKey::CatAlive,
        AssetKey::CatCorpse,
        AssetKey::Car,
        AssetKey::CrashSfx,
    ];

    /// File name inside `ASSET_DIR`
    pub fn file_name(&self) -> &'static str {
        match self {
            AssetKey::Backdrop => "cidade-fundo.jpg",
            AssetKey::Robot => "robo.png",
            AssetKey::CatAlive => "gato-vivo.png",
            AssetKey::CatCorpse => "morto.png",
            AssetKey::Car => "car.png",
            AssetKey::CrashSfx => "gato.mp3",
        }
    }

    pub fn kind(&self) -> AssetKind {
        match self {
            AssetKey::CrashSfx => AssetKind::Audio,
            _ => AssetKind::Image,
        }
    }
}

/// A single resolved load request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRequest {
    pub key: AssetKey,
    pub url: String,
}

/// The resolved asset set
#[derive(Debug, Clone)]
pub struct AssetCatalog {
    base_url: String,
}

impl AssetCatalog {
    /// Build a catalog for a page served under `base_path`, optionally on `origin`
    /// (e.g. `https://example.org`). Without an origin the URLs stay relative.
    pub fn new(origin: Option<&str>, base_path: &str) -> Self {
        let base = normalize_base(base_path);
        let base_url = match origin {
            Some(origin) if !origin.is_empty() => {
                format!("{}{}", origin.trim_end_matches('/'), base)
            }
            _ => base,
        };
        Self { base_url }
    }

    /// Absolute (or root-relative) base URL, always ending in `/`
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve a path relative to the base URL
    pub fn resolve(&self, rel_path: &str) -> String {
        format!("{}{}", self.base_url, rel_path.trim_start_matches('/'))
    }

    /// URL of one catalog entry
    pub fn url(&self, key: AssetKey) -> String {
        self.resolve(&format!("{}{}", ASSET_DIR, key.file_name()))
    }

    /// Load requests for the whole catalog
    pub fn requests(&self) -> Vec<AssetRequest> {
        AssetKey::ALL
            .iter()
            .map(|&key| AssetRequest {
                key,
                url: self.url(key),
            })
            .collect()
    }
}

impl Default for AssetCatalog {
    fn default() -> Self {
        Self::new(None, "/")
    }
}

/// `""`, `"site"` and `"/site"` all become `"/site/"`-style bases
fn normalize_base(base_path: &str) -> String {
    let trimmed = base_path.trim();
    if trimmed.is_empty() || trimmed == "/" {
        return "/".to_string();
    }
    let mut base = String::with_capacity(trimmed.len() + 2);
    if !trimmed.starts_with('/') {
        base.push('/');
    }
    base.push_str(trimmed);
    if !trimmed.ends_with('/') {
        base.push('/');
    }
    base
}
