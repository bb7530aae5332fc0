// File: src/assets.rs
// Purpose: Build manifest loading, content-hashed asset names and preload lists

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::warn;

use crate::error::Error;
use crate::graph;

/// How a content hash is attached to an asset URL
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashStyle {
    /// `/a.js?abc123`
    #[default]
    Query,
    /// `/a-abc123.js`
    Filename,
}

/// Contents of `<build>/.meta.json` as written by the bundler
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub version: u32,

    /// Asset path to content hash
    #[serde(default)]
    pub hashed: HashMap<String, String>,

    /// Asset path to its static imports
    #[serde(default)]
    pub dependencies: HashMap<String, Vec<String>>,
}

/// Asset hashes and import lists, replaced wholesale on reload
#[derive(Debug, Clone, Default)]
pub struct AssetRegistry {
    manifest: Manifest,
    style: HashStyle,
    /// Hashed filename back to asset, filled for [`HashStyle::Filename`]
    reverse: HashMap<String, String>,
}

impl AssetRegistry {
    pub fn new(manifest: Manifest, style: HashStyle) -> Self {
        let reverse = match style {
            HashStyle::Query => HashMap::new(),
            HashStyle::Filename => manifest
                .hashed
                .iter()
                .map(|(asset, hash)| (filename_hash(asset, hash), asset.clone()))
                .collect(),
        };
        Self {
            manifest,
            style,
            reverse,
        }
    }

    /// Loads the manifest at `path`
    ///
    /// A missing manifest yields an empty registry; a malformed one is an error.
    pub fn load(path: &Path, style: HashStyle) -> Result<Self, Error> {
        if !path.exists() {
            warn!("Build manifest not found: {:?}, assets will not be hashed", path);
            return Ok(Self::new(Manifest::default(), style));
        }

        let manifest = fs::read_to_string(path)
            .context("failed to read manifest")
            .and_then(|content| {
                serde_json::from_str::<Manifest>(&content).context("failed to parse manifest")
            })
            .map_err(|source| Error::Manifest {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(Self::new(manifest, style))
    }

    pub fn style(&self) -> HashStyle {
        self.style
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn hash(&self, asset: &str) -> Option<&str> {
        self.manifest.hashed.get(asset).map(String::as_str)
    }

    /// Cache-busting URL for `asset`; unchanged when it has no hash
    pub fn hashed_name(&self, asset: &str) -> String {
        match (self.hash(asset), self.style) {
            (None, _) => asset.to_string(),
            (Some(hash), HashStyle::Query) => format!("{asset}?{hash}"),
            (Some(hash), HashStyle::Filename) => filename_hash(asset, hash),
        }
    }

    /// Asset a hashed filename was derived from
    pub fn original_asset(&self, hashed: &str) -> Option<&str> {
        self.reverse.get(hashed).map(String::as_str)
    }

    pub fn dependencies(&self, asset: &str) -> &[String] {
        self.manifest
            .dependencies
            .get(asset)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Resolves a static request to the file to serve and whether it named a hash
    pub fn resolve_request<'a>(&'a self, path: &'a str, query: Option<&str>) -> (&'a str, bool) {
        match self.style {
            HashStyle::Query => {
                let hashed = query.is_some_and(|q| self.hash(path) == Some(q));
                (path, hashed)
            }
            HashStyle::Filename => match self.original_asset(path) {
                Some(asset) => (asset, true),
                None => (path, false),
            },
        }
    }

    /// Modules to preload for `roots`, in order, with their imports
    ///
    /// Each root is followed by its dependency tree, depth-first. Every asset
    /// appears once, under its hashed name.
    pub fn preloads(&self, roots: &[String]) -> Vec<String> {
        graph::walk(roots.iter().cloned(), |asset| self.dependencies(asset).to_vec())
            .iter()
            .map(|asset| self.hashed_name(asset))
            .collect()
    }
}

/// `/dir/name.ext` → `/dir/name-hash.ext`
fn filename_hash(asset: &str, hash: &str) -> String {
    let (dir, file) = match asset.rfind('/') {
        Some(slash) => asset.split_at(slash + 1),
        None => ("", asset),
    };
    match file.rfind('.') {
        Some(dot) if dot > 0 => format!("{dir}{}-{hash}{}", &file[..dot], &file[dot..]),
        _ => format!("{dir}{file}-{hash}"),
    }
}
