//! Representation catalog: the set of visual representations entities may use.
//!
//! Entities reference representations by handle, never by file path. Loading
//! geometry is the renderer's business; this crate only names what exists.
//!
//! # Layout
//! A catalog can be persisted to disk as a JSON manifest:
//! ```text
//! [{ "name": "fish", "player_only": true }, { "name": "bottle", "player_only": false }]
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Index of a representation inside its catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepresentationHandle(pub u32);

/// A named visual representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Representation {
    pub name: String,
    /// Reserved for interactive entities; never handed to the collectible pool.
    #[serde(default)]
    pub player_only: bool,
}

/// Errors from catalog operations.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("representation not found: {0}")]
    MissingRepresentation(String),
    #[error("duplicate representation: {0}")]
    Duplicate(String),
}

/// Supplies the available representations and resolves names to handles.
///
/// The renderer implements this over its loaded models; the simulation only
/// ever sees names and handles.
pub trait RepresentationProvider {
    fn representations(&self) -> &[Representation];

    fn lookup(&self, name: &str) -> Option<RepresentationHandle> {
        self.representations()
            .iter()
            .position(|r| r.name == name)
            .map(|i| RepresentationHandle(i as u32))
    }

    fn name_of(&self, handle: RepresentationHandle) -> Option<&str> {
        self.representations()
            .get(handle.0 as usize)
            .map(|r| r.name.as_str())
    }

    /// Non-player representations in declaration order.
    fn collectible_handles(&self) -> Vec<RepresentationHandle> {
        self.representations()
            .iter()
            .enumerate()
            .filter(|(_, r)| !r.player_only)
            .map(|(i, _)| RepresentationHandle(i as u32))
            .collect()
    }
}

/// In-memory catalog backed by an ordered list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepresentationCatalog {
    entries: Vec<Representation>,
}

impl RepresentationCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The model set shipped with the game: two player models and the trash
    /// models collectibles cycle through.
    pub fn default_set() -> Self {
        let mut catalog = Self::new();
        for name in ["fish", "diver"] {
            catalog.entries.push(Representation {
                name: name.into(),
                player_only: true,
            });
        }
        for name in ["bottle", "can", "bag", "tire", "net"] {
            catalog.entries.push(Representation {
                name: name.into(),
                player_only: false,
            });
        }
        catalog
    }

    /// Register a representation and return its handle.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        player_only: bool,
    ) -> Result<RepresentationHandle, CatalogError> {
        let name = name.into();
        if self.lookup(&name).is_some() {
            return Err(CatalogError::Duplicate(name));
        }
        self.entries.push(Representation { name, player_only });
        Ok(RepresentationHandle(self.entries.len() as u32 - 1))
    }

    /// Resolve a name, reporting a missing representation as an error.
    pub fn require(&self, name: &str) -> Result<RepresentationHandle, CatalogError> {
        self.lookup(name)
            .ok_or_else(|| CatalogError::MissingRepresentation(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Save the catalog to a JSON manifest.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CatalogError> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    /// Load a catalog from a JSON manifest.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let file = std::fs::File::open(path)?;
        let catalog: Self = serde_json::from_reader(file)?;
        tracing::info!(count = catalog.len(), "representation catalog loaded");
        Ok(catalog)
    }
}

impl RepresentationProvider for RepresentationCatalog {
    fn representations(&self) -> &[Representation] {
        &self.entries
    }
}
