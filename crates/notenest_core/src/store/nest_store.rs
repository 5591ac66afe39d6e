//! Typed access to the document tree and panel width keys.

use super::{KeyValueStore, StoreError, StoreResult, DOCUMENT_TREE_KEY, PANEL_WIDTH_KEY};
use crate::config::WidthBounds;
use crate::model::tree::DocumentTree;
use log::{info, warn};

/// What `seed_if_missing` wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub seeded_tree: bool,
    pub seeded_width: bool,
}

/// Typed facade over a raw key-value store.
pub struct NestStore<S: KeyValueStore> {
    kv: S,
    width: WidthBounds,
}

impl<S: KeyValueStore> NestStore<S> {
    pub fn new(kv: S, width: WidthBounds) -> Self {
        Self { kv, width }
    }

    pub fn width_bounds(&self) -> WidthBounds {
        self.width
    }

    /// Reads the stored tree.
    ///
    /// A value that does not decode is reported as absent so callers fall
    /// back to the seed tree instead of failing the panel.
    pub fn load_tree(&self) -> StoreResult<Option<DocumentTree>> {
        let Some(raw) = self.kv.read(DOCUMENT_TREE_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str::<DocumentTree>(&raw) {
            Ok(tree) => Ok(Some(tree)),
            Err(err) => {
                warn!(
                    "event=tree_decode module=store status=error bytes={} error={}",
                    raw.len(),
                    err
                );
                Ok(None)
            }
        }
    }

    /// Overwrites the stored tree with `tree`, verbatim.
    pub fn save_tree(&mut self, tree: &DocumentTree) -> StoreResult<()> {
        let encoded = serde_json::to_string(tree).map_err(StoreError::Encode)?;
        self.kv.write(DOCUMENT_TREE_KEY, &encoded)
    }

    /// Stored width clamped to bounds; default when absent or unparsable.
    pub fn panel_width(&self) -> StoreResult<u32> {
        let stored = self.kv.read(PANEL_WIDTH_KEY)?;
        let width = stored
            .as_deref()
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .map(|width| self.width.clamp(width))
            .unwrap_or(self.width.default);
        Ok(width)
    }

    /// Clamps and stores `width`; returns the stored value.
    pub fn save_panel_width(&mut self, width: u32) -> StoreResult<u32> {
        let clamped = self.width.clamp(width);
        self.kv.write(PANEL_WIDTH_KEY, &clamped.to_string())?;
        Ok(clamped)
    }

    /// First-run initialization: writes the seed tree and default width for
    /// keys that are absent. Existing values are never replaced.
    pub fn seed_if_missing(&mut self, now_ms: i64) -> StoreResult<SeedReport> {
        let mut report = SeedReport::default();

        if self.kv.read(DOCUMENT_TREE_KEY)?.is_none() {
            self.save_tree(&DocumentTree::seed(now_ms))?;
            report.seeded_tree = true;
        }
        if self.kv.read(PANEL_WIDTH_KEY)?.is_none() {
            self.kv
                .write(PANEL_WIDTH_KEY, &self.width.default.to_string())?;
            report.seeded_width = true;
        }

        info!(
            "event=store_seed module=store status=ok seeded_tree={} seeded_width={}",
            report.seeded_tree, report.seeded_width
        );
        Ok(report)
    }
}
