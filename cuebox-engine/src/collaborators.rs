//! Collaborators the engine consumes
//!
//! - `CueStore`: read-only cue lookup (refreshed on every fresh play)
//! - `StatusSink`: fire-and-forget status/event publication
//! - `UiSurface`: optional, best-effort button and playlist highlight updates
//!
//! The engine holds these as trait objects so the binary, tests and any
//! embedding application can supply their own.

use cuebox_common::config::load_toml;
use cuebox_common::events::{CueEvent, EventBus};
use cuebox_common::{Cue, CueId};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::RwLock;
use tracing::{info, warn};

use crate::error::{Error, Result};

/// Cue definition lookup
pub trait CueStore: Send + Sync {
    fn get_cue_by_id(&self, cue_id: &CueId) -> Option<Cue>;
}

/// Destination for engine events
pub trait StatusSink: Send + Sync {
    fn send(&self, event: CueEvent);
}

impl StatusSink for EventBus {
    fn send(&self, event: CueEvent) {
        // No subscribers is normal (nothing attached yet)
        self.emit_lossy(event);
    }
}

/// Control surface hooks
///
/// Every method has a no-op default; implementors override what they render.
pub trait UiSurface: Send + Sync {
    /// Reflect a cue's state on its button
    ///
    /// `is_cued` is set while a playlist is parked on an item with no handle;
    /// `is_error` marks a cue whose last start or item failed.
    fn update_button_playing_state(
        &self,
        _cue_id: &CueId,
        _is_playing: bool,
        _label: Option<&str>,
        _is_cued: bool,
        _is_error: bool,
    ) {
    }

    /// Highlight the item a playlist is playing or cued on (`None` clears it)
    fn highlight_playing_playlist_item(&self, _cue_id: &CueId, _item_id: Option<&str>) {}
}

/// UI surface that renders nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoUi;

impl UiSurface for NoUi {}

/// Cue store backed by a map
#[derive(Debug, Default)]
pub struct InMemoryCueStore {
    cues: RwLock<HashMap<CueId, Cue>>,
}

/// Show file layout: a `[[cues]]` array
#[derive(Debug, Default, Deserialize)]
pub struct ShowFile {
    #[serde(default)]
    pub cues: Vec<Cue>,
}

impl InMemoryCueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_cues(cues: impl IntoIterator<Item = Cue>) -> Self {
        let store = Self::new();
        for cue in cues {
            store.upsert(cue);
        }
        store
    }

    /// Load a TOML show file
    pub fn load_show_file(path: &Path) -> Result<Self> {
        let show: ShowFile = load_toml(path)?;
        let mut seen = HashSet::new();
        for cue in &show.cues {
            if cue.id.is_blank() {
                return Err(Error::Config(format!(
                    "{}: cue with an empty id",
                    path.display()
                )));
            }
            if !seen.insert(&cue.id) {
                warn!("Duplicate cue id '{}' in {}; last definition wins", cue.id, path.display());
            }
        }
        info!("Loaded {} cues from {}", show.cues.len(), path.display());
        Ok(Self::from_cues(show.cues))
    }

    /// Insert or replace a cue definition
    pub fn upsert(&self, cue: Cue) {
        let mut cues = self.cues.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        cues.insert(cue.id.clone(), cue);
    }

    pub fn remove(&self, cue_id: &CueId) -> Option<Cue> {
        let mut cues = self.cues.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        cues.remove(cue_id)
    }

    /// Cue ids in sorted order
    pub fn cue_ids(&self) -> Vec<CueId> {
        let cues = self.cues.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut ids: Vec<CueId> = cues.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.cues.read().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CueStore for InMemoryCueStore {
    fn get_cue_by_id(&self, cue_id: &CueId) -> Option<Cue> {
        let cues = self.cues.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        cues.get(cue_id).cloned()
    }
}
