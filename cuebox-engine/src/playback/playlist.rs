//! Playlist order and index math
//!
//! A playlist session keeps an immutable snapshot of the cue's items plus an
//! optional shuffle permutation. The session's `current_index` is a *logical*
//! index into the active order: the shuffle permutation when one exists,
//! otherwise the original item order. Resolving a logical index maps it through
//! the permutation to the original item.
//!
//! Invariant: `current_index < active_len()` at all times. The only mutators
//! (`set_current_index`, `regenerate_shuffle`) preserve it.

use cuebox_common::PlaylistItem;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::PlaybackError;

/// Manual navigation direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavDirection {
    Next,
    Previous,
}

impl std::fmt::Display for NavDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NavDirection::Next => write!(f, "next"),
            NavDirection::Previous => write!(f, "previous"),
        }
    }
}

/// Playlist portion of a playing state
#[derive(Debug, Clone)]
pub struct PlaylistState {
    /// Items in authored order (never reordered)
    items: Vec<PlaylistItem>,
    /// Permutation of original indices; empty when shuffle is off
    shuffle_order: Vec<usize>,
    /// Logical index into the active order
    current_index: usize,
}

impl PlaylistState {
    /// Snapshot `items`, generating a shuffle order when requested and useful
    pub fn new(items: Vec<PlaylistItem>, shuffle: bool) -> Self {
        let mut state = Self {
            items,
            shuffle_order: Vec::new(),
            current_index: 0,
        };
        if shuffle && state.items.len() > 1 {
            state.regenerate_shuffle(None);
        }
        state
    }

    pub fn items(&self) -> &[PlaylistItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_shuffled(&self) -> bool {
        !self.shuffle_order.is_empty()
    }

    pub fn shuffle_order(&self) -> &[usize] {
        &self.shuffle_order
    }

    /// Length of the order `current_index` indexes into
    pub fn active_len(&self) -> usize {
        if self.is_shuffled() {
            self.shuffle_order.len()
        } else {
            self.items.len()
        }
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Move to `index`, refusing anything outside the active order
    pub fn set_current_index(&mut self, index: usize) -> Result<(), PlaybackError> {
        let len = self.active_len();
        if index >= len {
            return Err(PlaybackError::InvalidPlaylistIndex { index, len });
        }
        self.current_index = index;
        Ok(())
    }

    /// Map a logical index to an original item index
    pub fn original_index(&self, logical: usize) -> Option<usize> {
        if self.is_shuffled() {
            self.shuffle_order.get(logical).copied()
        } else if logical < self.items.len() {
            Some(logical)
        } else {
            None
        }
    }

    /// Item at a logical index
    pub fn resolve(&self, logical: usize) -> Option<&PlaylistItem> {
        self.original_index(logical).and_then(|i| self.items.get(i))
    }

    pub fn current_item(&self) -> Option<&PlaylistItem> {
        self.resolve(self.current_index)
    }

    /// Build a fresh permutation and rewind to logical index 0
    ///
    /// `avoid_first` (an original index, typically the item that just played)
    /// is kept out of the first slot when there is any alternative.
    pub fn regenerate_shuffle(&mut self, avoid_first: Option<usize>) {
        let mut order: Vec<usize> = (0..self.items.len()).collect();
        order.shuffle(&mut rand::thread_rng());
        if let Some(avoid) = avoid_first {
            if order.len() > 1 && order[0] == avoid {
                let last = order.len() - 1;
                order.swap(0, last);
            }
        }
        self.shuffle_order = order;
        self.current_index = 0;
    }

    /// Logical index one step from `from`
    ///
    /// Returns `None` when the step leaves the order and `wrap` is off.
    pub fn step(&self, from: usize, direction: NavDirection, wrap: bool) -> Option<usize> {
        step_index(from, self.active_len(), direction, wrap)
    }
}

/// Step within `0..len`, wrapping or refusing at either end
pub fn step_index(from: usize, len: usize, direction: NavDirection, wrap: bool) -> Option<usize> {
    if len == 0 {
        return None;
    }
    match direction {
        NavDirection::Next => {
            if from + 1 < len {
                Some(from + 1)
            } else if wrap {
                Some(0)
            } else {
                None
            }
        }
        NavDirection::Previous => {
            if from == 0 {
                if wrap {
                    Some(len - 1)
                } else {
                    None
                }
            } else {
                Some(from.min(len) - 1)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(n: usize) -> Vec<PlaylistItem> {
        (0..n)
            .map(|i| PlaylistItem::new(format!("item-{i}"), format!("Track {i}"), format!("/m/{i}.mp3")))
            .collect()
    }

    #[test]
    fn test_unshuffled_resolution() {
        let state = PlaylistState::new(items(3), false);
        assert!(!state.is_shuffled());
        assert_eq!(state.active_len(), 3);
        assert_eq!(state.resolve(2).unwrap().id, "item-2");
        assert!(state.resolve(3).is_none());
    }

    #[test]
    fn test_single_item_playlist_is_never_shuffled() {
        let state = PlaylistState::new(items(1), true);
        assert!(!state.is_shuffled());
        assert_eq!(state.resolve(0).unwrap().id, "item-0");
    }

    #[test]
    fn test_shuffle_order_is_a_permutation() {
        let state = PlaylistState::new(items(8), true);
        let mut order = state.shuffle_order().to_vec();
        order.sort_unstable();
        assert_eq!(order, (0..8).collect::<Vec<_>>());

        // Logical index maps through the permutation
        let first_original = state.shuffle_order()[0];
        assert_eq!(state.resolve(0).unwrap().id, format!("item-{first_original}"));
    }

    #[test]
    fn test_regenerated_shuffle_avoids_last_played() {
        let mut state = PlaylistState::new(items(2), true);
        for _ in 0..50 {
            state.regenerate_shuffle(Some(1));
            assert_eq!(state.shuffle_order()[0], 0);
            assert_eq!(state.current_index(), 0);
        }
    }

    #[test]
    fn test_set_current_index_rejects_out_of_range() {
        let mut state = PlaylistState::new(items(2), false);
        assert!(state.set_current_index(1).is_ok());
        assert_eq!(
            state.set_current_index(2),
            Err(PlaybackError::InvalidPlaylistIndex { index: 2, len: 2 })
        );
        assert_eq!(state.current_index(), 1);
    }

    #[test]
    fn test_step_without_wrap_refuses_at_edges() {
        assert_eq!(step_index(0, 3, NavDirection::Previous, false), None);
        assert_eq!(step_index(2, 3, NavDirection::Next, false), None);
        assert_eq!(step_index(1, 3, NavDirection::Next, false), Some(2));
        assert_eq!(step_index(1, 3, NavDirection::Previous, false), Some(0));
    }

    #[test]
    fn test_step_with_wrap() {
        assert_eq!(step_index(0, 3, NavDirection::Previous, true), Some(2));
        assert_eq!(step_index(2, 3, NavDirection::Next, true), Some(0));
        assert_eq!(step_index(0, 0, NavDirection::Next, true), None);
    }

    #[test]
    fn test_step_sequence_stays_in_bounds() {
        let len = 4;
        let mut index = 0;
        let moves = [
            NavDirection::Next,
            NavDirection::Next,
            NavDirection::Previous,
            NavDirection::Next,
            NavDirection::Next,
            NavDirection::Next,
            NavDirection::Next,
            NavDirection::Previous,
        ];
        for (i, dir) in moves.iter().enumerate() {
            let wrap = i % 2 == 0;
            if let Some(next) = step_index(index, len, *dir, wrap) {
                index = next;
            }
            assert!(index < len);
        }
    }
}
