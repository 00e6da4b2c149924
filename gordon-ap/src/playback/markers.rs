//! Marker table
//!
//! Numbered saved positions on the combined timeline. A fresh table marks
//! slot 0 at the start and the last slot at the end of the loaded audio;
//! setting a slot past the end grows the table.

use crate::error::{Error, Result};
use gordon_common::SampleRate;
use tracing::debug;

/// One saved position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marker {
    /// Position in frames
    pub position: usize,

    /// Same position in seconds
    pub seconds: f64,
}

/// Growable table of optional markers.
#[derive(Debug, Clone)]
pub struct MarkerTable {
    slots: Vec<Option<Marker>>,
    end_slot: usize,
    sample_rate: SampleRate,
}

impl MarkerTable {
    /// Table with `slots` entries (at least 2), start and end marked.
    pub fn for_length(slots: usize, sample_rate: SampleRate, length: usize) -> Self {
        let slots = slots.max(2);
        let mut table = Self {
            slots: vec![None; slots],
            end_slot: slots - 1,
            sample_rate,
        };
        table.slots[0] = Some(table.marker_at(0));
        table.slots[slots - 1] = Some(table.marker_at(length));
        table
    }

    fn marker_at(&self, position: usize) -> Marker {
        Marker {
            position,
            seconds: self.sample_rate.secs_of(position),
        }
    }

    /// Record `position` in slot `index`, growing the table if needed.
    pub fn set(&mut self, index: usize, position: usize) -> Marker {
        if index >= self.slots.len() {
            self.slots.resize(index + 1, None);
        }
        let marker = self.marker_at(position);
        self.slots[index] = Some(marker);
        debug!("Marker {} set at frame {}", index, position);
        marker
    }

    /// Look up slot `index`.
    ///
    /// # Errors
    /// `NotFound` if the slot is unset or beyond the table.
    pub fn get(&self, index: usize) -> Result<Marker> {
        self.slots
            .get(index)
            .copied()
            .flatten()
            .ok_or_else(|| Error::NotFound(format!("marker {}", index)))
    }

    /// Set markers in index order
    pub fn iter(&self) -> impl Iterator<Item = (usize, Marker)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.map(|m| (i, m)))
    }

    /// Number of slots, set or not
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Keep the end marker on the end of the timeline.
    ///
    /// Only moves it while it still points at `old_len`; a user-set end
    /// marker stays where it was put.
    pub fn follow_length(&mut self, old_len: usize, new_len: usize) {
        if let Some(Some(marker)) = self.slots.get(self.end_slot) {
            if marker.position == old_len && old_len != new_len {
                self.slots[self.end_slot] = Some(self.marker_at(new_len));
            }
        }
    }
}
