//! Room layout — desks, seat counts, and their geometry on the room grid.
//!
//! DESIGN
//! ======
//! The layout is read once at startup, either from a YAML file or from the
//! built-in default classroom, validated, and then shared read-only behind an
//! `Arc`. Desks reference a desk type (seat count + shape) so that several
//! desks can share one definition.
//!
//! Grid coordinates are whole cells on a `room_size` x `room_size` grid. They
//! are normalized to percentages of the room so renderers can place desks
//! without knowing the grid.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Stable desk identifier, as used on the wire.
pub type DeskId = u32;

/// Seat index within its desk, starting at 0.
pub type SeatId = u32;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("failed to read layout file {path}: {source}")]
    Io { path: String, source: std::io::Error },
    #[error("failed to parse layout: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("layout has no desks")]
    NoDesks,
    #[error("room_size must be at least 1")]
    EmptyRoom,
    #[error("desk {desk_id} references unknown desk type {desk_type}")]
    UnknownDeskType { desk_id: DeskId, desk_type: u32 },
    #[error("desk type {0} has no seats")]
    NoSeats(u32),
    #[error("desk {desk_id} at ({x}, {y}) lies outside a room of size {room_size}")]
    OutOfBounds { desk_id: DeskId, x: u32, y: u32, room_size: u32 },
}

// =============================================================================
// FILE FORMAT
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeskShape {
    Square,
    Round,
    Rectangle,
}

/// Reusable desk definition.
#[derive(Debug, Clone, Deserialize)]
pub struct DeskType {
    pub seats: u32,
    pub shape: DeskShape,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct GridCell {
    pub x: u32,
    pub y: u32,
}

/// One desk as written in the layout file.
#[derive(Debug, Clone, Deserialize)]
pub struct DeskEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub coach: String,
    pub position: GridCell,
    #[serde(default)]
    pub rotation: f64,
    pub desk_type: u32,
}

/// Display labels for the statuses a student can pick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusLabels {
    pub working: String,
    pub needs_help: String,
    pub done: String,
}

impl Default for StatusLabels {
    fn default() -> Self {
        Self { working: "Pracuju".into(), needs_help: "Chci poradit".into(), done: "Hotovo".into() }
    }
}

/// Raw layout document before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct LayoutDocument {
    pub room_size: u32,
    pub desk_types: BTreeMap<u32, DeskType>,
    pub desks: BTreeMap<DeskId, DeskEntry>,
    #[serde(default)]
    pub labels: StatusLabels,
}

// =============================================================================
// RESOLVED LAYOUT
// =============================================================================

/// Position or size as a percentage of the room.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Extent {
    pub x: f64,
    pub y: f64,
}

/// A validated desk with its desk type resolved and geometry normalized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeskLayout {
    pub id: DeskId,
    pub name: String,
    pub coach: String,
    pub seats: u32,
    pub shape: DeskShape,
    pub rotation: f64,
    pub position: Extent,
    pub dimensions: Extent,
}

/// Immutable room description shared by the whole process.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub room_size: u32,
    pub labels: StatusLabels,
    desks: BTreeMap<DeskId, DeskLayout>,
}

impl Layout {
    /// Load and validate a YAML layout file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can't be read, isn't valid YAML, or fails
    /// validation.
    pub fn from_file(path: &Path) -> Result<Self, LayoutError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|source| LayoutError::Io { path: path.display().to_string(), source })?;
        Self::from_yaml(&raw)
    }

    /// Parse and validate a YAML layout document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document isn't valid YAML or fails validation.
    pub fn from_yaml(raw: &str) -> Result<Self, LayoutError> {
        let doc: LayoutDocument = serde_yaml::from_str(raw)?;
        Self::from_document(doc)
    }

    /// Validate a layout document and resolve desk types and geometry.
    ///
    /// # Errors
    ///
    /// Returns the first validation problem found.
    pub fn from_document(doc: LayoutDocument) -> Result<Self, LayoutError> {
        if doc.room_size == 0 {
            return Err(LayoutError::EmptyRoom);
        }
        if doc.desks.is_empty() {
            return Err(LayoutError::NoDesks);
        }
        if let Some((id, _)) = doc.desk_types.iter().find(|(_, t)| t.seats == 0) {
            return Err(LayoutError::NoSeats(*id));
        }

        let room = f64::from(doc.room_size);
        let cell = 100.0 / room;
        let mut desks = BTreeMap::new();

        for (id, desk) in doc.desks {
            let Some(desk_type) = doc.desk_types.get(&desk.desk_type) else {
                return Err(LayoutError::UnknownDeskType { desk_id: id, desk_type: desk.desk_type });
            };
            let GridCell { x, y } = desk.position;
            if x >= doc.room_size || y >= doc.room_size {
                return Err(LayoutError::OutOfBounds { desk_id: id, x, y, room_size: doc.room_size });
            }

            desks.insert(
                id,
                DeskLayout {
                    id,
                    name: desk.name,
                    coach: desk.coach,
                    seats: desk_type.seats,
                    shape: desk_type.shape,
                    rotation: desk.rotation,
                    position: Extent { x: f64::from(x) * 100.0 / room, y: f64::from(y) * 100.0 / room },
                    dimensions: Extent { x: cell, y: cell },
                },
            );
        }

        Ok(Self { room_size: doc.room_size, labels: doc.labels, desks })
    }

    /// The classroom used when no layout file is configured: one four-seat
    /// desk and two pair desks on a 2x2 grid.
    #[must_use]
    pub fn default_classroom() -> Self {
        let desk_types = BTreeMap::from([
            (0, DeskType { seats: 4, shape: DeskShape::Square }),
            (1, DeskType { seats: 2, shape: DeskShape::Square }),
        ]);
        let desk = |coach: &str, x, y, desk_type| DeskEntry {
            name: String::new(),
            coach: coach.to_string(),
            position: GridCell { x, y },
            rotation: 0.0,
            desk_type,
        };
        let desks = BTreeMap::from([(0, desk("Kamila", 0, 0, 0)), (1, desk("Karel", 1, 1, 1)), (2, desk("Klára", 0, 1, 1))]);
        let doc = LayoutDocument { room_size: 2, desk_types, desks, labels: StatusLabels::default() };

        // The built-in document is valid by construction.
        match Self::from_document(doc) {
            Ok(layout) => layout,
            Err(e) => unreachable!("default classroom layout is invalid: {e}"),
        }
    }

    #[must_use]
    pub fn desk(&self, desk_id: DeskId) -> Option<&DeskLayout> {
        self.desks.get(&desk_id)
    }

    /// Desks in ascending id order.
    pub fn desks(&self) -> impl Iterator<Item = &DeskLayout> {
        self.desks.values()
    }

    #[must_use]
    pub fn seat_count(&self) -> usize {
        self.desks.values().map(|d| d.seats as usize).sum()
    }
}

#[cfg(test)]
#[path = "layout_test.rs"]
mod tests;
