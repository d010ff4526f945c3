//! Frozen row geometry for one drag gesture.
//!
//! The snapshot is captured at pointer-down on a drag handle, strictly
//! before any shift offset is applied to any row, and is never re-queried
//! mid-drag. Hit-testing against live layout would pay a layout read per
//! pointer sample and would also see rects that already include in-progress
//! shifts, which is exactly what the snapshot avoids.

use egui::Rect;

/// Used when the source row's height is missing or degenerate (zero-height
/// or non-finite rect). Matches the list view's nominal row height.
pub const DEFAULT_ROW_HEIGHT: f32 = 44.0;

/// One row's vertical extent, in the list's coordinate space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RowRect {
    pub top: f32,
    pub height: f32,
}

impl RowRect {
    pub fn center(self) -> f32 {
        self.top + self.height / 2.0
    }
}

/// Ordered row rects, indexed by render position (not id).
#[derive(Clone, Debug, Default)]
pub struct GeometrySnapshot {
    rows: Vec<RowRect>,
}

impl GeometrySnapshot {
    pub fn capture(rects: &[Rect]) -> Self {
        Self {
            rows: rects
                .iter()
                .map(|r| RowRect {
                    top: r.top(),
                    height: r.height(),
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<RowRect> {
        self.rows.get(index).copied()
    }

    /// Height of the row at `index`, falling back to [`DEFAULT_ROW_HEIGHT`]
    /// when the snapshot is short or the captured height is unusable.
    /// Geometry problems never fail the gesture.
    pub fn row_height_or_default(&self, index: usize) -> f32 {
        match self.row(index) {
            Some(row) if row.height.is_finite() && row.height > 0.0 => row.height,
            _ => DEFAULT_ROW_HEIGHT,
        }
    }
}
