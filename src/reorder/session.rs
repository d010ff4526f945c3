//! Per-gesture drag state.
//!
//! A session is created on pointer-down on a drag handle and destroyed on
//! release (or forced release when the gesture is abandoned). Everything in
//! here is frozen at gesture start except `current_target`, which only
//! changes when the hit-test resolves a different row.

use crate::model::TodoId;

use super::geometry::GeometrySnapshot;

#[derive(Clone, Debug)]
pub(super) struct DragSession {
    /// Render position of the dragged row at gesture start.
    pub source: usize,
    /// Render position the drag currently proposes to move the row to.
    pub current_target: usize,
    /// Pointer Y at gesture start; the dragged row's visual offset is the
    /// live pointer Y minus this.
    pub origin_y: f32,
    /// Height of the source row (snapshot height, with fallback).
    pub row_height: f32,
    /// Row geometry frozen at gesture start, in render order.
    pub snapshot: GeometrySnapshot,
    /// Ids of the rendered rows at gesture start, in render order. Render
    /// positions are translated through these at commit time; they are never
    /// handed to persistence directly.
    pub row_ids: Vec<TodoId>,
}

/// A reorder proposal handed to the store on release, already translated
/// from render positions to stable ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReorderCommit {
    /// The dragged row.
    pub moved: TodoId,
    /// The row currently occupying the target render slot.
    pub displaced: TodoId,
}

impl DragSession {
    /// Translate the final (source, target) render positions into a commit.
    /// `None` when the gesture was a no-op or the session's id list is out
    /// of step with the snapshot.
    pub fn commit(&self) -> Option<ReorderCommit> {
        if self.current_target == self.source {
            return None;
        }
        let moved = *self.row_ids.get(self.source)?;
        let displaced = *self.row_ids.get(self.current_target)?;
        (moved != displaced).then_some(ReorderCommit { moved, displaced })
    }
}
