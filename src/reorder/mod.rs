//! Manual list-reorder engine.
//!
//! A pointer-driven drag of one row in a vertical list, without any native
//! drag API. The gesture works against geometry frozen at pointer-down
//! ([`geometry::GeometrySnapshot`]), resolves its target index from raw
//! pointer Y with hysteresis ([`hit_test`]), and keeps two render paths
//! apart:
//!
//! - *hot*: the dragged row is painted on its own layer and translated
//!   post-layout with [`egui::Context::transform_layer_shapes`], so it
//!   tracks the pointer at full input rate without re-laying-out anything;
//! - *cold*: every other row is laid out with an offset from the pure
//!   [`shift::shift`] model, and that state only churns when the resolved
//!   target index actually changes.
//!
//! egui coalesces raw pointer events and repaints once per display refresh,
//! so one `update` call here means at most one hit-test and one transform
//! write per frame regardless of event frequency.

use egui::emath::TSTransform;
use egui::{Context, LayerId, Order, Rect, vec2};

mod geometry;
mod session;
mod shift;

#[cfg(test)]
mod engine_tests;

pub use geometry::{DEFAULT_ROW_HEIGHT, GeometrySnapshot, RowRect};
pub use hit_test::{HYSTERESIS_MARGIN, resolve_target};
pub use session::ReorderCommit;
pub use shift::shift;

use crate::model::TodoId;
use session::DragSession;

/// Drives one drag gesture end-to-end: Idle → Dragging → (Committing) → Idle.
///
/// The list view feeds it row geometry every frame (`begin_frame` /
/// `observe_row`), starts a gesture from a drag handle (`request_drag`), and
/// the app calls [`ListDrag::update`] once per frame after the list has been
/// painted. `update` returns a [`ReorderCommit`] when a gesture ended with a
/// real reorder; the store is the only authority after that point.
#[derive(Debug)]
pub struct ListDrag {
    list_id: egui::Id,
    /// Rows observed last frame: complete and untransformed (the view
    /// reports allocated rects, before any shift offset is applied).
    prev_rows: Vec<(TodoId, Rect)>,
    /// Rows observed so far this frame.
    current_rows: Vec<(TodoId, Rect)>,
    active: Option<DragSession>,
}

impl ListDrag {
    pub fn new(id_salt: impl std::hash::Hash) -> Self {
        Self {
            list_id: egui::Id::new(id_salt),
            prev_rows: Vec::new(),
            current_rows: Vec::new(),
            active: None,
        }
    }

    /// Layer the dragged row is painted on. Translated directly in
    /// [`Self::update`], bypassing layout.
    pub fn drag_layer(&self) -> LayerId {
        LayerId::new(Order::Tooltip, self.list_id.with("dragged_row"))
    }

    /// Rotate the per-frame geometry buffers. Call before rendering rows.
    pub fn begin_frame(&mut self) {
        std::mem::swap(&mut self.prev_rows, &mut self.current_rows);
        self.current_rows.clear();
    }

    /// Report one row's allocated rect, in render order.
    pub fn observe_row(&mut self, id: TodoId, rect: Rect) {
        self.current_rows.push((id, rect));
    }

    /// Start a gesture from the drag handle of the row at `render_index`.
    ///
    /// Captures the geometry snapshot from the last complete frame, which is
    /// strictly pre-transform (no shift offsets exist while idle). A second
    /// pointer-down while a session is active is deliberately a no-op.
    pub fn request_drag(&mut self, render_index: usize, pointer_y: f32) {
        if self.active.is_some() {
            log::debug!("ignoring drag start at index {render_index}: session already active");
            return;
        }

        let rects: Vec<Rect> = self.prev_rows.iter().map(|(_, r)| *r).collect();
        let row_ids: Vec<TodoId> = self.prev_rows.iter().map(|(id, _)| *id).collect();
        let snapshot = GeometrySnapshot::capture(&rects);
        let row_height = snapshot.row_height_or_default(render_index);

        log::debug!(
            "drag start: index {render_index}, {} rows, row_height {row_height}",
            snapshot.len()
        );
        self.active = Some(DragSession {
            source: render_index,
            current_target: render_index,
            origin_y: pointer_y,
            row_height,
            snapshot,
            row_ids,
        });
    }

    pub fn is_dragging(&self) -> bool {
        self.active.is_some()
    }

    /// Render index of the dragged row, while a session is active.
    pub fn dragged_index(&self) -> Option<usize> {
        self.active.as_ref().map(|s| s.source)
    }

    /// Shift offset for a non-dragged row under the current proposal.
    pub fn row_offset(&self, render_index: usize) -> f32 {
        match &self.active {
            Some(s) => shift(render_index, s.source, s.current_target, s.row_height),
            None => 0.0,
        }
    }

    /// Per-frame drive. Writes the dragged layer's transform, resolves the
    /// target, and ends the session on release — or forces the same
    /// transition if the gesture was abandoned (no release event but no
    /// button held either, e.g. after focus loss). Must be called after the
    /// rows have been painted this frame.
    pub fn update(&mut self, ctx: &Context) -> Option<ReorderCommit> {
        let origin_y = self.active.as_ref()?.origin_y;

        let (pointer_y, released, any_down) = ctx.input(|i| {
            (
                i.pointer.latest_pos().map(|p| p.y),
                i.pointer.any_released(),
                i.pointer.any_down(),
            )
        });

        if let Some(y) = pointer_y {
            // Hot path: only the layer transform observes the raw pointer;
            // no session state is touched here.
            ctx.transform_layer_shapes(
                self.drag_layer(),
                TSTransform::from_translation(vec2(0.0, y - origin_y)),
            );
        }

        // Keep frames coming while a session is live, even without input
        // events, so an abandoned gesture is noticed promptly.
        ctx.request_repaint();

        self.step(pointer_y, released, any_down)
    }

    /// The cold half of the per-frame drive: one hit-test, target update,
    /// and the Dragging → Committing → Idle transitions. Split from
    /// [`Self::update`] so the state machine is testable without a
    /// [`Context`].
    fn step(
        &mut self,
        pointer_y: Option<f32>,
        released: bool,
        any_down: bool,
    ) -> Option<ReorderCommit> {
        let session = self.active.as_mut()?;

        if let Some(y) = pointer_y {
            let target = resolve_target(y, &session.snapshot, session.source, session.current_target);
            if target != session.current_target {
                log::debug!(
                    "drag target {} -> {} (source {})",
                    session.current_target,
                    target,
                    session.source
                );
                session.current_target = target;
            }
        }

        if released {
            return self.finish("release");
        }
        if !any_down {
            // No release event will ever come for this gesture; commit at
            // the last known target so the session cannot leak.
            log::warn!("drag abandoned without release; committing at last target");
            return self.finish("abandon");
        }
        None
    }

    /// Committing → Idle, unconditionally. Session state and the dragged
    /// visual go away in the same call, so no intermediate frame can render
    /// a half-cleared gesture.
    fn finish(&mut self, kind: &'static str) -> Option<ReorderCommit> {
        let session = self.active.take()?;
        let commit = session.commit();
        log::debug!(
            "drag end ({kind}): source {} target {} commit {commit:?}",
            session.source,
            session.current_target
        );
        commit
    }
}
