use egui::{Rect, pos2, vec2};

use super::{DEFAULT_ROW_HEIGHT, ListDrag, ReorderCommit};
use crate::model::TodoId;

/// Feed `rows` uniform 50 px rows and rotate them into the "last complete
/// frame" buffer, as the list view would over two frames.
fn drag_with_rows(rows: usize) -> ListDrag {
    let mut drag = ListDrag::new("test_list");
    drag.begin_frame();
    for i in 0..rows {
        let rect = Rect::from_min_size(pos2(0.0, i as f32 * 50.0), vec2(200.0, 50.0));
        drag.observe_row(TodoId(i as i64 + 1), rect);
    }
    drag.begin_frame();
    drag
}

#[test]
fn downward_drag_commits_moved_and_displaced_ids() {
    let mut drag = drag_with_rows(3);
    drag.request_drag(0, 10.0);
    assert!(drag.is_dragging());
    assert_eq!(drag.dragged_index(), Some(0));

    // Row 1's center (75) cleared, row 2's (125) not yet.
    assert_eq!(drag.step(Some(120.0), false, true), None);
    assert_eq!(drag.row_offset(1), -50.0);
    assert_eq!(drag.row_offset(2), 0.0);

    // 130 clears row 2's center + margin.
    assert_eq!(drag.step(Some(130.0), false, true), None);
    assert_eq!(drag.row_offset(2), -50.0);

    let commit = drag.step(Some(130.0), true, true);
    assert_eq!(
        commit,
        Some(ReorderCommit {
            moved: TodoId(1),
            displaced: TodoId(3),
        })
    );
    assert!(!drag.is_dragging());
    assert_eq!(drag.row_offset(1), 0.0);
}

#[test]
fn upward_drag_shifts_rows_down() {
    let mut drag = drag_with_rows(4);
    drag.request_drag(3, 180.0);

    assert_eq!(drag.step(Some(20.0), false, true), None);
    for index in 0..3 {
        assert_eq!(drag.row_offset(index), 50.0, "index {index}");
    }

    let commit = drag.step(Some(20.0), true, true);
    assert_eq!(
        commit,
        Some(ReorderCommit {
            moved: TodoId(4),
            displaced: TodoId(1),
        })
    );
}

#[test]
fn no_op_drag_commits_nothing() {
    let mut drag = drag_with_rows(3);
    drag.request_drag(1, 75.0);
    assert_eq!(drag.step(Some(76.0), false, true), None);
    assert_eq!(drag.step(Some(76.0), true, true), None);
    assert!(!drag.is_dragging());
}

#[test]
fn second_drag_start_is_ignored_while_active() {
    let mut drag = drag_with_rows(3);
    drag.request_drag(0, 10.0);
    drag.request_drag(2, 120.0);
    assert_eq!(drag.dragged_index(), Some(0));
}

#[test]
fn abandoned_gesture_commits_at_last_target_and_clears() {
    let mut drag = drag_with_rows(3);
    drag.request_drag(0, 10.0);
    assert_eq!(drag.step(Some(130.0), false, true), None);
    assert_eq!(drag.step(Some(135.0), false, true), None);

    // No release event and no button held: focus was lost mid-drag.
    let commit = drag.step(None, false, false);
    assert_eq!(
        commit,
        Some(ReorderCommit {
            moved: TodoId(1),
            displaced: TodoId(3),
        })
    );
    assert!(!drag.is_dragging());
}

#[test]
fn missing_geometry_never_fails_the_gesture() {
    // No rows were ever observed; the session still runs and ends cleanly.
    let mut drag = ListDrag::new("empty_list");
    drag.begin_frame();
    drag.begin_frame();
    drag.request_drag(0, 10.0);
    assert!(drag.is_dragging());
    assert_eq!(drag.row_offset(5), 0.0);
    assert_eq!(drag.step(Some(500.0), true, true), None);
    assert!(!drag.is_dragging());
}

#[test]
fn fallback_row_height_is_used_for_short_snapshots() {
    let mut drag = drag_with_rows(2);
    drag.request_drag(5, 10.0);
    assert!(drag.is_dragging());
    // Target can never leave the (out-of-range) source, so every offset is 0
    // and the gesture ends as a no-op, but the fallback height keeps the
    // shift math finite.
    assert!(DEFAULT_ROW_HEIGHT > 0.0);
    assert_eq!(drag.row_offset(0), 0.0);
    assert_eq!(drag.step(Some(300.0), true, true), None);
}
