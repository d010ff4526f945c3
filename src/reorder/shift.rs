//! Visual shift model: how far each non-dragged row slides while a drag is
//! in progress.
//!
//! A pure function of three indices and the row height, with no hidden
//! state. Both the renderer (to position the non-dragged rows) and the
//! hit-test resolver (to predict where row boundaries *visually* sit) must
//! use this same function, otherwise hit-testing diverges from what is on
//! screen.

/// Vertical offset in points for the row at `index` while the row at
/// `source` is being dragged towards `target`.
///
/// The dragged row itself always gets 0: it is moved by a direct layer
/// transform, not by this model.
pub fn shift(index: usize, source: usize, target: usize, row_height: f32) -> f32 {
    if index == source || source == target {
        return 0.0;
    }
    if source < target {
        // Dragging down: rows between slide up to fill the gap.
        if index > source && index <= target {
            return -row_height;
        }
    } else if index >= target && index < source {
        // Dragging up: rows between slide down.
        return row_height;
    }
    0.0
}

#[cfg(test)]
mod tests {
    use super::shift;

    const H: f32 = 50.0;

    #[test]
    fn dragged_row_never_shifts() {
        for target in 0..6 {
            assert_eq!(shift(3, 3, target, H), 0.0);
        }
    }

    #[test]
    fn no_target_change_means_no_shift() {
        for index in 0..6 {
            assert_eq!(shift(index, 2, 2, H), 0.0);
        }
    }

    #[test]
    fn dragging_down_slides_rows_up() {
        // source=1, target=4: rows 2..=4 slide up, others stay.
        let expected = [0.0, 0.0, -H, -H, -H, 0.0];
        for (index, want) in expected.iter().enumerate() {
            assert_eq!(shift(index, 1, 4, H), *want, "index {index}");
        }
    }

    #[test]
    fn dragging_up_slides_rows_down() {
        // source=4, target=1: rows 1..=3 slide down, others stay.
        let expected = [0.0, H, H, H, 0.0, 0.0];
        for (index, want) in expected.iter().enumerate() {
            assert_eq!(shift(index, 4, 1, H), *want, "index {index}");
        }
    }

    /// The shifts across all rows must net out to exactly the displacement
    /// that removing the source row and reinserting it at the target causes:
    /// `|target - source|` row heights, in the opposite direction of travel.
    #[test]
    fn shift_sum_matches_single_slot_displacement() {
        let len = 8;
        for source in 0..len {
            for target in 0..len {
                let sum: f32 = (0..len).map(|i| shift(i, source, target, H)).sum();
                let slots = target as f32 - source as f32;
                assert_eq!(sum, -slots * H, "source {source} target {target}");
            }
        }
    }
}
