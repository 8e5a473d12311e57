//! Position arithmetic for drag-and-drop reordering.

/// Where `source` lands when dropped next to `target` in an asset grid.
///
/// Indices refer to the sequence before the move. The result indexes the
/// sequence after `source` has been removed, which is why moving rightward
/// past the target shifts the insertion point left by one. Returns `None`
/// when the move would leave the order unchanged.
pub fn asset_insertion_index(source_index: usize, target_index: usize, insert_before: bool) -> Option<usize> {
    if source_index == target_index {
        return None;
    }

    let mut new_index = if insert_before { target_index } else { target_index + 1 };
    if source_index < target_index {
        new_index -= 1;
    }

    if new_index == source_index {
        None
    } else {
        Some(new_index)
    }
}

/// Where `source` lands when a folder tile is dropped on `target`: it takes
/// the target's slot.
pub fn folder_insertion_index(source_index: usize, target_index: usize) -> Option<usize> {
    if source_index == target_index {
        None
    } else {
        Some(target_index)
    }
}

/// Remove the element at `from` and reinsert it at `to` (clamped to the end).
pub fn move_element<T>(items: &mut Vec<T>, from: usize, to: usize) {
    if from >= items.len() {
        return;
    }
    let item = items.remove(from);
    let to = to.min(items.len());
    items.insert(to, item);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reorder(items: &[&str], source: usize, target: usize, before: bool) -> Vec<String> {
        let mut items: Vec<String> = items.iter().map(|s| s.to_string()).collect();
        if let Some(to) = asset_insertion_index(source, target, before) {
            move_element(&mut items, source, to);
        }
        items
    }

    #[test]
    fn test_move_left_before_target() {
        assert_eq!(reorder(&["p1", "p2", "p3"], 2, 0, true), vec!["p3", "p1", "p2"]);
    }

    #[test]
    fn test_move_right_after_target() {
        assert_eq!(reorder(&["p1", "p2", "p3"], 0, 2, false), vec!["p2", "p3", "p1"]);
    }

    #[test]
    fn test_move_right_before_target() {
        assert_eq!(reorder(&["p1", "p2", "p3", "p4"], 0, 2, true), vec!["p2", "p1", "p3", "p4"]);
    }

    #[test]
    fn test_move_left_after_target() {
        assert_eq!(reorder(&["p1", "p2", "p3", "p4"], 3, 1, false), vec!["p1", "p2", "p4", "p3"]);
    }

    #[test]
    fn test_noop_moves() {
        assert_eq!(asset_insertion_index(1, 1, true), None);
        // Already immediately before / after the target
        assert_eq!(asset_insertion_index(0, 1, true), None);
        assert_eq!(asset_insertion_index(2, 1, false), None);
    }

    #[test]
    fn test_folder_takes_target_slot() {
        let mut folders = vec!["a", "b", "c", "d"];
        let to = folder_insertion_index(0, 2).unwrap();
        move_element(&mut folders, 0, to);
        assert_eq!(folders, vec!["b", "c", "a", "d"]);

        let mut folders = vec!["a", "b", "c", "d"];
        let to = folder_insertion_index(3, 1).unwrap();
        move_element(&mut folders, 3, to);
        assert_eq!(folders, vec!["a", "d", "b", "c"]);

        assert_eq!(folder_insertion_index(2, 2), None);
    }

    #[test]
    fn test_move_element_clamps() {
        let mut items = vec![1, 2, 3];
        move_element(&mut items, 0, 10);
        assert_eq!(items, vec![2, 3, 1]);
        move_element(&mut items, 7, 0);
        assert_eq!(items, vec![2, 3, 1]);
    }
}
