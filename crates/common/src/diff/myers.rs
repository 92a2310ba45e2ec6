// Myers shortest-edit script over arbitrary sequences.

/// One step of an edit script, indexing into the old or new sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edit {
    Equal { old: usize, new: usize },
    Delete { old: usize },
    Insert { new: usize },
}

/// Edit cost past which [`edit_script`] gives up. The trace grows with the
/// square of the cost.
pub const MAX_EDIT_COST: usize = 1024;

/// Compute a shortest edit script turning `old` into `new`, or `None` when
/// it needs more than [`MAX_EDIT_COST`] inserts and deletes.
pub fn edit_script<T: PartialEq>(old: &[T], new: &[T]) -> Option<Vec<Edit>> {
    edit_script_within(old, new, MAX_EDIT_COST)
}

/// [`edit_script`] with an explicit cost bound.
pub fn edit_script_within<T: PartialEq>(old: &[T], new: &[T], max_cost: usize) -> Option<Vec<Edit>> {
    let old_len = old.len();
    let new_len = new.len();

    if old_len == 0 || new_len == 0 {
        if old_len + new_len > max_cost {
            return None;
        }
        let deletes = (0..old_len).map(|old| Edit::Delete { old });
        return Some(deletes.chain((0..new_len).map(|new| Edit::Insert { new })).collect());
    }

    let max = old_len + new_len;
    let offset = max as isize;
    let mut v = vec![0isize; 2 * max + 1];
    // Round `d` only touches diagonals -d..=d, so each snapshot keeps that window.
    let mut trace: Vec<Vec<isize>> = Vec::new();

    for d in 0..=max.min(max_cost) {
        let d_isize = d as isize;
        trace.push(v[(offset - d_isize) as usize..=(offset + d_isize) as usize].to_vec());

        let mut k = -d_isize;
        while k <= d_isize {
            let mut x = if k == -d_isize
                || (k != d_isize && v[(k - 1 + offset) as usize] < v[(k + 1 + offset) as usize])
            {
                v[(k + 1 + offset) as usize]
            } else {
                v[(k - 1 + offset) as usize] + 1
            };
            let mut y = x - k;

            while x < old_len as isize && y < new_len as isize && old[x as usize] == new[y as usize] {
                x += 1;
                y += 1;
            }

            v[(k + offset) as usize] = x;

            if x >= old_len as isize && y >= new_len as isize {
                return Some(backtrack(old_len, new_len, &trace, d));
            }

            k += 2;
        }
    }

    None
}

fn backtrack(old_len: usize, new_len: usize, trace: &[Vec<isize>], solved_d: usize) -> Vec<Edit> {
    let mut edits = Vec::new();
    let mut x = old_len as isize;
    let mut y = new_len as isize;

    for d in (0..=solved_d).rev() {
        let d_isize = d as isize;
        let window = &trace[d];
        let at = |k: isize| window[(k + d_isize) as usize];
        let k = x - y;

        let prev_k = if d == 0 {
            0
        } else if k == -d_isize || (k != d_isize && at(k - 1) < at(k + 1)) {
            k + 1
        } else {
            k - 1
        };
        let prev_x = if d == 0 { 0 } else { at(prev_k) };
        let prev_y = prev_x - prev_k;

        while x > prev_x && y > prev_y {
            edits.push(Edit::Equal { old: (x - 1) as usize, new: (y - 1) as usize });
            x -= 1;
            y -= 1;
        }

        if d == 0 {
            break;
        }

        if x == prev_x {
            edits.push(Edit::Insert { new: (y - 1) as usize });
            y -= 1;
        } else {
            edits.push(Edit::Delete { old: (x - 1) as usize });
            x -= 1;
        }
    }

    edits.reverse();
    edits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replay<T: PartialEq + Clone>(old: &[T], new: &[T], edits: &[Edit]) -> Vec<T> {
        let mut out = Vec::new();
        for edit in edits {
            match *edit {
                Edit::Equal { old: i, new: j } => {
                    assert!(old[i] == new[j]);
                    out.push(old[i].clone());
                }
                Edit::Insert { new: j } => out.push(new[j].clone()),
                Edit::Delete { .. } => {}
            }
        }
        out
    }

    fn cost(edits: &[Edit]) -> usize {
        edits.iter().filter(|edit| !matches!(edit, Edit::Equal { .. })).count()
    }

    #[test]
    fn identical_sequences_are_all_equal() {
        let edits = edit_script(&[1, 2, 3], &[1, 2, 3]).unwrap();
        assert_eq!(cost(&edits), 0);
        assert_eq!(edits.len(), 3);
    }

    #[test]
    fn empty_sides() {
        assert_eq!(edit_script::<u8>(&[], &[1, 2]), Some(vec![Edit::Insert { new: 0 }, Edit::Insert { new: 1 }]));
        assert_eq!(edit_script::<u8>(&[1], &[]), Some(vec![Edit::Delete { old: 0 }]));
        assert_eq!(edit_script::<u8>(&[], &[]), Some(Vec::new()));
    }

    #[test]
    fn single_insert_in_the_middle() {
        let old = ["a", "b", "c"];
        let new = ["a", "b", "x", "c"];
        let edits = edit_script(&old, &new).unwrap();
        assert_eq!(cost(&edits), 1);
        assert_eq!(replay(&old, &new, &edits), new);
    }

    #[test]
    fn script_is_minimal_and_replays() {
        let old: Vec<char> = "ABCABBA".chars().collect();
        let new: Vec<char> = "CBABAC".chars().collect();
        let edits = edit_script(&old, &new).unwrap();
        assert_eq!(cost(&edits), 5);
        assert_eq!(replay(&old, &new, &edits), new);
    }

    #[test]
    fn cost_over_the_bound_gives_up() {
        assert_eq!(edit_script_within(&[1, 2, 3], &[4, 5, 6], 5), None);
        assert_eq!(edit_script_within(&[1, 2, 3], &[4, 5, 6], 6).map(|edits| cost(&edits)), Some(6));
        assert_eq!(edit_script_within::<u8>(&[], &[1, 2, 3], 2), None);
    }

    #[test]
    fn long_rewrite_exceeds_the_default_bound() {
        let old: Vec<u32> = (0..2_000).collect();
        let new: Vec<u32> = (2_000..4_000).collect();
        assert_eq!(edit_script(&old, &new), None);

        let mut near = old.clone();
        near[1_000] = 9_999;
        assert_eq!(edit_script(&old, &near).map(|edits| cost(&edits)), Some(2));
    }
}
