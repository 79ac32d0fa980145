/// List diffing
///
/// Computes the row changes between two snapshots of a list so only
/// changed rows need to be rebuilt. Rows are matched by key; matched
/// rows whose contents differ are reported as changed.
use similar::{capture_diff_slices, Algorithm, DiffOp};
use std::hash::Hash;

use crate::state::data::Crime;

/// Something with a stable identity across snapshots
pub trait Keyed {
    type Key: Eq + Hash + Ord;

    fn key(&self) -> Self::Key;
}

impl Keyed for Crime {
    type Key = uuid::Uuid;

    fn key(&self) -> Self::Key {
        self.id
    }
}

/// "Same contents": full equality
pub fn same_contents<T: PartialEq>(a: &T, b: &T) -> bool {
    a == b
}

/// One edit. Indices refer to the list as it is when the edit is
/// applied, edits being applied front to back.
#[derive(Debug, Clone, PartialEq)]
pub enum RowChange<T> {
    Insert { index: usize, item: T },
    Remove { index: usize },
    Change { index: usize, item: T },
}

/// Edit script turning `old` into `new`
pub fn diff<T: Keyed + PartialEq + Clone>(old: &[T], new: &[T]) -> Vec<RowChange<T>> {
    let old_keys: Vec<T::Key> = old.iter().map(Keyed::key).collect();
    let new_keys: Vec<T::Key> = new.iter().map(Keyed::key).collect();

    let mut changes = Vec::new();
    let mut cursor = 0;

    for op in capture_diff_slices(Algorithm::Myers, &old_keys, &new_keys) {
        match op {
            DiffOp::Equal { old_index, new_index, len } => {
                for offset in 0..len {
                    let (before, after) = (&old[old_index + offset], &new[new_index + offset]);
                    if !same_contents(before, after) {
                        changes.push(RowChange::Change {
                            index: cursor,
                            item: after.clone(),
                        });
                    }
                    cursor += 1;
                }
            }
            DiffOp::Delete { old_len, .. } => {
                for _ in 0..old_len {
                    changes.push(RowChange::Remove { index: cursor });
                }
            }
            DiffOp::Insert { new_index, new_len, .. } => {
                for item in &new[new_index..new_index + new_len] {
                    changes.push(RowChange::Insert {
                        index: cursor,
                        item: item.clone(),
                    });
                    cursor += 1;
                }
            }
            DiffOp::Replace { old_len, new_index, new_len, .. } => {
                for _ in 0..old_len {
                    changes.push(RowChange::Remove { index: cursor });
                }
                for item in &new[new_index..new_index + new_len] {
                    changes.push(RowChange::Insert {
                        index: cursor,
                        item: item.clone(),
                    });
                    cursor += 1;
                }
            }
        }
    }

    changes
}

/// Apply an edit script in place
pub fn apply<T>(items: &mut Vec<T>, changes: Vec<RowChange<T>>) {
    for change in changes {
        match change {
            RowChange::Insert { index, item } => items.insert(index, item),
            RowChange::Remove { index } => {
                items.remove(index);
            }
            RowChange::Change { index, item } => items[index] = item,
        }
    }
}

/// Keeps the last submitted snapshot and reports what changed since
#[derive(Debug)]
pub struct ListDiffer<T> {
    items: Vec<T>,
}

impl<T> Default for ListDiffer<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Keyed + PartialEq + Clone> ListDiffer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Replace the snapshot and return the edits that were applied
    pub fn submit(&mut self, new: Vec<T>) -> Vec<RowChange<T>> {
        let changes = diff(&self.items, &new);
        apply(&mut self.items, changes.clone());
        debug_assert!(self.items == new);
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crime(title: &str) -> Crime {
        let mut crime = Crime::new();
        crime.title = title.to_string();
        crime
    }

    #[test]
    fn test_noop_update_is_unchanged() {
        let a = crime("Theft");
        let after_update = a.clone();

        assert!(diff(&[a], &[after_update]).is_empty());
    }

    #[test]
    fn test_keys_order_like_ids() {
        let a = crime("A");
        let b = crime("B");

        assert_eq!(a.key().cmp(&b.key()), a.id.cmp(&b.id));
    }

    #[test]
    fn test_changed_contents_reported_in_place() {
        let a = crime("A");
        let b = crime("B");
        let mut solved = b.clone();
        solved.is_solved = true;

        let changes = diff(&[a.clone(), b], &[a, solved.clone()]);

        assert_eq!(changes, vec![RowChange::Change { index: 1, item: solved }]);
    }

    #[test]
    fn test_insert_and_remove() {
        let a = crime("A");
        let b = crime("B");
        let c = crime("C");

        let changes = diff(&[a.clone(), b.clone()], &[b.clone(), c.clone()]);

        assert_eq!(
            changes,
            vec![
                RowChange::Remove { index: 0 },
                RowChange::Insert { index: 1, item: c },
            ]
        );
    }

    #[test]
    fn test_equal_fields_different_ids_replace_row() {
        let a = crime("Twin");
        let mut twin = a.clone();
        twin.id = uuid::Uuid::new_v4();

        let changes = diff(&[a], &[twin.clone()]);

        assert_eq!(
            changes,
            vec![
                RowChange::Remove { index: 0 },
                RowChange::Insert { index: 0, item: twin },
            ]
        );
    }

    #[test]
    fn test_differ_reaches_new_snapshot() {
        let crimes: Vec<Crime> = (0..6).map(|i| crime(&format!("Crime {i}"))).collect();
        let mut differ = ListDiffer::new();

        differ.submit(crimes[..3].to_vec());
        assert_eq!(differ.items(), &crimes[..3]);

        let mut edited = crimes[3].clone();
        edited.suspect = "Eve".to_string();
        let next = vec![
            crimes[1].clone(),
            edited,
            crimes[0].clone(),
            crimes[4].clone(),
            crimes[5].clone(),
        ];
        differ.submit(next.clone());
        assert_eq!(differ.items(), next.as_slice());

        let changes = differ.submit(Vec::new());
        assert_eq!(changes.len(), 5);
        assert!(differ.items().is_empty());
    }
}
