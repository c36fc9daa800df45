use std::collections::HashMap;

use indexmap::IndexMap;

use super::cue::{CueId, CueItem, CueProperties};
use crate::error::CueError;

/// Ordered arena of cues. Position is play order, identity is the `CueId`.
#[derive(Debug, Default)]
pub struct CueList {
    cues: IndexMap<CueId, CueItem>,
    next_id: u64,
}

impl CueList {
    pub fn new() -> Self {
        Self {
            cues: IndexMap::new(),
            next_id: 1,
        }
    }

    /// Append a cue and return its identity. Ids are never reused.
    pub fn push(&mut self, properties: CueProperties) -> CueId {
        let id = CueId(self.next_id.max(1));
        self.next_id = id.0 + 1;
        self.cues.insert(id, CueItem::new(id, properties));
        id
    }

    pub fn get(&self, id: CueId) -> Option<&CueItem> {
        self.cues.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: CueId) -> Option<&mut CueItem> {
        self.cues.get_mut(&id)
    }

    pub fn contains(&self, id: CueId) -> bool {
        self.cues.contains_key(&id)
    }

    pub(crate) fn remove(&mut self, id: CueId) -> Option<CueItem> {
        self.cues.shift_remove(&id)
    }

    /// Drop every cue while keeping the id counter, so stale ids never alias new cues.
    pub(crate) fn clear(&mut self) {
        self.cues.clear();
    }

    pub fn position(&self, id: CueId) -> Option<usize> {
        self.cues.get_index_of(&id)
    }

    pub fn id_at(&self, index: usize) -> Option<CueId> {
        self.cues.get_index(index).map(|(id, _)| *id)
    }

    pub fn first(&self) -> Option<CueId> {
        self.id_at(0)
    }

    pub fn last(&self) -> Option<CueId> {
        self.cues.last().map(|(id, _)| *id)
    }

    /// The cue immediately following `id` in play order.
    pub fn next_after(&self, id: CueId) -> Option<CueId> {
        self.position(id).and_then(|index| self.id_at(index + 1))
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CueItem> {
        self.cues.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut CueItem> {
        self.cues.values_mut()
    }

    pub fn ids(&self) -> Vec<CueId> {
        self.cues.keys().copied().collect()
    }

    /// Rearrange the list into `order`, which must name every cue exactly once.
    pub(crate) fn reorder(&mut self, order: &[CueId]) -> Result<(), CueError> {
        if order.len() != self.cues.len() {
            return Err(CueError::InvalidOrder);
        }

        let mut rank = HashMap::with_capacity(order.len());
        for (index, id) in order.iter().enumerate() {
            if !self.cues.contains_key(id) || rank.insert(*id, index).is_some() {
                return Err(CueError::InvalidOrder);
            }
        }

        self.cues
            .sort_by_cached_key(|id, _| rank.get(id).copied().unwrap_or(usize::MAX));
        Ok(())
    }

    /// Move one cue to `index`, shifting the cues in between.
    pub(crate) fn move_to(&mut self, id: CueId, index: usize) -> Result<(), CueError> {
        let from = self.position(id).ok_or(CueError::UnknownCue(id))?;
        if index >= self.cues.len() {
            return Err(CueError::IndexOutOfRange {
                index,
                len: self.cues.len(),
            });
        }
        self.cues.move_index(from, index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_of(names: &[&str]) -> (CueList, Vec<CueId>) {
        let mut list = CueList::new();
        let ids = names
            .iter()
            .map(|name| list.push(CueProperties::command("true").named(*name)))
            .collect();
        (list, ids)
    }

    fn names(list: &CueList) -> Vec<String> {
        list.iter().map(|cue| cue.name.clone()).collect()
    }

    #[test]
    fn test_ids_are_stable_and_never_reused() {
        let (mut list, ids) = list_of(&["a", "b", "c"]);
        assert_eq!(ids, vec![CueId(1), CueId(2), CueId(3)]);

        list.remove(ids[2]);
        let d = list.push(CueProperties::command("true").named("d"));
        assert_eq!(d, CueId(4));

        list.clear();
        let e = list.push(CueProperties::command("true").named("e"));
        assert_eq!(e, CueId(5));
    }

    #[test]
    fn test_navigation() {
        let (list, ids) = list_of(&["a", "b", "c"]);
        assert_eq!(list.first(), Some(ids[0]));
        assert_eq!(list.last(), Some(ids[2]));
        assert_eq!(list.next_after(ids[0]), Some(ids[1]));
        assert_eq!(list.next_after(ids[2]), None);
        assert_eq!(list.position(ids[1]), Some(1));
        assert_eq!(list.id_at(3), None);
    }

    #[test]
    fn test_remove_preserves_order_of_others() {
        let (mut list, ids) = list_of(&["a", "b", "c", "d"]);
        list.remove(ids[1]);
        assert_eq!(names(&list), vec!["a", "c", "d"]);
        assert_eq!(list.next_after(ids[0]), Some(ids[2]));
    }

    #[test]
    fn test_reorder_keeps_identity() {
        let (mut list, ids) = list_of(&["a", "b", "c"]);
        list.reorder(&[ids[2], ids[0], ids[1]]).unwrap();
        assert_eq!(names(&list), vec!["c", "a", "b"]);
        assert_eq!(list.get(ids[0]).unwrap().name, "a");
        assert_eq!(list.next_after(ids[2]), Some(ids[0]));
    }

    #[test]
    fn test_reorder_rejects_bad_permutations() {
        let (mut list, ids) = list_of(&["a", "b", "c"]);
        assert!(list.reorder(&[ids[0], ids[1]]).is_err());
        assert!(list.reorder(&[ids[0], ids[0], ids[1]]).is_err());
        assert!(list.reorder(&[ids[0], ids[1], CueId(99)]).is_err());
        assert_eq!(names(&list), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_move_to() {
        let (mut list, ids) = list_of(&["a", "b", "c", "d"]);
        list.move_to(ids[3], 0).unwrap();
        assert_eq!(names(&list), vec!["d", "a", "b", "c"]);
        list.move_to(ids[3], 3).unwrap();
        assert_eq!(names(&list), vec!["a", "b", "c", "d"]);
        assert!(matches!(
            list.move_to(ids[0], 4),
            Err(CueError::IndexOutOfRange { index: 4, len: 4 })
        ));
        assert!(matches!(
            list.move_to(CueId(42), 0),
            Err(CueError::UnknownCue(CueId(42)))
        ));
    }
}
