//! Entity chains: the linked row/column sequences of a virtual grid.
//!
//! Rows and columns are stored in an arena and linked through `previous` /
//! `next` indices. Offsets are derived, never authoritative: an entity's
//! `offset` is the sum of the sizes before it and its `index_offset` is its
//! 1-based position. Both are recomputed whenever a `previous` link changes
//! and can be recomputed for a whole chain after bulk surgery.
//!
//! Entities that are spliced out stay in the arena (their handles remain
//! valid) but are no longer reachable from the chain head.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ops::DerefMut;

use super::cell::{CellId, FloatingCellId};
use crate::error::{GridError, Result};

/// Typed handle of an entity inside a [`Chain`].
pub struct EntityId<T> {
    index: usize,
    marker: PhantomData<fn() -> T>,
}

impl<T> EntityId<T> {
    pub(crate) fn new(index: usize) -> Self {
        Self {
            index,
            marker: PhantomData,
        }
    }

    /// Arena slot of the entity (not its position in the chain).
    pub fn index(self) -> usize {
        self.index
    }
}

impl<T> Clone for EntityId<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for EntityId<T> {}

impl<T> PartialEq for EntityId<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for EntityId<T> {}

impl<T> Hash for EntityId<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl<T> PartialOrd for EntityId<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for EntityId<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.index.cmp(&other.index)
    }
}

impl<T> fmt::Debug for EntityId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)
    }
}

/// State shared by row and column definitions.
#[derive(Debug, Clone, Default)]
pub struct EntityDefinition {
    previous: Option<usize>,
    next: Option<usize>,
    offset: i32,
    index_offset: u32,
    /// Extent along the entity's axis, in pixels
    pub size: i32,
    /// Solid cells starting in this entity
    pub objects: Vec<CellId>,
    /// Floating cells anchored to this entity
    pub floating_objects: Vec<FloatingCellId>,
    /// Inserted to fill empty space
    pub is_filler: bool,
    /// Inserted to give floating controls an anchor beyond the content
    pub is_padding: bool,
}

impl EntityDefinition {
    pub fn with_size(size: i32) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    pub fn filler(mut self) -> Self {
        self.is_filler = true;
        self
    }

    pub fn padding(mut self) -> Self {
        self.is_padding = true;
        self
    }

    /// Sum of the sizes of all preceding entities.
    pub fn offset(&self) -> i32 {
        self.offset
    }

    /// 1-based ordinal position in the chain.
    pub fn index_offset(&self) -> u32 {
        self.index_offset
    }

    pub fn bound(&self) -> i32 {
        self.offset + self.size
    }

    /// No solid and no floating content.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.floating_objects.is_empty()
    }

    pub fn has_previous(&self) -> bool {
        self.previous.is_some()
    }

    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }
}

/// Arena-backed doubly linked sequence of rows or columns.
#[derive(Debug, Clone)]
pub struct Chain<T> {
    nodes: Vec<T>,
    head: Option<usize>,
    tail: Option<usize>,
    /// Linked entities; detached arena slots are not counted
    len: usize,
}

impl<T> Default for Chain<T> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }
}

impl<T> Chain<T>
where
    T: DerefMut<Target = EntityDefinition>,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: EntityId<T>) -> Option<&T> {
        self.nodes.get(id.index)
    }

    pub fn get_mut(&mut self, id: EntityId<T>) -> Option<&mut T> {
        self.nodes.get_mut(id.index)
    }

    pub(crate) fn node(&self, id: EntityId<T>) -> Result<&T> {
        self.get(id)
            .ok_or(GridError::UnknownEntity { index: id.index })
    }

    pub(crate) fn node_mut(&mut self, id: EntityId<T>) -> Result<&mut T> {
        self.get_mut(id)
            .ok_or(GridError::UnknownEntity { index: id.index })
    }

    pub fn first(&self) -> Option<EntityId<T>> {
        self.head.map(EntityId::new)
    }

    pub fn last(&self) -> Option<EntityId<T>> {
        self.tail.map(EntityId::new)
    }

    pub fn previous(&self, id: EntityId<T>) -> Option<EntityId<T>> {
        self.get(id)?.previous.map(EntityId::new)
    }

    pub fn next(&self, id: EntityId<T>) -> Option<EntityId<T>> {
        self.get(id)?.next.map(EntityId::new)
    }

    /// Whether the entity is reachable from the chain head.
    pub fn is_linked(&self, id: EntityId<T>) -> bool {
        self.head == Some(id.index) || self.get(id).is_some_and(|node| node.previous.is_some())
    }

    /// Number of linked entities.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Handles of the linked entities, head first.
    ///
    /// Snapshot for callers that restructure the chain while walking it.
    pub fn ids(&self) -> Vec<EntityId<T>> {
        self.iter().map(|(id, _)| id).collect()
    }

    /// Linked entities in chain order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId<T>, &T)> + '_ {
        let mut current = self.head;
        // Bounded by the link count so a corrupted link can never spin forever.
        let mut remaining = self.len;
        std::iter::from_fn(move || {
            if remaining == 0 {
                return None;
            }
            let index = current?;
            let node = self.nodes.get(index)?;
            remaining -= 1;
            current = node.next;
            Some((EntityId::new(index), node))
        })
    }

    /// Append an entity after the current tail.
    ///
    /// The new entity's offsets follow directly from the tail's.
    pub fn append(&mut self, mut node: T) -> EntityId<T> {
        let index = self.nodes.len();
        let previous = self.tail;
        match previous.and_then(|prev| self.nodes.get_mut(prev)) {
            Some(prev) => {
                prev.next = Some(index);
                node.offset = prev.bound();
                node.index_offset = prev.index_offset + 1;
            }
            None => {
                self.head = Some(index);
                node.offset = 0;
                node.index_offset = 1;
            }
        }
        node.previous = previous;
        node.next = None;
        self.nodes.push(node);
        self.tail = Some(index);
        self.len += 1;
        EntityId::new(index)
    }

    /// Insert an entity directly after `anchor`, shifting everything behind it.
    pub fn insert_after(&mut self, anchor: EntityId<T>, node: T) -> Result<EntityId<T>> {
        if !self.is_linked(anchor) {
            return Err(GridError::UnknownEntity {
                index: anchor.index,
            });
        }
        let next = self.node(anchor)?.next;

        let index = self.nodes.len();
        self.nodes.push(node);
        let id = EntityId::new(index);
        {
            let entity = self.node_mut(id)?;
            entity.previous = Some(anchor.index);
            entity.next = next;
        }
        self.node_mut(anchor)?.next = Some(index);
        match next {
            Some(next) => {
                if let Some(next) = self.nodes.get_mut(next) {
                    next.previous = Some(index);
                }
            }
            None => self.tail = Some(index),
        }

        self.len += 1;

        self.recalculate_chain_offsets(id)?;
        Ok(id)
    }

    /// Recompute one entity's offsets by walking back through its predecessors.
    pub fn calculate_offset(&mut self, id: EntityId<T>) -> Result<()> {
        let mut offset = 0;
        let mut preceding: u32 = 0;
        let mut current = self.node(id)?.previous;
        let mut steps = 0;
        while let Some(index) = current {
            let Some(node) = self.nodes.get(index) else {
                break;
            };
            steps += 1;
            if steps > self.nodes.len() {
                break;
            }
            offset += node.size;
            preceding += 1;
            current = node.previous;
        }

        let node = self.node_mut(id)?;
        node.offset = offset;
        node.index_offset = preceding + 1;
        Ok(())
    }

    /// Walk to the head of `id`'s chain, then recompute every offset going forward.
    pub fn recalculate_chain_offsets(&mut self, id: EntityId<T>) -> Result<()> {
        let mut head = id.index;
        let mut steps = 0;
        while let Some(previous) = self.node(EntityId::new(head))?.previous {
            steps += 1;
            if steps > self.nodes.len() {
                break;
            }
            head = previous;
        }

        let mut offset = 0;
        let mut index_offset = 1;
        let mut current = Some(head);
        let mut steps = 0;
        while let Some(index) = current {
            steps += 1;
            if steps > self.nodes.len() {
                break;
            }
            let node = self.node_mut(EntityId::new(index))?;
            node.offset = offset;
            node.index_offset = index_offset;
            offset += node.size;
            index_offset += 1;
            current = node.next;
        }
        Ok(())
    }

    /// Recompute the offsets of the whole linked chain.
    pub fn recalculate_offsets(&mut self) -> Result<()> {
        match self.first() {
            Some(head) => self.recalculate_chain_offsets(head),
            None => Ok(()),
        }
    }

    /// Splice an empty entity out of the chain.
    ///
    /// Fails if the entity still owns solid cells.
    pub fn remove_from_chain(&mut self, id: EntityId<T>) -> Result<()> {
        if !self.node(id)?.objects.is_empty() {
            return Err(GridError::EntityOccupied { index: id.index });
        }
        self.unlink(id)
    }

    /// Splice an entity out regardless of its content. Callers are expected
    /// to have moved its cells elsewhere.
    pub(crate) fn unlink(&mut self, id: EntityId<T>) -> Result<()> {
        let (previous, next) = {
            let node = self.node(id)?;
            (node.previous, node.next)
        };
        if previous.is_none() && self.head != Some(id.index) {
            // Already detached.
            return Ok(());
        }

        match previous {
            Some(previous) => self.node_mut(EntityId::new(previous))?.next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => {
                self.node_mut(EntityId::new(next))?.previous = previous;
            }
            None => self.tail = previous,
        }
        self.len = self.len.saturating_sub(1);

        {
            let node = self.node_mut(id)?;
            node.previous = None;
            node.next = None;
        }
        self.calculate_offset(id)?;
        if let Some(next) = next {
            self.recalculate_chain_offsets(EntityId::new(next))?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::grid::ColumnDefinition;

    fn chain_of(sizes: &[i32]) -> (Chain<ColumnDefinition>, Vec<EntityId<ColumnDefinition>>) {
        let mut chain = Chain::new();
        let ids = sizes
            .iter()
            .map(|&size| chain.append(ColumnDefinition::with_size(size)))
            .collect();
        (chain, ids)
    }

    fn offsets(chain: &Chain<ColumnDefinition>) -> Vec<(i32, u32)> {
        chain
            .iter()
            .map(|(_, c)| (c.offset(), c.index_offset()))
            .collect()
    }

    #[test]
    fn test_append_derives_offsets() {
        let (chain, ids) = chain_of(&[10, 20, 30]);
        assert_eq!(offsets(&chain), vec![(0, 1), (10, 2), (30, 3)]);
        assert_eq!(chain.get(ids[2]).unwrap().bound(), 60);
        assert_eq!(chain.first(), Some(ids[0]));
        assert_eq!(chain.last(), Some(ids[2]));
        assert_eq!(chain.len(), 3);
    }

    #[test]
    fn test_insert_after_shifts_following_entities() {
        let (mut chain, ids) = chain_of(&[10, 20, 30]);
        let inserted = chain
            .insert_after(ids[0], ColumnDefinition::with_size(5))
            .unwrap();
        assert_eq!(chain.ids(), vec![ids[0], inserted, ids[1], ids[2]]);
        assert_eq!(offsets(&chain), vec![(0, 1), (10, 2), (15, 3), (35, 4)]);
    }

    #[test]
    fn test_insert_after_tail_moves_tail() {
        let (mut chain, ids) = chain_of(&[10]);
        let inserted = chain
            .insert_after(ids[0], ColumnDefinition::with_size(5))
            .unwrap();
        assert_eq!(chain.last(), Some(inserted));
        assert_eq!(chain.get(inserted).unwrap().offset(), 10);
    }

    #[test]
    fn test_remove_from_chain_splices_and_recalculates() {
        let (mut chain, ids) = chain_of(&[10, 20, 30]);
        chain.remove_from_chain(ids[1]).unwrap();
        assert_eq!(chain.ids(), vec![ids[0], ids[2]]);
        assert_eq!(offsets(&chain), vec![(0, 1), (10, 2)]);
        assert!(!chain.is_linked(ids[1]));
        assert!(chain.previous(ids[1]).is_none());
        assert!(chain.next(ids[1]).is_none());
    }

    #[test]
    fn test_remove_head_and_tail() {
        let (mut chain, ids) = chain_of(&[10, 20, 30]);
        chain.remove_from_chain(ids[0]).unwrap();
        assert_eq!(chain.first(), Some(ids[1]));
        assert_eq!(offsets(&chain), vec![(0, 1), (20, 2)]);
        chain.remove_from_chain(ids[2]).unwrap();
        assert_eq!(chain.last(), Some(ids[1]));
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn test_len_tracks_linked_entities() {
        let (mut chain, ids) = chain_of(&[10, 20, 30]);
        chain.insert_after(ids[0], ColumnDefinition::with_size(5)).unwrap();
        assert_eq!(chain.len(), 4);
        chain.unlink(ids[1]).unwrap();
        // Unlinking a detached entity is a no-op.
        chain.unlink(ids[1]).unwrap();
        assert_eq!(chain.len(), 3);
        assert_eq!(chain.iter().count(), 3);
        assert_eq!(chain.ids().len(), chain.len());
    }

    #[test]
    fn test_append_after_removal_continues_from_new_tail() {
        let (mut chain, ids) = chain_of(&[10, 20, 30]);
        chain.remove_from_chain(ids[2]).unwrap();
        let appended = chain.append(ColumnDefinition::with_size(7));
        assert_eq!(chain.previous(appended), Some(ids[1]));
        assert_eq!(offsets(&chain), vec![(0, 1), (10, 2), (30, 3)]);
        assert_eq!(chain.get(appended).unwrap().bound(), 37);
    }

    #[test]
    fn test_remove_occupied_entity_fails() {
        let (mut chain, ids) = chain_of(&[10, 20]);
        chain.get_mut(ids[0]).unwrap().objects.push(CellId(0));
        match chain.remove_from_chain(ids[0]) {
            Err(GridError::EntityOccupied { index }) => assert_eq!(index, ids[0].index()),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn test_recalculate_after_resize() {
        let (mut chain, ids) = chain_of(&[10, 20, 30]);
        chain.get_mut(ids[0]).unwrap().size = 15;
        // Derived offsets go stale until recalculated from any member.
        assert_eq!(chain.get(ids[2]).unwrap().offset(), 30);
        chain.recalculate_chain_offsets(ids[2]).unwrap();
        assert_eq!(offsets(&chain), vec![(0, 1), (15, 2), (35, 3)]);
    }

    #[test]
    fn test_calculate_offset_walks_back() {
        let (mut chain, ids) = chain_of(&[10, 20, 30]);
        chain.get_mut(ids[1]).unwrap().size = 1;
        chain.calculate_offset(ids[2]).unwrap();
        assert_eq!(chain.get(ids[2]).unwrap().offset(), 11);
        assert_eq!(chain.get(ids[2]).unwrap().index_offset(), 3);
    }

    #[test]
    fn test_unknown_entity() {
        let (mut chain, _) = chain_of(&[10]);
        let bogus = EntityId::new(42);
        assert!(chain.get(bogus).is_none());
        assert!(matches!(
            chain.calculate_offset(bogus),
            Err(GridError::UnknownEntity { index: 42 })
        ));
    }
}
