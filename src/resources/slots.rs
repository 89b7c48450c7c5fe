/*!
 * Slot Table
 * Fixed-capacity arena indexed by bounds-checked slot ids
 */

use super::types::{ResourceError, ResourceResult};
use crate::core::id::SlotId;

/// Arena of optional entries, one per slot
#[derive(Debug, Clone)]
pub struct SlotTable<T> {
    slots: Vec<Option<T>>,
}

impl<T> SlotTable<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: std::iter::repeat_with(|| None).take(capacity).collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn check(&self, slot: SlotId) -> ResourceResult<usize> {
        let index = slot.index();
        if index < self.slots.len() {
            Ok(index)
        } else {
            Err(ResourceError::SlotOutOfRange {
                slot,
                capacity: self.slots.len(),
            })
        }
    }

    /// Occupy a free slot
    pub fn insert(&mut self, slot: SlotId, value: T) -> ResourceResult<&mut T> {
        let index = self.check(slot)?;
        let cell = &mut self.slots[index];
        if cell.is_some() {
            return Err(ResourceError::SlotOccupied(slot));
        }
        Ok(cell.insert(value))
    }

    pub fn get(&self, slot: SlotId) -> ResourceResult<&T> {
        let index = self.check(slot)?;
        self.slots[index]
            .as_ref()
            .ok_or(ResourceError::UnknownSlot(slot))
    }

    pub fn get_mut(&mut self, slot: SlotId) -> ResourceResult<&mut T> {
        let index = self.check(slot)?;
        self.slots[index]
            .as_mut()
            .ok_or(ResourceError::UnknownSlot(slot))
    }

    /// Vacate a slot, returning its value
    pub fn remove(&mut self, slot: SlotId) -> ResourceResult<T> {
        let index = self.check(slot)?;
        self.slots[index]
            .take()
            .ok_or(ResourceError::UnknownSlot(slot))
    }

    /// Occupied slots in ascending slot order
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, cell)| cell.as_ref().map(|v| (SlotId(i as u32), v)))
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|cell| cell.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_get_remove() {
        let mut table = SlotTable::with_capacity(3);

        table.insert(SlotId(1), "a").unwrap();
        assert_eq!(table.get(SlotId(1)), Ok(&"a"));
        assert_eq!(table.len(), 1);

        assert_eq!(table.remove(SlotId(1)), Ok("a"));
        assert!(table.is_empty());
    }

    #[test]
    fn test_bounds_checked() {
        let mut table: SlotTable<u8> = SlotTable::with_capacity(2);

        assert_eq!(
            table.insert(SlotId(2), 0).unwrap_err(),
            ResourceError::SlotOutOfRange {
                slot: SlotId(2),
                capacity: 2
            }
        );
        assert_eq!(
            table.get(SlotId(0)).unwrap_err(),
            ResourceError::UnknownSlot(SlotId(0))
        );
    }

    #[test]
    fn test_occupied_slot_rejected() {
        let mut table = SlotTable::with_capacity(1);
        table.insert(SlotId(0), 1).unwrap();

        assert_eq!(
            table.insert(SlotId(0), 2).unwrap_err(),
            ResourceError::SlotOccupied(SlotId(0))
        );
    }

    #[test]
    fn test_iter_in_slot_order() {
        let mut table = SlotTable::with_capacity(4);
        table.insert(SlotId(3), 'c').unwrap();
        table.insert(SlotId(0), 'a').unwrap();
        table.insert(SlotId(2), 'b').unwrap();

        let order: Vec<_> = table.iter().map(|(slot, v)| (slot.0, *v)).collect();
        assert_eq!(order, vec![(0, 'a'), (2, 'b'), (3, 'c')]);
    }
}
