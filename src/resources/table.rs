/*!
 * Resource Table
 *
 * Total and available instances per resource kind plus one entry per
 * admitted process. Written only by the controller; every mutation keeps
 * `available[r] + Σ allocation[r] == total[r]` and `allocation <= max_claim`.
 */

use super::banker;
use super::slots::SlotTable;
use super::types::*;
use crate::core::id::SlotId;
use crate::core::limits::MAX_RESOURCE_INSTANCES;
use crate::core::types::{vec_add_assign, ResourceIndex, ResourceVec};
use rand::Rng;
use tracing::{debug, trace};

/// Resource allocation state
#[derive(Debug, Clone)]
pub struct ResourceTable {
    total: ResourceVec,
    available: ResourceVec,
    entries: SlotTable<ProcessEntry>,
    released: bool,
}

impl ResourceTable {
    /// Table with the given instance counts and room for `capacity` processes
    pub fn new(total: ResourceVec, capacity: usize) -> Self {
        Self {
            available: total.clone(),
            total,
            entries: SlotTable::with_capacity(capacity),
            released: false,
        }
    }

    /// Table with `1..=MAX_RESOURCE_INSTANCES` instances of each of `kinds` resources
    pub fn random<R: Rng + ?Sized>(
        kinds: usize,
        capacity: usize,
        rng: &mut R,
    ) -> ResourceResult<Self> {
        if kinds == 0 || capacity == 0 {
            return Err(ResourceError::EmptyTable { kinds, capacity });
        }
        let total = (0..kinds)
            .map(|_| rng.gen_range(1..=MAX_RESOURCE_INSTANCES))
            .collect();
        Ok(Self::new(total, capacity))
    }

    fn check_resource(&self, resource: ResourceIndex) -> ResourceResult<()> {
        if resource < self.total.len() {
            Ok(())
        } else {
            Err(ResourceError::InvalidResource {
                resource,
                count: self.total.len(),
            })
        }
    }

    /// Admit a process into `slot` with the given max claim
    ///
    /// Claims above a resource's total are clamped to the total: such a claim
    /// could never be satisfied and would make every state unsafe.
    pub fn admit(&mut self, slot: SlotId, max_claim: ResourceVec) -> ResourceResult<&ProcessEntry> {
        if max_claim.len() != self.total.len() {
            return Err(ResourceError::ClaimLengthMismatch {
                expected: self.total.len(),
                got: max_claim.len(),
            });
        }
        let clamped = max_claim
            .iter()
            .zip(&self.total)
            .map(|(claim, total)| (*claim).min(*total))
            .collect();

        let entry = self.entries.insert(slot, ProcessEntry::new(slot, clamped))?;
        debug!(slot = %slot, max_claim = ?entry.max_claim, "Process admitted");
        Ok(entry)
    }

    /// Evaluate a one-instance request from `slot`
    ///
    /// Grants only when an instance is free and the resulting state is safe.
    /// A deferred request leaves the table untouched.
    pub fn request(&mut self, slot: SlotId, resource: ResourceIndex) -> ResourceResult<Decision> {
        self.check_resource(resource)?;
        let entry = self.entries.get(slot)?;
        if entry.allocation[resource] >= entry.max_claim[resource] {
            return Err(ResourceError::ClaimExceeded {
                slot,
                resource,
                claim: entry.max_claim[resource],
            });
        }
        if self.available[resource] == 0 {
            return Ok(Decision::Deferred(DeferReason::Unavailable));
        }

        // Tentatively grant, then keep it only if the state stays safe
        self.available[resource] -= 1;
        self.entries.get_mut(slot)?.allocation[resource] += 1;

        if banker::is_safe(&self.available, self.entries.iter().map(|(_, e)| e)) {
            trace!(slot = %slot, resource, "Request granted");
            Ok(Decision::Granted)
        } else {
            self.entries.get_mut(slot)?.allocation[resource] -= 1;
            self.available[resource] += 1;
            trace!(slot = %slot, resource, "Request would be unsafe");
            Ok(Decision::Deferred(DeferReason::Unsafe))
        }
    }

    /// Return one instance of `resource` held by `slot`
    pub fn release(&mut self, slot: SlotId, resource: ResourceIndex) -> ResourceResult<()> {
        self.check_resource(resource)?;
        let entry = self.entries.get_mut(slot)?;
        if entry.allocation[resource] == 0 {
            return Err(ResourceError::NotHeld { slot, resource });
        }
        entry.allocation[resource] -= 1;
        self.available[resource] += 1;
        Ok(())
    }

    /// Remove `slot`'s entry and fold its allocation back into `available`
    ///
    /// Returns the allocation that was returned.
    pub fn reclaim(&mut self, slot: SlotId) -> ResourceResult<ResourceVec> {
        let entry = self.entries.remove(slot)?;
        vec_add_assign(&mut self.available, &entry.allocation);
        debug!(slot = %slot, returned = ?entry.allocation, "Process entry reclaimed");
        Ok(entry.allocation)
    }

    /// Reclaim every remaining entry and retire the table
    ///
    /// Returns the slots that were still admitted. Fails on a second call.
    pub fn release_all(&mut self) -> ResourceResult<Vec<SlotId>> {
        if self.released {
            return Err(ResourceError::AlreadyReleased);
        }
        let slots: Vec<SlotId> = self.entries.iter().map(|(slot, _)| slot).collect();
        for slot in &slots {
            self.reclaim(*slot)?;
        }
        self.released = true;
        debug!(reclaimed = slots.len(), "Resource table released");
        Ok(slots)
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Verify conservation and claim bounds
    pub fn check_invariants(&self) -> ResourceResult<()> {
        let mut held = vec![0u32; self.total.len()];
        for (slot, entry) in self.entries.iter() {
            for r in 0..self.total.len() {
                if entry.allocation[r] > entry.max_claim[r] || entry.allocation[r] > self.total[r] {
                    return Err(ResourceError::InvariantViolated(format!(
                        "slot {} holds {} of resource {} (claim {}, total {})",
                        slot, entry.allocation[r], r, entry.max_claim[r], self.total[r]
                    )));
                }
            }
            vec_add_assign(&mut held, &entry.allocation);
        }
        for r in 0..self.total.len() {
            if self.available[r] + held[r] != self.total[r] {
                return Err(ResourceError::InvariantViolated(format!(
                    "resource {}: available {} + held {} != total {}",
                    r, self.available[r], held[r], self.total[r]
                )));
            }
        }
        Ok(())
    }

    /// Whether the current state admits a safe completion order
    pub fn is_safe(&self) -> bool {
        banker::is_safe(&self.available, self.entries.iter().map(|(_, e)| e))
    }

    pub fn safe_sequence(&self) -> Option<Vec<SlotId>> {
        banker::safe_sequence(&self.available, self.entries.iter().map(|(_, e)| e))
    }

    pub fn entry(&self, slot: SlotId) -> ResourceResult<&ProcessEntry> {
        self.entries.get(slot)
    }

    pub fn total(&self) -> &[u32] {
        &self.total
    }

    pub fn available(&self) -> &[u32] {
        &self.available
    }

    pub fn resource_count(&self) -> usize {
        self.total.len()
    }

    pub fn live_count(&self) -> usize {
        self.entries.len()
    }

    pub fn snapshot(&self) -> TableSnapshot {
        TableSnapshot {
            total: self.total.clone(),
            available: self.available.clone(),
            entries: self.entries.iter().map(|(_, e)| e.clone()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_random_totals_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let table = ResourceTable::random(20, 17, &mut rng).unwrap();

        assert_eq!(table.resource_count(), 20);
        assert!(table.total().iter().all(|t| (1..=10).contains(t)));
        assert_eq!(table.available(), table.total());
    }

    #[test]
    fn test_random_rejects_empty_table() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(matches!(
            ResourceTable::random(0, 17, &mut rng),
            Err(ResourceError::EmptyTable { kinds: 0, capacity: 17 })
        ));
        assert!(matches!(
            ResourceTable::random(3, 0, &mut rng),
            Err(ResourceError::EmptyTable { .. })
        ));
    }

    #[test]
    fn test_immediate_grant() {
        let mut table = ResourceTable::new(vec![5, 1, 1], 3);
        table.admit(SlotId(0), vec![2, 0, 0]).unwrap();

        assert_eq!(table.request(SlotId(0), 0), Ok(Decision::Granted));
        assert_eq!(table.entry(SlotId(0)).unwrap().allocation, vec![1, 0, 0]);
        assert_eq!(table.available(), &[4, 1, 1]);
        table.check_invariants().unwrap();
    }

    #[test]
    fn test_claim_clamped_to_total() {
        let mut table = ResourceTable::new(vec![1, 4], 2);
        let entry = table.admit(SlotId(0), vec![2, 2]).unwrap();
        assert_eq!(entry.max_claim, vec![1, 2]);
    }

    #[test]
    fn test_request_beyond_claim_rejected() {
        let mut table = ResourceTable::new(vec![3], 2);
        table.admit(SlotId(0), vec![1]).unwrap();
        table.request(SlotId(0), 0).unwrap();

        assert_eq!(
            table.request(SlotId(0), 0),
            Err(ResourceError::ClaimExceeded {
                slot: SlotId(0),
                resource: 0,
                claim: 1
            })
        );
    }

    #[test]
    fn test_unavailable_defers() {
        let mut table = ResourceTable::new(vec![1], 2);
        table.admit(SlotId(0), vec![1]).unwrap();
        table.admit(SlotId(1), vec![1]).unwrap();

        assert_eq!(table.request(SlotId(0), 0), Ok(Decision::Granted));
        assert_eq!(
            table.request(SlotId(1), 0),
            Ok(Decision::Deferred(DeferReason::Unavailable))
        );
        table.check_invariants().unwrap();
    }

    #[test]
    fn test_unsafe_defers_and_leaves_table_untouched() {
        // Two resources with one instance each, both processes claim both
        let mut table = ResourceTable::new(vec![1, 1], 2);
        table.admit(SlotId(0), vec![1, 1]).unwrap();
        table.admit(SlotId(1), vec![1, 1]).unwrap();

        assert_eq!(table.request(SlotId(0), 0), Ok(Decision::Granted));
        let before = table.snapshot();

        // Resource 1 is free, but granting it to slot 1 would deadlock both
        assert_eq!(
            table.request(SlotId(1), 1),
            Ok(Decision::Deferred(DeferReason::Unsafe))
        );
        assert_eq!(table.snapshot(), before);

        // Slot 0 can still finish, so its request is fine
        assert_eq!(table.request(SlotId(0), 1), Ok(Decision::Granted));
        table.check_invariants().unwrap();
    }

    #[test]
    fn test_release_and_not_held() {
        let mut table = ResourceTable::new(vec![2], 1);
        table.admit(SlotId(0), vec![2]).unwrap();

        assert_eq!(
            table.release(SlotId(0), 0),
            Err(ResourceError::NotHeld {
                slot: SlotId(0),
                resource: 0
            })
        );

        table.request(SlotId(0), 0).unwrap();
        table.release(SlotId(0), 0).unwrap();
        assert_eq!(table.available(), &[2]);
    }

    #[test]
    fn test_reclaim_returns_allocation() {
        let mut table = ResourceTable::new(vec![3, 3], 2);
        table.admit(SlotId(1), vec![2, 2]).unwrap();
        table.request(SlotId(1), 0).unwrap();
        table.request(SlotId(1), 0).unwrap();
        table.request(SlotId(1), 1).unwrap();
        assert_eq!(table.available(), &[1, 2]);

        assert_eq!(table.reclaim(SlotId(1)), Ok(vec![2, 1]));
        assert_eq!(table.available(), &[3, 3]);
        assert_eq!(table.live_count(), 0);

        // Slot is free for reuse
        table.admit(SlotId(1), vec![0, 1]).unwrap();
        table.check_invariants().unwrap();
    }

    #[test]
    fn test_invalid_resource() {
        let mut table = ResourceTable::new(vec![1], 1);
        table.admit(SlotId(0), vec![1]).unwrap();

        assert_eq!(
            table.request(SlotId(0), 3),
            Err(ResourceError::InvalidResource {
                resource: 3,
                count: 1
            })
        );
    }

    #[test]
    fn test_release_all_once() {
        let mut table = ResourceTable::new(vec![2, 2], 3);
        table.admit(SlotId(0), vec![1, 1]).unwrap();
        table.admit(SlotId(2), vec![2, 0]).unwrap();
        table.request(SlotId(2), 0).unwrap();

        assert_eq!(table.release_all(), Ok(vec![SlotId(0), SlotId(2)]));
        assert_eq!(table.available(), table.total());
        assert!(table.is_released());
        assert_eq!(table.release_all(), Err(ResourceError::AlreadyReleased));
    }
}
