/*!
 * Banker's Algorithm
 *
 * Safety check over (available, allocation, max claim). A state is safe when
 * some ordering lets every admitted process obtain its remaining claim, run
 * to completion and return everything it holds.
 */

use super::types::ProcessEntry;
use crate::core::id::SlotId;
use crate::core::types::{vec_add_assign, vec_le};

/// A completion order for every entry, or `None` if the state is unsafe
///
/// Entries are scanned in the order given; the table passes them in slot
/// order so the result is deterministic.
pub fn safe_sequence<'a, I>(available: &[u32], entries: I) -> Option<Vec<SlotId>>
where
    I: IntoIterator<Item = &'a ProcessEntry>,
{
    let entries: Vec<&ProcessEntry> = entries.into_iter().collect();
    let needs: Vec<Vec<u32>> = entries.iter().map(|e| e.need()).collect();

    let mut work = available.to_vec();
    let mut finished = vec![false; entries.len()];
    let mut sequence = Vec::with_capacity(entries.len());

    loop {
        let mut progressed = false;
        for (i, entry) in entries.iter().enumerate() {
            if finished[i] || !vec_le(&needs[i], &work) {
                continue;
            }
            vec_add_assign(&mut work, &entry.allocation);
            finished[i] = true;
            sequence.push(entry.slot);
            progressed = true;
        }
        if !progressed {
            break;
        }
    }

    (sequence.len() == entries.len()).then_some(sequence)
}

#[inline]
pub fn is_safe<'a, I>(available: &[u32], entries: I) -> bool
where
    I: IntoIterator<Item = &'a ProcessEntry>,
{
    safe_sequence(available, entries).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry(slot: u32, max: &[u32], held: &[u32]) -> ProcessEntry {
        ProcessEntry {
            slot: SlotId(slot),
            max_claim: max.to_vec(),
            allocation: held.to_vec(),
        }
    }

    #[test]
    fn test_empty_state_is_safe() {
        let none: Vec<ProcessEntry> = vec![];
        assert_eq!(safe_sequence(&[1, 2], &none), Some(vec![]));
    }

    #[test]
    fn test_textbook_safe_state() {
        // Classic five-process example, available = [3, 3, 2]
        let entries = vec![
            entry(0, &[7, 5, 3], &[0, 1, 0]),
            entry(1, &[3, 2, 2], &[2, 0, 0]),
            entry(2, &[9, 0, 2], &[3, 0, 2]),
            entry(3, &[2, 2, 2], &[2, 1, 1]),
            entry(4, &[4, 3, 3], &[0, 0, 2]),
        ];

        let sequence = safe_sequence(&[3, 3, 2], &entries).unwrap();
        assert_eq!(sequence.len(), 5);
        assert_eq!(sequence[0], SlotId(1));
    }

    #[test]
    fn test_textbook_unsafe_state() {
        // P1 was granted (1, 0, 2); P0 now asks for (0, 2, 0)
        let mut entries = vec![
            entry(0, &[7, 5, 3], &[0, 1, 0]),
            entry(1, &[3, 2, 2], &[3, 0, 2]),
            entry(2, &[9, 0, 2], &[3, 0, 2]),
            entry(3, &[2, 2, 2], &[2, 1, 1]),
            entry(4, &[4, 3, 3], &[0, 0, 2]),
        ];
        assert!(is_safe(&[2, 3, 0], &entries));

        entries[0].allocation = vec![0, 3, 0];
        assert!(!is_safe(&[2, 1, 0], &entries));
    }

    #[test]
    fn test_two_processes_waiting_on_each_other() {
        // One instance each; both hold one and still need the other
        let entries = vec![entry(0, &[1, 1], &[1, 0]), entry(1, &[1, 1], &[0, 1])];
        assert!(!is_safe(&[0, 0], &entries));
    }

    #[test]
    fn test_zero_claim_process_always_finishes() {
        let entries = vec![entry(0, &[0, 0], &[0, 0])];
        assert_eq!(safe_sequence(&[0, 0], &entries), Some(vec![SlotId(0)]));
    }
}
