/*!
 * Action Selection
 *
 * Pure choice of the next resource operation: decide request vs release from
 * the current holdings, enumerate the eligible resources, pick one uniformly.
 */

use super::types::Action;
use rand::seq::SliceRandom;
use rand::Rng;

/// Choose the next operation, or `None` when nothing is eligible
pub fn choose_action<R: Rng + ?Sized>(allocation: &[u32], max_claim: &[u32], rng: &mut R) -> Option<Action> {
    let saturated = allocation.iter().zip(max_claim).all(|(a, m)| a == m);
    let empty = allocation.iter().all(|&a| a == 0);

    let release = if saturated {
        true
    } else if empty {
        false
    } else {
        rng.gen_bool(0.5)
    };

    let eligible: Vec<usize> = allocation
        .iter()
        .zip(max_claim)
        .enumerate()
        .filter(|(_, (&a, &m))| if release { a > 0 } else { a < m })
        .map(|(r, _)| r)
        .collect();

    let resource = *eligible.choose(rng)?;
    Some(if release {
        Action::Release(resource)
    } else {
        Action::Request(resource)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_empty_allocation_requests() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            match choose_action(&[0, 0, 0], &[2, 0, 1], &mut rng) {
                Some(Action::Request(r)) => assert!(r == 0 || r == 2),
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn test_saturated_allocation_releases() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            match choose_action(&[2, 0, 1], &[2, 0, 1], &mut rng) {
                Some(Action::Release(r)) => assert!(r == 0 || r == 2),
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn test_zero_claim_has_no_action() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(choose_action(&[0, 0], &[0, 0], &mut rng), None);
    }

    #[test]
    fn test_mixed_allocation_respects_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        let allocation = [1, 0, 2];
        let max_claim = [2, 1, 2];
        let mut seen_request = false;
        let mut seen_release = false;

        for _ in 0..500 {
            match choose_action(&allocation, &max_claim, &mut rng) {
                Some(Action::Request(r)) => {
                    assert!(allocation[r] < max_claim[r]);
                    seen_request = true;
                }
                Some(Action::Release(r)) => {
                    assert!(allocation[r] > 0);
                    seen_release = true;
                }
                None => panic!("an action is always eligible here"),
            }
        }
        assert!(seen_request && seen_release);
    }
}
