/*!
 * Clock Tests
 * Monotonicity and carry properties of the shared simulated clock
 */

use oss_sim::{SimClock, SimTime};
use proptest::prelude::*;
use std::sync::Arc;

proptest! {
    #[test]
    fn new_normalizes(secs in 0u64..1_000_000, nanos in 0u64..10_000_000_000) {
        let time = SimTime::new(secs, nanos);
        prop_assert!(time.nanos < 1_000_000_000);
        prop_assert_eq!(time.as_nanos(), secs as u128 * 1_000_000_000 + nanos as u128);
    }

    #[test]
    fn advances_are_monotone_and_summed(deltas in prop::collection::vec(0u64..3_000_000_000, 1..50)) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        runtime.block_on(async {
            let clock = SimClock::new();
            let mut previous = clock.read();
            let mut expected: u128 = 0;

            for delta in &deltas {
                let now = clock.advance(*delta).await.unwrap();
                expected += *delta as u128;
                assert!(now >= previous);
                assert!(now.nanos < 1_000_000_000);
                assert_eq!(now, clock.read());
                previous = now;
            }
            assert_eq!(clock.read().as_nanos(), expected);
        });
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn readers_never_see_a_torn_time() {
    let clock = Arc::new(SimClock::new());

    let writers: Vec<_> = (0..4)
        .map(|_| {
            let clock = Arc::clone(&clock);
            tokio::spawn(async move {
                for _ in 0..500 {
                    clock.advance(999_999_999).await.unwrap();
                }
            })
        })
        .collect();

    let reader = {
        let clock = Arc::clone(&clock);
        tokio::spawn(async move {
            let mut last = SimTime::ZERO;
            for _ in 0..5_000 {
                let now = clock.read();
                assert!(now.nanos < 1_000_000_000);
                assert!(now >= last);
                last = now;
                tokio::task::yield_now().await;
            }
        })
    };

    for writer in writers {
        writer.await.unwrap();
    }
    reader.await.unwrap();
    assert_eq!(clock.read().as_nanos(), 2_000 * 999_999_999);
}

#[tokio::test]
async fn release_rejects_later_advances() {
    let clock = SimClock::new();
    clock.advance(10).await.unwrap();
    clock.release().unwrap();

    assert!(clock.advance(10).await.is_err());
    assert!(clock.release().is_err());
    assert_eq!(clock.read(), SimTime::new(0, 10));
}
