/*!
 * Spawn Timer
 *
 * Decides when the next worker may be created. The first spawn is due at
 * time zero; each later one lands uniformly in `(0, window]` after the
 * previous spawn. An optional lifetime cap stops the timer for good.
 */

use crate::clock::SimTime;
use rand::Rng;

#[derive(Debug, Clone)]
pub struct SpawnTimer {
    next: Option<SimTime>,
    window_ns: u64,
    remaining: Option<usize>,
}

impl SpawnTimer {
    pub fn new(window_ns: u64, max_total: Option<usize>) -> Self {
        let next = match max_total {
            Some(0) => None,
            _ => Some(SimTime::ZERO),
        };
        Self {
            next,
            window_ns,
            remaining: max_total,
        }
    }

    /// Next spawn instant, `None` once the cap is exhausted
    pub fn next(&self) -> Option<SimTime> {
        self.next
    }

    pub fn is_due(&self, now: SimTime) -> bool {
        self.next.map_or(false, |next| next <= now)
    }

    /// Record a spawn at `now` and schedule the following one
    pub fn spawned<R: Rng + ?Sized>(&mut self, now: SimTime, rng: &mut R) {
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining = remaining.saturating_sub(1);
            if *remaining == 0 {
                self.next = None;
                return;
            }
        }
        let delay = rng.gen_range(1..=self.window_ns);
        self.next = Some(now.add_nanos(delay));
    }
}
