use std::collections::BTreeMap;

use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Simulated time in milliseconds. Nothing in a seeded run reads the wall
/// clock.
pub(crate) struct SimClock {
    pub(crate) now_ms: u64,
}

/// Picks which task moves next. Ready tasks are chosen uniformly from the
/// seeded generator; sleeping tasks rejoin once the clock passes their wake
/// time.
pub(crate) struct Scheduler {
    ready: Vec<usize>,
    sleeping: BTreeMap<u64, Vec<usize>>,
    pub(crate) clock: SimClock,
}

impl Scheduler {
    pub(crate) fn new(task_count: usize) -> Self {
        Self {
            ready: (0..task_count).collect(),
            sleeping: BTreeMap::new(),
            clock: SimClock { now_ms: 0 },
        }
    }

    pub(crate) fn sleep(&mut self, task_id: usize, duration_ms: u64) {
        let wake_at = self.clock.now_ms.saturating_add(duration_ms.max(1));
        self.sleeping.entry(wake_at).or_default().push(task_id);
    }

    pub(crate) fn tick(&mut self) {
        self.clock.now_ms = self.clock.now_ms.saturating_add(1);
        self.wake_due();
    }

    pub(crate) fn next_ready(&mut self, rng: &mut ChaCha8Rng) -> Option<usize> {
        if self.ready.is_empty() {
            let (wake_at, mut tasks) = self.sleeping.pop_first()?;
            self.clock.now_ms = wake_at;
            self.ready.append(&mut tasks);
        }
        let idx = rng.random_range(0..self.ready.len());
        Some(self.ready.swap_remove(idx))
    }

    pub(crate) fn mark_ready(&mut self, task_id: usize) {
        self.ready.push(task_id);
    }

    fn wake_due(&mut self) {
        let later = self.sleeping.split_off(&(self.clock.now_ms + 1));
        for (_, mut tasks) in std::mem::replace(&mut self.sleeping, later) {
            self.ready.append(&mut tasks);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn sleeping_task_wakes_after_deadline() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut scheduler = Scheduler::new(1);
        let task = scheduler.next_ready(&mut rng).unwrap();
        scheduler.sleep(task, 3);
        scheduler.tick();
        scheduler.tick();
        assert!(scheduler.ready.is_empty());
        scheduler.tick();
        assert_eq!(scheduler.ready, [task]);
    }

    #[test]
    fn idle_scheduler_jumps_to_next_wake() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut scheduler = Scheduler::new(1);
        let task = scheduler.next_ready(&mut rng).unwrap();
        scheduler.sleep(task, 40);
        assert_eq!(scheduler.next_ready(&mut rng), Some(task));
        assert_eq!(scheduler.clock.now_ms, 40);
    }
}
