use std::collections::VecDeque;

/// Keeps the first and the most recent steps of a run so a failure report
/// shows how the run started and what led up to the violation.
pub(crate) struct EventLog {
    head: Vec<String>,
    tail: VecDeque<String>,
    head_limit: usize,
    tail_limit: usize,
    dropped: u64,
}

impl EventLog {
    pub(crate) fn new(head_limit: usize, tail_limit: usize) -> Self {
        Self {
            head: Vec::with_capacity(head_limit),
            tail: VecDeque::with_capacity(tail_limit),
            head_limit,
            tail_limit,
            dropped: 0,
        }
    }

    pub(crate) fn record(&mut self, message: String) {
        tracing::debug!("{message}");
        if self.head.len() < self.head_limit {
            self.head.push(message);
            return;
        }
        if self.tail.len() == self.tail_limit {
            self.tail.pop_front();
            self.dropped += 1;
        }
        if self.tail_limit > 0 {
            self.tail.push_back(message);
        }
    }

    pub(crate) fn dump_failure(&self, reason: &str) {
        tracing::error!("invariant violated: {reason}");
        for line in &self.head {
            tracing::error!("  {line}");
        }
        if self.dropped > 0 {
            tracing::error!("  ... {} steps omitted ...", self.dropped);
        }
        for line in &self.tail {
            tracing::error!("  {line}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_head_and_tail() {
        let mut log = EventLog::new(2, 2);
        for i in 0..6 {
            log.record(format!("step {i}"));
        }
        assert_eq!(log.head, ["step 0", "step 1"]);
        assert_eq!(log.tail, ["step 4", "step 5"]);
        assert_eq!(log.dropped, 2);
    }
}
