use std::collections::HashMap;

use jobagent_db::PoolStatus;

use crate::model::TaskState;

pub(crate) struct Oracle;

impl Oracle {
    /// Compare what the tasks believe they hold with what the pool reports.
    pub(crate) fn check(
        tasks: &[TaskState],
        status: PoolStatus,
        open_sessions: usize,
    ) -> Result<(), String> {
        let mut seen = HashMap::new();
        let mut registered_held = 0;
        let mut retired_held = 0;
        for task in tasks {
            let Some(id) = task.held_id() else {
                if task.retired {
                    return Err(format!("task {} is retired without an entry", task.id));
                }
                continue;
            };
            if let Some(other) = seen.insert(id, task.id) {
                return Err(format!("{id} held by tasks {other} and {}", task.id));
            }
            if task.retired {
                retired_held += 1;
            } else {
                registered_held += 1;
            }
        }

        if status.in_use != registered_held {
            return Err(format!(
                "pool reports {} in use, tasks hold {registered_held}",
                status.in_use
            ));
        }
        if status.idle + status.in_use != status.total {
            return Err(format!("inconsistent status {status:?}"));
        }
        if open_sessions != status.total + retired_held {
            return Err(format!(
                "{open_sessions} open sessions, registry has {} and {retired_held} are retired",
                status.total
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_pool_is_consistent() {
        let tasks = vec![TaskState::new(0), TaskState::new(1)];
        let status = PoolStatus {
            total: 0,
            idle: 0,
            in_use: 0,
            has_primary: false,
        };
        assert!(Oracle::check(&tasks, status, 0).is_ok());
        assert!(Oracle::check(&tasks, status, 1).is_err());
    }
}
