use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::args::SimConfig;
use crate::logging::EventLog;
use crate::model::{Op, TaskState};
use crate::oracle::Oracle;
use crate::pool_shim::PoolShim;
use crate::scheduler::Scheduler;

pub(crate) fn run(config: &SimConfig, rng: &mut ChaCha8Rng) -> Result<String, String> {
    let mut shim = PoolShim::new()?;
    let mut tasks: Vec<TaskState> = (0..config.tasks).map(TaskState::new).collect();
    let mut scheduler = Scheduler::new(config.tasks);
    let mut events = EventLog::new(config.first_steps, config.tail_steps);

    let max_steps = config.iterations.unwrap_or(u64::MAX);
    let max_time = config.duration_ms.unwrap_or(u64::MAX);

    let mut step: u64 = 0;
    while step < max_steps && scheduler.clock.now_ms <= max_time {
        let Some(task_id) = scheduler.next_ready(rng) else {
            break;
        };
        let has_primary = shim.pool.status().has_primary;
        let op = next_op(&tasks[task_id], has_primary, config, rng);

        let outcome = match shim.apply(&mut tasks, task_id, &op) {
            Ok(outcome) => outcome,
            Err(reason) => {
                events.dump_failure(&reason);
                return Err(reason);
            }
        };
        if let Op::Sleep(ms) = op {
            scheduler.sleep(task_id, ms);
        } else {
            scheduler.mark_ready(task_id);
        }

        let result_label = match &outcome.result {
            Ok(()) => "Ok".to_string(),
            Err(err) => format!("Err({err})"),
        };
        let entry_label = outcome
            .entry
            .map_or_else(|| "-".to_string(), |id| id.to_string());
        events.record(format!(
            "step={step} time={}ms task={task_id} op={} entry={entry_label} result={result_label}",
            scheduler.clock.now_ms,
            format_op(&op)
        ));

        if let Err(reason) =
            Oracle::check(&tasks, shim.pool.status(), shim.connector.open_sessions())
        {
            events.dump_failure(&reason);
            return Err(reason);
        }
        scheduler.tick();
        step += 1;
    }

    for task in &mut tasks {
        task.release();
    }
    let status = shim.pool.status();
    if status.in_use != 0 {
        return Err(format!("{} entries still in use after every task returned", status.in_use));
    }
    shim.pool.shutdown();
    if shim.connector.open_sessions() != 0 {
        return Err(format!(
            "{} sessions still open after shutdown",
            shim.connector.open_sessions()
        ));
    }

    Ok(format!(
        "complete: steps={step} time={}ms tasks={} connects={} queries={}",
        scheduler.clock.now_ms,
        config.tasks,
        shim.connector.connects(),
        shim.connector.queries().len()
    ))
}

fn next_op(task: &TaskState, has_primary: bool, config: &SimConfig, rng: &mut ChaCha8Rng) -> Op {
    if rng.random::<f64>() < config.sleep_rate {
        return Op::Sleep(rng.random_range(1..=50));
    }
    if rng.random::<f64>() < config.clear_rate {
        return Op::Clear {
            include_primary: rng.random_bool(0.3),
        };
    }
    if rng.random::<f64>() < config.restart_rate {
        return Op::Restart;
    }

    if task.entry.is_none() {
        if !has_primary {
            return Op::InitPrimary;
        }
        return Op::Checkout(rng.random_range(0..config.databases));
    }

    let weights = [
        (Op::Execute, 0.55),
        (Op::FailingQuery, config.fail_rate),
        (Op::Disconnect, config.disconnect_rate),
        (Op::Return, 0.30),
    ];
    choose_weighted(&weights, rng)
}

fn choose_weighted(items: &[(Op, f64)], rng: &mut ChaCha8Rng) -> Op {
    let total: f64 = items.iter().map(|(_, weight)| weight.max(0.0)).sum();
    if total <= f64::EPSILON {
        return items
            .first()
            .map_or(Op::Sleep(1), |(op, _)| op.clone());
    }
    let mut target = rng.random::<f64>() * total;
    for (op, weight) in items {
        let w = weight.max(0.0);
        if target <= w {
            return op.clone();
        }
        target -= w;
    }
    items.last().map_or(Op::Sleep(1), |(op, _)| op.clone())
}

fn format_op(op: &Op) -> String {
    match op {
        Op::Sleep(ms) => format!("Sleep({ms}ms)"),
        Op::Checkout(db) => format!("Checkout({})", crate::model::database_name(*db)),
        other => format!("{other:?}"),
    }
}
