use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use jobagent_db::ConnectionPool;
use jobagent_db::pool::EntryId;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::args::SimConfig;
use crate::model::database_name;
use crate::pool_shim::{FAILING, PRIMARY, WORK, scripted_connector};

/// Hammer one pool from real threads. Interleavings are not reproducible
/// here; the seed only fixes each thread's choice of operations.
pub(crate) fn run_threads(config: &SimConfig, threads: usize) -> Result<String, String> {
    let connector = scripted_connector().with_connect_delay(Duration::from_micros(200));
    let pool = ConnectionPool::new(connector.clone());
    drop(
        pool.init_connection(PRIMARY)
            .map_err(|err| format!("initial connect failed: {err}"))?,
    );

    let rounds = config.iterations.unwrap_or(10_000) / threads as u64;
    let held: Arc<Mutex<HashSet<EntryId>>> = Arc::default();

    let handles: Vec<_> = (0..threads)
        .map(|worker| {
            let pool = pool.clone();
            let held = Arc::clone(&held);
            let mut rng = ChaCha8Rng::seed_from_u64(config.seed.wrapping_add(worker as u64));
            let databases = config.databases;
            let fail_rate = config.fail_rate;
            thread::Builder::new()
                .name(format!("sim-worker-{worker}"))
                .spawn(move || -> Result<(), String> {
                    for _ in 0..rounds {
                        let database = database_name(rng.random_range(0..databases));
                        let mut entry = pool
                            .get(None, Some(&database))
                            .map_err(|err| format!("worker {worker}: checkout failed: {err}"))?;
                        let id = entry.id();
                        if !lock(&held).insert(id) {
                            return Err(format!("{id} handed to two holders"));
                        }
                        let query = if rng.random::<f64>() < fail_rate { FAILING } else { WORK };
                        let outcome = entry.execute(query);
                        if (query == WORK) != outcome.is_ok() {
                            return Err(format!("{id}: unexpected outcome for {query:?}"));
                        }
                        thread::yield_now();
                        lock(&held).remove(&id);
                        entry.return_to_pool();
                    }
                    Ok(())
                })
                .map_err(|err| format!("failed to spawn worker: {err}"))
        })
        .collect::<Result<_, _>>()?;

    for handle in handles {
        handle
            .join()
            .map_err(|_| "worker panicked".to_string())??;
    }

    let status = pool.status();
    if status.in_use != 0 || status.total != connector.open_sessions() {
        return Err(format!(
            "pool {status:?} disagrees with {} open sessions",
            connector.open_sessions()
        ));
    }
    pool.shutdown();
    Ok(format!(
        "complete: threads={threads} rounds={rounds} connects={} sessions={}",
        connector.connects(),
        status.total
    ))
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
