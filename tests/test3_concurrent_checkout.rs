#![cfg(feature = "test-utils")]

use std::collections::HashSet;
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;

use jobagent_db::prelude::*;
use jobagent_db::test_utils::MockConnector;

const THREADS: usize = 8;
const ROUNDS: usize = 50;

#[test]
fn test3_no_entry_has_two_holders() -> Result<(), Box<dyn std::error::Error>> {
    let connector = MockConnector::new().with_connect_delay(Duration::from_millis(2));
    let pool = ConnectionPool::new(connector.clone());
    drop(pool.init_connection("host=localhost dbname=postgres")?);

    let held: Arc<Mutex<HashSet<EntryId>>> = Arc::new(Mutex::new(HashSet::new()));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let pool = pool.clone();
            let held = Arc::clone(&held);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || -> Result<(), AgentDbError> {
                barrier.wait();
                for round in 0..ROUNDS {
                    let database = if (t + round) % 2 == 0 { "jobsdb" } else { "postgres" };
                    let mut entry = pool.get(None, Some(database))?;
                    assert!(
                        held.lock().unwrap().insert(entry.id()),
                        "{} handed out twice",
                        entry.id()
                    );
                    entry.execute("SELECT 1")?;
                    thread::yield_now();
                    assert!(held.lock().unwrap().remove(&entry.id()));
                    entry.return_to_pool();
                }
                Ok(())
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker panicked")?;
    }

    let status = pool.status();
    assert_eq!(status.in_use, 0);
    assert_eq!(status.total, connector.open_sessions());
    assert!(status.total <= 2 * THREADS);
    Ok(())
}

#[test]
fn test3_entries_move_between_threads() -> Result<(), Box<dyn std::error::Error>> {
    let connector = MockConnector::new();
    let pool = ConnectionPool::new(connector.clone());
    let entry = pool.get(Some("host=localhost"), None)?;
    let id = entry.id();

    let returned = thread::spawn(move || {
        let mut entry = entry;
        entry.execute_void("SELECT 1");
        entry.id()
    })
    .join()
    .expect("worker panicked");

    assert_eq!(returned, id);
    assert_eq!(pool.status().idle, 1);
    assert_eq!(pool.get(Some("host=localhost"), None)?.id(), id);
    Ok(())
}
