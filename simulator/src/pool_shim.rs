use jobagent_db::pool::EntryId;
use jobagent_db::test_utils::{MockConnector, MockReply};
use jobagent_db::{AgentDbError, ConnectionPool};

use crate::model::{Op, TaskState, database_name};

pub(crate) const PRIMARY: &str = "host=sim-db port=5432 dbname=postgres user=agent password=sim";
pub(crate) const WORK: &str = "UPDATE pgagent.pga_job SET jobnextrun = now() WHERE jobid = 1";
pub(crate) const FAILING: &str = "SELECT * FROM pgagent.missing_table";
const DISCONNECT: &str = "SELECT pg_terminate_backend(pg_backend_pid())";

#[derive(Debug, Clone)]
pub(crate) struct StepOutcome {
    pub(crate) result: Result<(), String>,
    pub(crate) entry: Option<EntryId>,
}

impl StepOutcome {
    fn ok(entry: Option<EntryId>) -> Self {
        Self {
            result: Ok(()),
            entry,
        }
    }
}

pub(crate) fn scripted_connector() -> MockConnector {
    let connector = MockConnector::new();
    connector.on_query(WORK, MockReply::Command(1));
    connector.on_query(
        FAILING,
        MockReply::Error("relation \"pgagent.missing_table\" does not exist".to_string()),
    );
    connector.on_query(DISCONNECT, MockReply::Disconnect);
    connector
}

/// The real pool over a scripted connector, plus the one fact the oracle
/// cannot read back from the pool: which entry is the registered primary.
pub(crate) struct PoolShim {
    pub(crate) pool: ConnectionPool,
    pub(crate) connector: MockConnector,
    current_primary: Option<EntryId>,
}

impl PoolShim {
    pub(crate) fn new() -> Result<Self, String> {
        let connector = scripted_connector();
        let pool = ConnectionPool::new(connector.clone());
        let service = pool
            .init_connection(PRIMARY)
            .map_err(|err| format!("initial connect failed: {err}"))?;
        let current_primary = Some(service.id());
        drop(service);
        Ok(Self {
            pool,
            connector,
            current_primary,
        })
    }

    /// Apply `op` for `tasks[task_id]`. `Err` means the pool broke a rule;
    /// an `Err` inside the outcome is an ordinary failed operation.
    pub(crate) fn apply(
        &mut self,
        tasks: &mut [TaskState],
        task_id: usize,
        op: &Op,
    ) -> Result<StepOutcome, String> {
        match op {
            Op::Sleep(_) => Ok(StepOutcome::ok(tasks[task_id].held_id())),
            Op::Checkout(db) => self.checkout(&mut tasks[task_id], *db),
            Op::InitPrimary => self.init_primary(&mut tasks[task_id]),
            Op::Execute => execute(&mut tasks[task_id], WORK, false),
            Op::FailingQuery => execute(&mut tasks[task_id], FAILING, true),
            Op::Disconnect => execute(&mut tasks[task_id], DISCONNECT, true),
            Op::Return => {
                let task = &mut tasks[task_id];
                let id = task
                    .held_id()
                    .ok_or_else(|| format!("task {task_id} returned without a checkout"))?;
                task.release();
                Ok(StepOutcome::ok(Some(id)))
            }
            Op::Clear { include_primary } => {
                self.pool.clear_connections(*include_primary);
                if *include_primary {
                    if let Some(primary) = self.current_primary.take() {
                        for task in tasks.iter_mut() {
                            if task.held_id() == Some(primary) {
                                task.retired = true;
                            }
                        }
                    }
                }
                Ok(StepOutcome::ok(tasks[task_id].held_id()))
            }
            Op::Restart => {
                self.connector.drop_all_sessions();
                Ok(StepOutcome::ok(tasks[task_id].held_id()))
            }
        }
    }

    fn checkout(&mut self, task: &mut TaskState, db: usize) -> Result<StepOutcome, String> {
        if task.entry.is_some() {
            return Err(format!("task {} attempted double checkout", task.id));
        }
        let database = database_name(db);
        match self.pool.get(None, Some(&database)) {
            Ok(entry) => {
                if !entry
                    .connection_string()
                    .contains(&format!("dbname={database}"))
                {
                    return Err(format!(
                        "{} checked out for {database} points at {}",
                        entry.id(),
                        entry.debug_connection_str()
                    ));
                }
                let id = entry.id();
                task.entry = Some(entry);
                Ok(StepOutcome::ok(Some(id)))
            }
            Err(AgentDbError::NoPrimary) => Ok(StepOutcome {
                result: Err("NoPrimary".to_string()),
                entry: None,
            }),
            Err(err) => Err(format!("checkout failed unexpectedly: {err}")),
        }
    }

    fn init_primary(&mut self, task: &mut TaskState) -> Result<StepOutcome, String> {
        if task.entry.is_some() {
            return Err(format!("task {} initialised while holding", task.id));
        }
        let entry = self
            .pool
            .init_connection(PRIMARY)
            .map_err(|err| format!("primary connect failed: {err}"))?;
        if !entry.is_primary() {
            return Err(format!("{} from init_connection is not primary", entry.id()));
        }
        let id = entry.id();
        self.current_primary = Some(id);
        task.entry = Some(entry);
        Ok(StepOutcome::ok(Some(id)))
    }
}

fn execute(task: &mut TaskState, query: &str, expect_failure: bool) -> Result<StepOutcome, String> {
    let task_id = task.id;
    let entry = task
        .entry
        .as_mut()
        .ok_or_else(|| format!("task {task_id} queried without a checkout"))?;
    let id = entry.id();
    match entry.execute(query) {
        Ok(_) if expect_failure => Err(format!("{id}: {query:?} unexpectedly succeeded")),
        Ok(_) => Ok(StepOutcome::ok(Some(id))),
        Err(AgentDbError::ConnectionLost(_)) => Ok(StepOutcome {
            result: Err("ConnectionLost".to_string()),
            entry: Some(id),
        }),
        Err(err) if expect_failure => {
            if entry.last_error().is_empty() {
                return Err(format!("{id}: failure left no error text"));
            }
            Ok(StepOutcome {
                result: Err(err.to_string()),
                entry: Some(id),
            })
        }
        Err(err) => Err(format!("{id}: {query:?} failed: {err}")),
    }
}
