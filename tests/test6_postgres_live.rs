//! Runs against a real server when `JOBAGENT_TEST_DATABASE_URL` holds a
//! key/value connection string, e.g.
//! `host=localhost user=postgres password=postgres dbname=postgres`.

use jobagent_db::prelude::*;

fn live_conn_str() -> Option<String> {
    std::env::var("JOBAGENT_TEST_DATABASE_URL")
        .ok()
        .filter(|value| !value.trim().is_empty())
}

#[test]
fn test6_postgres_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let Some(conn_str) = live_conn_str() else {
        eprintln!("JOBAGENT_TEST_DATABASE_URL not set; skipping live PostgreSQL test");
        return Ok(());
    };

    let pool = ConnectionPool::postgres()?;
    let mut service = pool.init_connection(&conn_str)?;
    assert!(service.backend_minimum_version(9, 1));

    let mut entry = pool.get(None, None)?;
    assert_eq!(
        entry.execute_void(
            "CREATE TEMP TABLE agent_step (id int, name text, note text); \
             INSERT INTO agent_step VALUES (1, 'first', NULL), (2, 'it''s', 'x')"
        ),
        CommandStatus::CommandOk
    );

    let mut rows = ScopedResult::from(entry.execute("SELECT id, name, note FROM agent_step ORDER BY id")?);
    assert_eq!(rows.row_count(), 2);
    assert_eq!(rows.get_string("name"), "first");
    assert_eq!(rows.get_opt("note"), None);
    rows.move_next();
    assert_eq!(rows.get_string(1usize), "it's");

    let quoted = entry.qt_db_string(r"back\slash 'quote'");
    assert_eq!(
        entry.execute_scalar(&format!("SELECT {quoted}")),
        r"back\slash 'quote'"
    );

    let updated = entry.execute("UPDATE agent_step SET note = 'y'")?;
    assert_eq!(updated.rows_affected(), 2);

    assert!(entry.execute("SELECT * FROM no_such_table").is_err());
    assert!(entry.last_error().contains("no_such_table"));
    assert_eq!(entry.execute_scalar("SELECT 1"), "1");

    drop(entry);
    assert_eq!(service.execute_scalar("SELECT 'alive'"), "alive");
    drop(service);
    pool.shutdown();
    Ok(())
}

#[test]
fn test6_postgres_unreachable_host() -> Result<(), Box<dyn std::error::Error>> {
    if live_conn_str().is_none() {
        return Ok(());
    }
    let pool = ConnectionPool::postgres()?;
    let result = pool.get(Some("host=127.0.0.1 port=1 connect_timeout=2"), None);
    assert!(matches!(result, Err(AgentDbError::Connection(_))));
    assert!(!pool.last_error().is_empty());
    Ok(())
}

#[test]
fn test6_postgres_libpq_only_options() -> Result<(), Box<dyn std::error::Error>> {
    let Some(conn_str) = live_conn_str() else {
        return Ok(());
    };
    let pool = ConnectionPool::postgres()?;
    let descriptor = format!("{conn_str} client_encoding=UTF8 sslcert=/nonexistent/client.pem");
    let mut entry = pool.get(Some(&descriptor), None)?;
    assert_eq!(entry.execute_scalar("SELECT 1"), "1");
    assert!(entry.last_command_ok());
    Ok(())
}
