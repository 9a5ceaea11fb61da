//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `rowbind_core` linkage against a
//!   real SQLite handle.
//! - Keep output deterministic for quick local sanity checks.

use rowbind_core::{execute, open_memory, query, ParamMap, Params};
use std::process::ExitCode;
use uuid::Uuid;

fn main() -> ExitCode {
    match smoke() {
        Ok(count) => {
            println!("rowbind_core version={}", rowbind_core::core_version());
            println!("rowbind_core smoke rows={count}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("rowbind smoke failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn smoke() -> Result<i64, Box<dyn std::error::Error>> {
    let conn = open_memory()?;
    execute(
        &conn,
        "CREATE TABLE fixtures (id TEXT PRIMARY KEY, label TEXT NOT NULL)",
        Params::none(),
    )?;

    let mut row = ParamMap::new();
    row.insert("Id", Uuid::new_v4());
    row.insert("Label", "smoke");
    execute(
        &conn,
        "INSERT INTO fixtures (id, label) VALUES (@Id, @Label)",
        Params::map(row),
    )?;

    let mut counts = query::<i64>(&conn, "SELECT COUNT(*) FROM fixtures", Params::none())?;
    let count = counts.next().transpose()?.unwrap_or_default();
    Ok(count)
}
