//! Schema migrations.
//!
//! Each step is a `vN_to_vN+1::run` function that mutates an open
//! transaction additively — new tables or `alter table add column`, never a
//! drop. The loader applies any missing steps on open; defaults are always
//! non-destructive.

use base::{err, Error};
use rusqlite::{params, Transaction};

mod v0_to_v1;

const UPGRADE_NOTES: &str = concat!("upgraded using hsparc-db ", env!("CARGO_PKG_VERSION"));

/// Current schema version this binary expects. Bump alongside adding a new
/// `vN_to_vN+1` module and registering it in [`run`].
pub const EXPECTED_SCHEMA_VERSION: i32 = 1;

fn schema_version(conn: &rusqlite::Connection) -> Result<i32, Error> {
    let has_version_table: bool = conn
        .query_row(
            "select count(*) from sqlite_master where type = 'table' and name = 'version'",
            [],
            |row| row.get::<_, i64>(0),
        )
        .map_err(|e| err!(Internal, "failed to check for version table: {e}"))?
        > 0;
    if !has_version_table {
        return Ok(0);
    }
    conn.query_row("select coalesce(max(id), 0) from version", [], |row| {
        row.get(0)
    })
    .map_err(|e| err!(Internal, "failed to read schema version: {e}"))
}

/// Brings `conn`'s schema up to [`EXPECTED_SCHEMA_VERSION`], running one
/// transaction per version step so a crash mid-upgrade never leaves the
/// database on a fractional version.
pub fn run(conn: &mut rusqlite::Connection) -> Result<(), Error> {
    let upgraders: [fn(&Transaction) -> Result<(), Error>; 1] = [v0_to_v1::run];
    assert_eq!(upgraders.len() as i32, EXPECTED_SCHEMA_VERSION);

    let old_ver = schema_version(conn)?;
    if old_ver > EXPECTED_SCHEMA_VERSION {
        return Err(err!(
            Internal,
            "database is at schema version {old_ver}, newer than this binary's {EXPECTED_SCHEMA_VERSION}"
        ));
    }
    for ver in old_ver..EXPECTED_SCHEMA_VERSION {
        let tx = conn
            .transaction()
            .map_err(|e| err!(Internal, "failed to start migration transaction: {e}"))?;
        upgraders[ver as usize](&tx)?;
        tx.execute(
            "insert into version (id, unix_time, notes) values (?, cast(strftime('%s','now') as int), ?)",
            params![ver + 1, UPGRADE_NOTES],
        )
        .map_err(|e| err!(Internal, "failed to record schema version {}: {e}", ver + 1))?;
        tx.commit()
            .map_err(|e| err!(Internal, "failed to commit migration to version {}: {e}", ver + 1))?;
    }
    Ok(())
}
