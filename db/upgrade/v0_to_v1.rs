//! Creates the initial schema from nothing.

use base::{err, Error};
use rusqlite::Transaction;

const SCHEMA: &str = include_str!("../schema.sql");

pub fn run(tx: &Transaction) -> Result<(), Error> {
    tx.execute_batch(SCHEMA)
        .map_err(|e| err!(Internal, "failed to create initial schema: {e}"))
}
