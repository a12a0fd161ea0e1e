//! `rusqlite::types::{FromSql, ToSql}` wrappers for types SQLite has no
//! native representation for.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use uuid::Uuid;

/// Stores a `Uuid` as its 16-byte big-endian blob.
pub struct SqlUuid(pub Uuid);

impl FromSql for SqlUuid {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let bytes = value.as_blob()?;
        let uuid = Uuid::from_slice(bytes).map_err(|e| FromSqlError::Other(Box::new(e)))?;
        Ok(SqlUuid(uuid))
    }
}

impl ToSql for SqlUuid {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.0.as_bytes().to_vec().into())
    }
}

/// Stores a JSON-serializable value as a TEXT column.
pub struct SqlJson<T>(pub T);

impl<T: serde::de::DeserializeOwned> FromSql for SqlJson<T> {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        let v = serde_json::from_str(text).map_err(|e| FromSqlError::Other(Box::new(e)))?;
        Ok(SqlJson(v))
    }
}

impl<T: serde::Serialize> ToSql for SqlJson<T> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let text = serde_json::to_string(&self.0)
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
        Ok(ToSqlOutput::from(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn uuid_round_trips_through_sqlite() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("create table t (id blob)", []).unwrap();
        let id = Uuid::now_v7();
        conn.execute("insert into t (id) values (?)", [&SqlUuid(id)])
            .unwrap();
        let got: SqlUuid = conn
            .query_row("select id from t", [], |row| row.get(0))
            .unwrap();
        assert_eq!(got.0, id);
    }
}
