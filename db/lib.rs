//! SQLite-backed persistence for HSPARC: Studies, Recordings, Observer
//! Sessions, Input Streams, and Input Events, plus PIN hashing and schema
//! migrations.

pub mod auth;
pub mod model;
pub mod raw;
pub mod store;
pub mod upgrade;

pub mod testutil;

pub use model::{
    CalibrationAxis, CalibrationData, Display, EventKind, InputEvent, InputStream, NewEvent,
    ObserverSession, Recording, Study, HIDE_LABEL,
};
pub use store::Store;
