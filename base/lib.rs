// HSPARC base: small ambient utilities shared by the db and capture/analysis
// crates — error kinds, clocks, graceful shutdown signaling, tracing setup,
// and password/file cryptography primitives.

pub mod clock;
pub mod crypto;
pub mod error;
pub mod shutdown;
pub mod tracing_setup;

pub use clock::{Clocks, RealClocks, SimulatedClocks, TimerGuard};
pub use error::{Error, ErrorKind, ResultExt};
