//! Live device capture: calibration, raw event decoding, and the
//! multi-device pipeline that drives them for the life of a recording.

pub mod calibration;
pub mod device_reader;
pub mod pipeline;

pub use calibration::{CalibrationSession, MIN_AXIS_SAMPLES};
pub use device_reader::{CodeNamer, DeviceReader, RawEvent, RawEventSource, RawKind, ReaderState};
pub use pipeline::{CapturePipeline, DeviceAssignment};
