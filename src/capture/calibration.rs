//! Offline per-axis/per-button calibration, run against a single device
//! before a recording starts. The prompt-for-both-extremes UI lives in the
//! windowed presentation layer; this module only owns the sample
//! accumulation and the resulting normalization function.

use crate::capture::device_reader::{RawEvent, RawKind};
use db::CalibrationAxis;
use db::CalibrationData;

/// Minimum number of raw samples an axis must see before calibration will
/// accept a `min`/`max` pair for it.
pub const MIN_AXIS_SAMPLES: usize = 40;

#[derive(Debug, Default, Clone)]
struct AxisAccumulator {
    min: i32,
    max: i32,
    count: usize,
}

impl AxisAccumulator {
    fn observe(&mut self, raw: i32) {
        if self.count == 0 {
            self.min = raw;
            self.max = raw;
        } else {
            self.min = self.min.min(raw);
            self.max = self.max.max(raw);
        }
        self.count += 1;
    }
}

/// Accumulates raw device events into a [`db::CalibrationData`]. One
/// `CalibrationSession` is used per device, offline, before a recording
/// starts; its output is handed to `Store::create_stream` and is immutable
/// for the life of the resulting stream. Re-calibrating a device creates a
/// new Stream rather than mutating an existing one.
#[derive(Debug, Default)]
pub struct CalibrationSession {
    axes: std::collections::BTreeMap<String, AxisAccumulator>,
    axis_labels: std::collections::BTreeMap<String, String>,
    buttons: std::collections::BTreeMap<String, String>,
}

impl CalibrationSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associates a researcher-chosen construct label with an axis or
    /// button code. An empty label means "use the raw code"; the literal
    /// label `db::HIDE_LABEL` excludes the code from plots and exports.
    pub fn set_label(&mut self, code: &str, label: impl Into<String>) {
        self.axis_labels.insert(code.to_string(), label.into());
    }

    /// Feeds one raw device event into the session. Axis events accumulate
    /// into the running min/max for that code; the first button press
    /// records the button as calibrated.
    pub fn observe(&mut self, event: &RawEvent, code: &str) {
        match event.kind {
            RawKind::Abs => {
                self.axes.entry(code.to_string()).or_default().observe(event.value);
            }
            RawKind::Key if event.value == 1 => {
                self.buttons
                    .entry(code.to_string())
                    .or_insert_with(|| self.axis_labels.get(code).cloned().unwrap_or_default());
            }
            _ => {}
        }
    }

    /// Number of raw samples seen so far for `code`, so a caller (the
    /// calibration CLI/UI) can tell the participant when an axis has seen
    /// enough motion.
    pub fn sample_count(&self, code: &str) -> usize {
        self.axes.get(code).map(|a| a.count).unwrap_or(0)
    }

    /// Finalizes the session into persistable calibration data. Axes with
    /// fewer than [`MIN_AXIS_SAMPLES`] samples, or whose observed extremes
    /// never separated (min == max, so normalization would be meaningless),
    /// are dropped rather than persisted with a degenerate range.
    pub fn finish(self) -> CalibrationData {
        let mut data = CalibrationData::default();
        for (code, acc) in self.axes {
            if acc.count < MIN_AXIS_SAMPLES || acc.min == acc.max {
                continue;
            }
            data.axes.insert(code, CalibrationAxis::new(acc.min, acc.max));
        }
        for (code, label) in self.buttons {
            data.buttons.insert(code, label);
        }
        for (code, label) in self.axis_labels {
            if data.axes.contains_key(&code) && !data.buttons.contains_key(&code) {
                // Axis labels live in `buttons`' construct-mapping role too:
                // `CalibrationData::construct_mapping` only reads `buttons`,
                // so an axis-only label is folded in there as well.
                data.buttons.insert(code, label);
            }
        }
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abs_event(value: i32) -> RawEvent {
        RawEvent {
            kind: RawKind::Abs,
            code: 0,
            value,
        }
    }

    #[test]
    fn axis_needs_minimum_samples() {
        let mut cal = CalibrationSession::new();
        for v in 0..MIN_AXIS_SAMPLES - 1 {
            cal.observe(&abs_event(v as i32), "ABS_X");
        }
        let data = cal.finish();
        assert!(!data.axes.contains_key("ABS_X"));
    }

    #[test]
    fn axis_records_min_max_center() {
        let mut cal = CalibrationSession::new();
        for v in [0, 255, 128].into_iter().chain(3..MIN_AXIS_SAMPLES as i32) {
            cal.observe(&abs_event(v), "ABS_X");
        }
        let data = cal.finish();
        let axis = data.axes.get("ABS_X").unwrap();
        assert_eq!(axis.min, 0);
        assert_eq!(axis.max, 255);
        assert_eq!(axis.center, 127);
    }

    #[test]
    fn button_calibrated_on_first_press() {
        let mut cal = CalibrationSession::new();
        cal.set_label("BTN_SOUTH", "trigger");
        cal.observe(
            &RawEvent {
                kind: RawKind::Key,
                code: 0,
                value: 1,
            },
            "BTN_SOUTH",
        );
        let data = cal.finish();
        assert_eq!(data.buttons.get("BTN_SOUTH").unwrap(), "trigger");
    }

    #[test]
    fn allowed_inputs_covers_axes_and_buttons() {
        let mut cal = CalibrationSession::new();
        for v in 0..MIN_AXIS_SAMPLES {
            cal.observe(&abs_event(v as i32), "ABS_X");
        }
        cal.observe(
            &RawEvent {
                kind: RawKind::Key,
                code: 0,
                value: 1,
            },
            "BTN_SOUTH",
        );
        let data = cal.finish();
        assert_eq!(data.allowed_inputs(), vec!["ABS_X", "BTN_SOUTH"]);
    }
}
