//! The persisted data model: Study, Recording, ObserverSession, InputStream,
//! InputEvent, and the small value types they're built from.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// The literal construct-mapping label meaning "exclude from plots and
/// exports". Only used at the serialization boundary; everywhere else in
/// the crate this is represented by `Display::Hidden`.
pub const HIDE_LABEL: &str = "__HIDE__";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Init,
    Axis,
    Button,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Init => "init",
            EventKind::Axis => "axis",
            EventKind::Button => "button",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "init" => Some(EventKind::Init),
            "axis" => Some(EventKind::Axis),
            "button" => Some(EventKind::Button),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Study {
    pub id: Uuid,
    pub label: String,
    pub created_utc: String,
    pub security_hash: String,
    pub is_locked: bool,
    pub observer_instructions_text: Option<String>,
    pub observer_instructions_image_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Recording {
    pub id: Uuid,
    pub study_id: Uuid,
    pub created_utc: String,
    pub video_path: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ObserverSession {
    pub id: Uuid,
    pub recording_id: Uuid,
    pub created_utc: String,
    pub label: Option<String>,
    pub recognition_check_required: bool,
    pub recognition_check_passed: Option<bool>,
    pub recognition_check_timestamp: Option<String>,
}

/// Per-axis calibration learned by an offline calibration pass: the extremes
/// seen, their midpoint, and a researcher-facing label.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CalibrationAxis {
    pub min: i32,
    pub max: i32,
    pub center: i32,
}

impl CalibrationAxis {
    pub fn new(min: i32, max: i32) -> Self {
        CalibrationAxis {
            min,
            max,
            center: (min + max) / 2,
        }
    }

    /// `2*(raw-min)/(max-min) - 1`, clamped to `[-1, 1]`.
    pub fn normalize(&self, raw: i32) -> f64 {
        if self.max == self.min {
            return 0.0;
        }
        let n = (raw - self.min) as f64 / (self.max - self.min) as f64;
        (2.0 * n - 1.0).clamp(-1.0, 1.0)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalibrationData {
    pub axes: BTreeMap<String, CalibrationAxis>,
    pub buttons: BTreeMap<String, String>,
}

impl CalibrationData {
    pub fn allowed_inputs(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .axes
            .keys()
            .chain(self.buttons.keys())
            .cloned()
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    pub fn construct_mapping(&self) -> BTreeMap<String, String> {
        self.buttons
            .iter()
            .filter(|(_, label)| !label.is_empty())
            .map(|(code, label)| (code.clone(), label.clone()))
            .collect()
    }
}

/// How a code should be rendered in plots and exports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Display {
    Raw,
    Labeled(String),
    Hidden,
}

#[derive(Debug, Clone)]
pub struct InputStream {
    pub id: Uuid,
    pub session_id: Uuid,
    pub device_name: String,
    pub profile_id: Option<String>,
    pub alias: Option<String>,
    pub construct_mapping: BTreeMap<String, String>,
    pub calibration_data: Option<CalibrationData>,
    pub allowed_inputs: Option<Vec<String>>,
}

impl InputStream {
    pub fn display_for(&self, code: &str) -> Display {
        match self.construct_mapping.get(code) {
            None => Display::Raw,
            Some(l) if l == HIDE_LABEL => Display::Hidden,
            Some(l) if l.is_empty() => Display::Raw,
            Some(l) => Display::Labeled(l.clone()),
        }
    }

    /// The export/plot "participant" label: the researcher-entered alias,
    /// falling back to the raw device name when no alias was set.
    pub fn participant_label(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.device_name)
    }

    pub fn is_allowed(&self, code: &str) -> bool {
        match &self.allowed_inputs {
            None => true,
            Some(allow) => allow.iter().any(|c| c == code),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InputEvent {
    pub id: i64,
    pub recording_id: Uuid,
    pub session_id: Uuid,
    pub stream_id: Uuid,
    pub t_ms: i64,
    pub kind: EventKind,
    pub code: String,
    pub value: Option<i32>,
    pub is_press: Option<bool>,
}

/// A not-yet-persisted event, as produced by the capture pipeline.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub recording_id: Uuid,
    pub session_id: Uuid,
    pub stream_id: Uuid,
    pub t_ms: i64,
    pub kind: EventKind,
    pub code: String,
    pub value: Option<i32>,
    pub is_press: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_extremes_and_center() {
        let axis = CalibrationAxis::new(0, 200);
        assert_eq!(axis.normalize(0), -1.0);
        assert_eq!(axis.normalize(200), 1.0);
        assert_eq!(axis.normalize(100), 0.0);
    }

    #[test]
    fn display_for_resolves_hide_and_empty_labels() {
        let mut mapping = BTreeMap::new();
        mapping.insert("BTN_A".to_string(), HIDE_LABEL.to_string());
        mapping.insert("ABS_X".to_string(), "steering".to_string());
        mapping.insert("ABS_Y".to_string(), String::new());
        let stream = InputStream {
            id: Uuid::nil(),
            session_id: Uuid::nil(),
            device_name: "pad0".into(),
            profile_id: None,
            alias: None,
            construct_mapping: mapping,
            calibration_data: None,
            allowed_inputs: None,
        };
        assert_eq!(stream.display_for("BTN_A"), Display::Hidden);
        assert_eq!(
            stream.display_for("ABS_X"),
            Display::Labeled("steering".into())
        );
        assert_eq!(stream.display_for("ABS_Y"), Display::Raw);
        assert_eq!(stream.display_for("ABS_Z"), Display::Raw);
    }
}
