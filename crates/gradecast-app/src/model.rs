// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::Deserialize;

use crate::SubmitError;

const YES_NO: &[&str] = &["Yes", "No"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number { min: i64, max: i64 },
    Select { choices: &'static [&'static str] },
}

impl FieldKind {
    pub const fn range(self) -> Option<(i64, i64)> {
        match self {
            Self::Number { min, max } => Some((min, max)),
            Self::Text | Self::Select { .. } => None,
        }
    }

    /// Steps through select choices with the blank placeholder as the slot
    /// before the first choice. Returns `None` for non-select fields.
    pub fn cycle_choice(self, current: &str, delta: isize) -> Option<String> {
        let Self::Select { choices } = self else {
            return None;
        };
        if choices.is_empty() {
            return Some(String::new());
        }

        let slots = choices.len() as isize + 1;
        let position = choices
            .iter()
            .position(|choice| *choice == current)
            .map_or(0, |index| index as isize + 1);
        let next = (position + delta).rem_euclid(slots) as usize;
        Some(if next == 0 {
            String::new()
        } else {
            choices[next - 1].to_owned()
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub required: bool,
    pub kind: FieldKind,
}

pub const PREDICTION_FIELDS: [FieldSpec; 13] = [
    FieldSpec {
        name: "Student_Age",
        label: "Age",
        required: true,
        kind: FieldKind::Number { min: 17, max: 30 },
    },
    FieldSpec {
        name: "Sex",
        label: "Sex",
        required: true,
        kind: FieldKind::Select {
            choices: &["Male", "Female"],
        },
    },
    FieldSpec {
        name: "High_School_Type",
        label: "High school type",
        required: true,
        kind: FieldKind::Select {
            choices: &["Private", "State", "Other"],
        },
    },
    FieldSpec {
        name: "Scholarship",
        label: "Scholarship",
        required: true,
        kind: FieldKind::Select {
            choices: &["None", "25%", "50%", "75%", "100%"],
        },
    },
    FieldSpec {
        name: "Additional_Work",
        label: "Additional work",
        required: true,
        kind: FieldKind::Select { choices: YES_NO },
    },
    FieldSpec {
        name: "Sports_activity",
        label: "Sports activity",
        required: true,
        kind: FieldKind::Select { choices: YES_NO },
    },
    FieldSpec {
        name: "Transportation",
        label: "Transportation",
        required: true,
        kind: FieldKind::Select {
            choices: &["Private", "Bus"],
        },
    },
    FieldSpec {
        name: "Weekly_Study_Hours",
        label: "Weekly study hours",
        required: true,
        kind: FieldKind::Number { min: 0, max: 168 },
    },
    FieldSpec {
        name: "Attendance",
        label: "Attendance",
        required: true,
        kind: FieldKind::Select {
            choices: &["Always", "Sometimes", "Never"],
        },
    },
    FieldSpec {
        name: "Reading",
        label: "Reading",
        required: true,
        kind: FieldKind::Select { choices: YES_NO },
    },
    FieldSpec {
        name: "Notes",
        label: "Takes notes",
        required: true,
        kind: FieldKind::Select { choices: YES_NO },
    },
    FieldSpec {
        name: "Listening_in_Class",
        label: "Listens in class",
        required: true,
        kind: FieldKind::Select { choices: YES_NO },
    },
    FieldSpec {
        name: "Project_work",
        label: "Project work",
        required: true,
        kind: FieldKind::Select { choices: YES_NO },
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiState {
    Idle,
    Submitting,
    ShowingResult,
    ShowingError,
}

impl UiState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Submitting => "submitting",
            Self::ShowingResult => "showing_result",
            Self::ShowingError => "showing_error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderOverride {
    Danger,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Result,
    Error,
}

/// Raw `/predict` response body.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SubmissionResult {
    pub success: bool,
    #[serde(default)]
    pub prediction: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
}

impl SubmissionResult {
    pub fn into_outcome(self) -> Result<Prediction, SubmitError> {
        if !self.success {
            return Err(SubmitError::prediction(self.error));
        }

        let grade = self
            .prediction
            .ok_or_else(|| SubmitError::request("server response is missing the prediction"))?;
        Ok(Prediction {
            grade,
            label: self.label.unwrap_or_default(),
            icon: self.icon.unwrap_or_default(),
            color: self.color.unwrap_or_default(),
            confidence: self.confidence.unwrap_or(0.0),
        })
    }
}

/// A successful prediction, ready to render.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub grade: String,
    pub label: String,
    pub icon: String,
    pub color: String,
    pub confidence: f64,
}

impl Prediction {
    pub fn confidence_text(&self) -> String {
        format!("{}%", self.confidence)
    }

    pub fn fill_percent(&self) -> u16 {
        if self.confidence.is_nan() {
            return 0;
        }
        self.confidence.clamp(0.0, 100.0).round() as u16
    }
}

#[cfg(test)]
mod tests {
    use super::{FieldKind, PREDICTION_FIELDS, Prediction, SubmissionResult};
    use crate::{PREDICTION_FALLBACK_MESSAGE, SubmitError};

    fn prediction(confidence: f64) -> Prediction {
        Prediction {
            grade: "AA".to_owned(),
            label: "Excellent".to_owned(),
            icon: "★".to_owned(),
            color: "#0a0".to_owned(),
            confidence,
        }
    }

    #[test]
    fn prediction_catalogue_is_all_required_with_unique_names() {
        assert!(PREDICTION_FIELDS.iter().all(|spec| spec.required));
        let mut names = PREDICTION_FIELDS
            .iter()
            .map(|spec| spec.name)
            .collect::<Vec<_>>();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), PREDICTION_FIELDS.len());
    }

    #[test]
    fn cycle_choice_wraps_through_placeholder() {
        let kind = FieldKind::Select {
            choices: &["Yes", "No"],
        };
        assert_eq!(kind.cycle_choice("", 1).as_deref(), Some("Yes"));
        assert_eq!(kind.cycle_choice("Yes", 1).as_deref(), Some("No"));
        assert_eq!(kind.cycle_choice("No", 1).as_deref(), Some(""));
        assert_eq!(kind.cycle_choice("", -1).as_deref(), Some("No"));
        assert_eq!(kind.cycle_choice("garbage", 1).as_deref(), Some("Yes"));
        assert_eq!(FieldKind::Text.cycle_choice("x", 1), None);
    }

    #[test]
    fn success_payload_becomes_prediction() {
        let raw: SubmissionResult = serde_json::from_str(
            r##"{"success":true,"prediction":"A","label":"Excellent","icon":"★","color":"#0a0","confidence":87}"##,
        )
        .expect("valid payload");
        let outcome = raw.into_outcome().expect("success outcome");
        assert_eq!(outcome.grade, "A");
        assert_eq!(outcome.confidence_text(), "87%");
        assert_eq!(outcome.fill_percent(), 87);
    }

    #[test]
    fn failure_payload_becomes_prediction_error() {
        let raw: SubmissionResult =
            serde_json::from_str(r#"{"success":false,"error":"bad input"}"#).expect("valid payload");
        assert_eq!(
            raw.into_outcome(),
            Err(SubmitError::Prediction("bad input".to_owned()))
        );

        let raw: SubmissionResult =
            serde_json::from_str(r#"{"success":false}"#).expect("valid payload");
        assert_eq!(
            raw.into_outcome().expect_err("failure").to_string(),
            PREDICTION_FALLBACK_MESSAGE
        );
    }

    #[test]
    fn success_without_prediction_is_a_request_error() {
        let raw: SubmissionResult =
            serde_json::from_str(r#"{"success":true,"confidence":50}"#).expect("valid payload");
        let error = raw.into_outcome().expect_err("missing prediction");
        assert!(matches!(error, SubmitError::Request(_)));
    }

    #[test]
    fn confidence_text_keeps_fractional_digits() {
        assert_eq!(prediction(87.35).confidence_text(), "87.35%");
    }

    #[test]
    fn fill_percent_is_clamped_for_the_bar() {
        assert_eq!(prediction(140.0).fill_percent(), 100);
        assert_eq!(prediction(-3.0).fill_percent(), 0);
        assert_eq!(prediction(f64::NAN).fill_percent(), 0);
    }
}
