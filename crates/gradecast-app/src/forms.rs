// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{BorderOverride, FieldSpec, PREDICTION_FIELDS, SubmitError};

pub const FOCUSED_SCALE_PERCENT: u16 = 102;
pub const RESTING_SCALE_PERCENT: u16 = 100;

/// Outcome of the live numeric check run on every keystroke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeCheck {
    Empty,
    InRange(i64),
    OutOfRange { value: i64, min: i64, max: i64 },
    NotAWholeNumber,
}

impl RangeCheck {
    pub fn evaluate(raw: &str, min: i64, max: i64) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::Empty;
        }
        match trimmed.parse::<i64>() {
            Ok(value) if value < min || value > max => Self::OutOfRange { value, min, max },
            Ok(value) => Self::InRange(value),
            Err(_) => Self::NotAWholeNumber,
        }
    }

    pub fn validity_message(&self) -> Option<String> {
        match self {
            Self::Empty | Self::InRange(_) => None,
            Self::OutOfRange { min, max, .. } => {
                Some(format!("value must be between {min} and {max}"))
            }
            Self::NotAWholeNumber => Some("value must be a whole number".to_owned()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub spec: FieldSpec,
    pub value: String,
    pub border: Option<BorderOverride>,
    /// Empty when the field is valid.
    pub validity: String,
    pub scale_percent: u16,
    neutralize_on_input: bool,
}

impl FormField {
    fn new(spec: FieldSpec) -> Self {
        Self {
            spec,
            value: String::new(),
            border: None,
            validity: String::new(),
            scale_percent: RESTING_SCALE_PERCENT,
            neutralize_on_input: false,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.value.trim().is_empty()
    }

    fn apply_range_check(&mut self) {
        let Some((min, max)) = self.spec.kind.range() else {
            return;
        };
        match RangeCheck::evaluate(&self.value, min, max).validity_message() {
            Some(message) => {
                self.border = Some(BorderOverride::Danger);
                self.validity = message;
            }
            None => {
                if self.border == Some(BorderOverride::Danger) {
                    self.border = None;
                }
                self.validity.clear();
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormState {
    fields: Vec<FormField>,
}

impl Default for FormState {
    fn default() -> Self {
        Self::new(&PREDICTION_FIELDS)
    }
}

impl FormState {
    pub fn new(specs: &[FieldSpec]) -> Self {
        Self {
            fields: specs.iter().copied().map(FormField::new).collect(),
        }
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FormField> {
        self.fields.iter().find(|field| field.spec.name == name)
    }

    fn field_mut(&mut self, name: &str) -> Option<&mut FormField> {
        self.fields.iter_mut().find(|field| field.spec.name == name)
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.field(name).map(|field| field.value.as_str())
    }

    /// Stores a keystroke's worth of input. A danger border left by a failed
    /// submit turns neutral on the first input; numeric fields are then
    /// range-checked. Returns `false` for unknown fields.
    pub fn input(&mut self, name: &str, value: impl Into<String>) -> bool {
        let Some(field) = self.field_mut(name) else {
            return false;
        };
        field.value = value.into();
        if field.neutralize_on_input {
            field.neutralize_on_input = false;
            field.border = Some(BorderOverride::Neutral);
        }
        field.apply_range_check();
        true
    }

    pub fn focus(&mut self, name: &str) -> bool {
        self.set_scale(name, FOCUSED_SCALE_PERCENT)
    }

    pub fn blur(&mut self, name: &str) -> bool {
        self.set_scale(name, RESTING_SCALE_PERCENT)
    }

    fn set_scale(&mut self, name: &str, percent: u16) -> bool {
        let Some(field) = self.field_mut(name) else {
            return false;
        };
        field.scale_percent = percent;
        true
    }

    /// Submit-time check. Blank required fields are flagged and reported
    /// together; range problems do not block.
    pub fn validate_required(&mut self) -> Result<(), SubmitError> {
        let mut missing = Vec::new();
        for field in &mut self.fields {
            if field.spec.required && field.is_blank() {
                field.border = Some(BorderOverride::Danger);
                field.neutralize_on_input = true;
                missing.push(field.spec.name.to_owned());
            }
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(SubmitError::missing_fields(missing))
        }
    }

    /// Name/value pairs in declaration order, values as typed.
    pub fn serialize(&self) -> Vec<(String, String)> {
        self.fields
            .iter()
            .map(|field| (field.spec.name.to_owned(), field.value.clone()))
            .collect()
    }

    pub fn clear_overrides(&mut self) {
        for field in &mut self.fields {
            field.border = None;
            field.validity.clear();
            field.neutralize_on_input = false;
        }
    }

    pub fn has_overrides(&self) -> bool {
        self.fields
            .iter()
            .any(|field| field.border.is_some() || !field.validity.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::{FOCUSED_SCALE_PERCENT, FormState, RESTING_SCALE_PERCENT, RangeCheck};
    use crate::{BorderOverride, FieldKind, FieldSpec, SubmitError};

    const SMALL_FORM: [FieldSpec; 3] = [
        FieldSpec {
            name: "age",
            label: "Age",
            required: true,
            kind: FieldKind::Number { min: 17, max: 30 },
        },
        FieldSpec {
            name: "sex",
            label: "Sex",
            required: true,
            kind: FieldKind::Select {
                choices: &["Male", "Female"],
            },
        },
        FieldSpec {
            name: "comment",
            label: "Comment",
            required: false,
            kind: FieldKind::Text,
        },
    ];

    #[test]
    fn range_check_covers_bounds_and_garbage() {
        assert_eq!(RangeCheck::evaluate("  ", 17, 30), RangeCheck::Empty);
        assert_eq!(RangeCheck::evaluate("17", 17, 30), RangeCheck::InRange(17));
        assert_eq!(RangeCheck::evaluate(" 30 ", 17, 30), RangeCheck::InRange(30));
        assert_eq!(
            RangeCheck::evaluate("31", 17, 30),
            RangeCheck::OutOfRange {
                value: 31,
                min: 17,
                max: 30
            }
        );
        assert_eq!(
            RangeCheck::evaluate("2.5", 0, 168),
            RangeCheck::NotAWholeNumber
        );
    }

    #[test]
    fn out_of_range_input_flags_field_and_clearing_resets_it() {
        let mut form = FormState::new(&SMALL_FORM);

        assert!(form.input("age", "45"));
        let age = form.field("age").expect("age field");
        assert_eq!(age.border, Some(BorderOverride::Danger));
        assert_eq!(age.validity, "value must be between 17 and 30");

        form.input("age", "");
        let age = form.field("age").expect("age field");
        assert_eq!(age.border, None);
        assert!(age.validity.is_empty());
    }

    #[test]
    fn back_in_range_input_clears_flag() {
        let mut form = FormState::new(&SMALL_FORM);
        form.input("age", "4");
        form.input("age", "24");
        let age = form.field("age").expect("age field");
        assert_eq!(age.border, None);
        assert!(age.validity.is_empty());
    }

    #[test]
    fn missing_required_fields_are_flagged_together() {
        let mut form = FormState::new(&SMALL_FORM);
        form.input("sex", "   ");

        let error = form.validate_required().expect_err("blank fields");
        assert_eq!(
            error,
            SubmitError::Validation {
                missing: vec!["age".to_owned(), "sex".to_owned()]
            }
        );
        assert_eq!(
            form.field("age").and_then(|field| field.border),
            Some(BorderOverride::Danger)
        );
        assert_eq!(form.field("comment").and_then(|field| field.border), None);
    }

    #[test]
    fn first_input_after_failed_submit_neutralizes_border() {
        let mut form = FormState::new(&SMALL_FORM);
        let _ = form.validate_required();

        form.input("sex", "Male");
        assert_eq!(
            form.field("sex").and_then(|field| field.border),
            Some(BorderOverride::Neutral)
        );

        form.input("sex", "Female");
        assert_eq!(
            form.field("sex").and_then(|field| field.border),
            Some(BorderOverride::Neutral)
        );
    }

    #[test]
    fn range_violation_does_not_block_required_check() {
        let mut form = FormState::new(&SMALL_FORM);
        form.input("age", "99");
        form.input("sex", "Male");
        assert!(form.validate_required().is_ok());
    }

    #[test]
    fn serialize_keeps_declaration_order() {
        let mut form = FormState::new(&SMALL_FORM);
        form.input("sex", "Female");
        form.input("age", "20");
        assert_eq!(
            form.serialize(),
            vec![
                ("age".to_owned(), "20".to_owned()),
                ("sex".to_owned(), "Female".to_owned()),
                ("comment".to_owned(), String::new()),
            ]
        );
    }

    #[test]
    fn clear_overrides_is_idempotent() {
        let mut form = FormState::new(&SMALL_FORM);
        form.input("age", "99");
        let _ = form.validate_required();
        assert!(form.has_overrides());

        form.clear_overrides();
        let once = form.clone();
        form.clear_overrides();
        assert_eq!(form, once);
        assert!(!form.has_overrides());
    }

    #[test]
    fn focus_and_blur_scale_the_field() {
        let mut form = FormState::new(&SMALL_FORM);
        assert!(form.focus("comment"));
        assert_eq!(
            form.field("comment").map(|field| field.scale_percent),
            Some(FOCUSED_SCALE_PERCENT)
        );
        assert!(form.blur("comment"));
        assert_eq!(
            form.field("comment").map(|field| field.scale_percent),
            Some(RESTING_SCALE_PERCENT)
        );
        assert!(!form.focus("missing"));
    }

    #[test]
    fn unknown_field_input_is_rejected() {
        let mut form = FormState::new(&SMALL_FORM);
        assert!(!form.input("nope", "1"));
    }
}
