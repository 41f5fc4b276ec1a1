// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

/// Shown when one or more required fields are blank at submit time.
pub const AGGREGATE_VALIDATION_MESSAGE: &str = "please fill in all required fields";

/// Shown when the server reports `success: false` without a usable message.
pub const PREDICTION_FALLBACK_MESSAGE: &str = "prediction failed, please try again";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitErrorKind {
    Validation,
    Request,
    Prediction,
}

impl SubmitErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Request => "request",
            Self::Prediction => "prediction",
        }
    }
}

/// Every way a submission can end without a result card.
///
/// All variants land in the same error banner; the display text is what the
/// user sees.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error("{}", AGGREGATE_VALIDATION_MESSAGE)]
    Validation { missing: Vec<String> },

    #[error("an error occurred: {0}")]
    Request(String),

    #[error("{0}")]
    Prediction(String),
}

impl SubmitError {
    pub fn missing_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Validation {
            missing: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn request(detail: impl Into<String>) -> Self {
        Self::Request(detail.into())
    }

    /// Uses the server message when it carries text, the fallback otherwise.
    pub fn prediction(server_message: Option<String>) -> Self {
        match server_message {
            Some(message) if !message.trim().is_empty() => Self::Prediction(message),
            _ => Self::Prediction(PREDICTION_FALLBACK_MESSAGE.to_owned()),
        }
    }

    pub const fn kind(&self) -> SubmitErrorKind {
        match self {
            Self::Validation { .. } => SubmitErrorKind::Validation,
            Self::Request(_) => SubmitErrorKind::Request,
            Self::Prediction(_) => SubmitErrorKind::Prediction,
        }
    }
}
