// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use gradecast_app::{Prediction, SubmissionResult, SubmitError};
use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

pub const PREDICT_PATH: &str = "/predict";

/// Blocking client for the prediction endpoint.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    timeout: Option<Duration>,
    http: HttpClient,
}

impl Client {
    /// `timeout: None` leaves requests unbounded.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let base_url = validate_base_url(base_url)?;

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn predict_url(&self) -> String {
        format!("{}{PREDICT_PATH}", self.base_url)
    }

    /// Any HTTP answer from the base URL counts as reachable.
    pub fn ping(&self) -> Result<()> {
        let response = self
            .http
            .get(&self.base_url)
            .send()
            .map_err(|error| anyhow::anyhow!(connection_message(&self.base_url, &error)))?;
        tracing::debug!(status = response.status().as_u16(), "prediction server reachable");
        Ok(())
    }

    /// Posts the form as `application/x-www-form-urlencoded` and maps every
    /// failure mode onto [`SubmitError`].
    pub fn predict(&self, fields: &[(String, String)]) -> Result<Prediction, SubmitError> {
        let url = self.predict_url();
        tracing::info!(url = %url, fields = fields.len(), "posting prediction request");

        let response = self
            .http
            .post(&url)
            .form(fields)
            .send()
            .map_err(|error| SubmitError::request(connection_message(&self.base_url, &error)))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|error| SubmitError::request(format!("read response body: {error}")))?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "prediction request rejected");
            return Err(SubmitError::request(clean_error_response(status, &body)));
        }

        decode_submission(&body)?.into_outcome()
    }
}

/// Checks that `raw` is an absolute http(s) URL and returns it without
/// trailing slashes.
pub fn validate_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        bail!("base URL must not be empty");
    }

    let parsed =
        Url::parse(trimmed).with_context(|| format!("base URL {trimmed:?} is not a valid URL"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!(
            "base URL {trimmed:?} must use http or https, got {:?}",
            parsed.scheme()
        );
    }
    Ok(trimmed.to_owned())
}

pub fn decode_submission(body: &str) -> Result<SubmissionResult, SubmitError> {
    serde_json::from_str::<SubmissionResult>(body).map_err(|error| {
        tracing::warn!(error = %error, "undecodable prediction response");
        if error.is_data() {
            SubmitError::request("server response did not match the expected result shape")
        } else {
            SubmitError::request("server response was not valid JSON")
        }
    })
}

fn connection_message(base_url: &str, error: &reqwest::Error) -> String {
    if error.is_timeout() {
        return format!("request to {base_url} timed out -- raise server.timeout or retry");
    }
    format!("cannot reach {base_url} -- is the prediction server running? ({error})")
}

fn clean_error_response(status: StatusCode, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(body)
        && let Some(message) = parsed.error.and_then(ErrorDetail::into_message)
        && !message.is_empty()
    {
        return format!("server error ({}): {}", status.as_u16(), message);
    }

    if body.len() < 100 && !body.contains('{') && !body.contains('<') && !body.trim().is_empty()
    {
        return format!("server error ({}): {}", status.as_u16(), body.trim());
    }

    format!("server returned {}", status.as_u16())
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorDetail {
    Text(String),
    Object { message: Option<String> },
}

impl ErrorDetail {
    fn into_message(self) -> Option<String> {
        match self {
            Self::Text(message) => Some(message),
            Self::Object { message } => message,
        }
    }
}
