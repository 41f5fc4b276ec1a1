// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use gradecast_app::{ControllerCommand, FieldKind, FieldSpec, FormController, PREDICTION_FIELDS};
use std::io::Read;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tiny_http::{Header, Response, Server};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// A base URL nothing listens on.
pub const UNREACHABLE_BASE_URL: &str = "http://127.0.0.1:1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CannedResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
    pub delay: Duration,
}

impl CannedResponse {
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: "text/html; charset=utf-8",
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    pub fn success(grade: &str, label: &str, icon: &str, color: &str, confidence: f64) -> Self {
        Self::json(
            200,
            serde_json::json!({
                "success": true,
                "prediction": grade,
                "label": label,
                "icon": icon,
                "color": color,
                "confidence": confidence,
            })
            .to_string(),
        )
    }

    pub fn failure(status: u16, message: &str) -> Self {
        Self::json(
            status,
            serde_json::json!({ "success": false, "error": message }).to_string(),
        )
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub url: String,
    pub content_type: Option<String>,
    pub body: String,
}

impl RecordedRequest {
    pub fn form_pairs(&self) -> Vec<(String, String)> {
        url::form_urlencoded::parse(self.body.as_bytes())
            .map(|(name, value)| (name.into_owned(), value.into_owned()))
            .collect()
    }
}

/// Local stand-in for the prediction server. Answers one request per canned
/// response, in order, then stops.
pub struct MockEndpoint {
    base_url: String,
    handle: JoinHandle<Result<Vec<RecordedRequest>>>,
}

impl MockEndpoint {
    pub fn serve(responses: Vec<CannedResponse>) -> Result<Self> {
        let server =
            Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
        let base_url = format!("http://{}", server.server_addr());

        let handle = thread::spawn(move || {
            let mut recorded = Vec::with_capacity(responses.len());
            for canned in responses {
                let Some(mut request) = server
                    .recv_timeout(RECV_TIMEOUT)
                    .context("receive mock request")?
                else {
                    bail!("no request arrived within {RECV_TIMEOUT:?}");
                };

                let mut body = String::new();
                request
                    .as_reader()
                    .read_to_string(&mut body)
                    .context("read mock request body")?;
                let content_type = request
                    .headers()
                    .iter()
                    .find(|header| header.field.equiv("Content-Type"))
                    .map(|header| header.value.as_str().to_owned());
                recorded.push(RecordedRequest {
                    method: request.method().to_string(),
                    url: request.url().to_owned(),
                    content_type,
                    body,
                });

                if !canned.delay.is_zero() {
                    thread::sleep(canned.delay);
                }
                let header = Header::from_bytes("Content-Type", canned.content_type)
                    .map_err(|()| anyhow!("invalid content type {:?}", canned.content_type))?;
                let response = Response::from_string(canned.body)
                    .with_status_code(canned.status)
                    .with_header(header);
                request.respond(response).context("send mock response")?;
            }
            Ok(recorded)
        });

        Ok(Self { base_url, handle })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Waits for every canned response to be served and returns what the
    /// client sent.
    pub fn finish(self) -> Result<Vec<RecordedRequest>> {
        self.handle
            .join()
            .map_err(|_| anyhow!("mock server thread panicked"))?
    }
}

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn int_range_i64(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        let span = max.abs_diff(min).saturating_add(1);
        min.saturating_add((self.next_u64() % span) as i64)
    }
}

/// Seeded generator of valid form answers.
#[derive(Debug, Clone)]
pub struct StudentFaker {
    rng: DeterministicRng,
}

impl StudentFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
        }
    }

    pub fn value_for(&mut self, spec: &FieldSpec) -> String {
        match spec.kind {
            FieldKind::Number { min, max } => self.rng.int_range_i64(min, max).to_string(),
            FieldKind::Select { choices } if !choices.is_empty() => {
                choices[self.rng.int_n(choices.len())].to_owned()
            }
            FieldKind::Select { .. } => String::new(),
            FieldKind::Text => format!("answer-{}", self.rng.int_n(1000)),
        }
    }

    pub fn answers(&mut self, specs: &[FieldSpec]) -> Vec<(String, String)> {
        specs
            .iter()
            .map(|spec| (spec.name.to_owned(), self.value_for(spec)))
            .collect()
    }

    pub fn prediction_answers(&mut self) -> Vec<(String, String)> {
        self.answers(&PREDICTION_FIELDS)
    }

    /// Types every answer into the controller as user input.
    pub fn fill(&mut self, controller: &mut FormController) {
        let specs = controller
            .view()
            .form
            .fields()
            .iter()
            .map(|field| field.spec)
            .collect::<Vec<_>>();
        for (field, value) in self.answers(&specs) {
            controller.dispatch(ControllerCommand::Input { field, value });
        }
    }
}

pub fn filled_controller(seed: u64) -> FormController {
    let mut controller = FormController::default();
    StudentFaker::new(seed).fill(&mut controller);
    controller
}
