// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::time::Duration;

use crate::{FormState, Prediction, Region, RequestId, SubmitError, TimerToken, UiState};

pub const DEFAULT_ERROR_DISMISS: Duration = Duration::from_secs(5);
pub const DEFAULT_CONFIDENCE_FILL_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerTimings {
    pub error_dismiss: Duration,
    pub confidence_fill_delay: Duration,
}

impl Default for ControllerTimings {
    fn default() -> Self {
        Self {
            error_dismiss: DEFAULT_ERROR_DISMISS,
            confidence_fill_delay: DEFAULT_CONFIDENCE_FILL_DELAY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubmitControl {
    pub disabled: bool,
    /// When set the loading indicator replaces the button label.
    pub loading: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResultCard {
    pub visible: bool,
    pub icon: String,
    pub title: String,
    pub grade: String,
    pub color: String,
    pub fill_percent: u16,
    pub confidence_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorBanner {
    pub visible: bool,
    pub message: String,
}

/// Everything a front end needs to draw the page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormView {
    pub form: FormState,
    pub submit: SubmitControl,
    pub form_loading: bool,
    pub result: ResultCard,
    pub error: ErrorBanner,
    pub scrolled_to: Option<Region>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    DismissError,
    FillConfidence { percent: u16 },
}

/// Work the host performs on the controller's behalf. Outcomes come back as
/// [`ControllerCommand::SubmissionFinished`] and [`ControllerCommand::TimerFired`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Post {
        request_id: RequestId,
        fields: Vec<(String, String)>,
    },
    Schedule {
        token: TimerToken,
        kind: TimerKind,
        after: Duration,
    },
    ScrollIntoView(Region),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControllerCommand {
    Input { field: String, value: String },
    Focus(String),
    Blur(String),
    Submit,
    SubmissionFinished {
        request_id: RequestId,
        outcome: Result<Prediction, SubmitError>,
    },
    TimerFired(TimerToken),
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    FieldChanged { field: String, validity: String },
    FieldFocused(String),
    FieldBlurred(String),
    UnknownField(String),
    SubmissionStarted(RequestId),
    SubmissionIgnored,
    ResultShown { grade: String },
    ErrorShown(SubmitError),
    ErrorDismissed,
    ConfidenceFilled(u16),
    StaleTimerIgnored(TimerToken),
    StaleResponseIgnored(RequestId),
    Reset,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormController {
    view: FormView,
    ui_state: UiState,
    timings: ControllerTimings,
    in_flight: Option<RequestId>,
    last_request: RequestId,
    last_token: TimerToken,
    dismiss_timer: Option<TimerToken>,
    fill_timer: Option<(TimerToken, u16)>,
    effects: Vec<Effect>,
}

impl Default for FormController {
    fn default() -> Self {
        Self::new(FormState::default(), ControllerTimings::default())
    }
}

impl FormController {
    pub fn new(form: FormState, timings: ControllerTimings) -> Self {
        Self {
            view: FormView {
                form,
                ..FormView::default()
            },
            ui_state: UiState::Idle,
            timings,
            in_flight: None,
            last_request: RequestId::new(0),
            last_token: TimerToken::new(0),
            dismiss_timer: None,
            fill_timer: None,
            effects: Vec::new(),
        }
    }

    pub fn view(&self) -> &FormView {
        &self.view
    }

    pub fn ui_state(&self) -> UiState {
        self.ui_state
    }

    pub fn in_flight(&self) -> Option<RequestId> {
        self.in_flight
    }

    /// Drains the effects queued by earlier dispatches, oldest first.
    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    pub fn dispatch(&mut self, command: ControllerCommand) -> Vec<ControllerEvent> {
        match command {
            ControllerCommand::Input { field, value } => {
                if !self.view.form.input(&field, value) {
                    tracing::warn!(field = %field, "input for unknown field");
                    return vec![ControllerEvent::UnknownField(field)];
                }
                let validity = self
                    .view
                    .form
                    .field(&field)
                    .map(|state| state.validity.clone())
                    .unwrap_or_default();
                self.settle_outcome();
                vec![ControllerEvent::FieldChanged { field, validity }]
            }
            ControllerCommand::Focus(field) => {
                if self.view.form.focus(&field) {
                    self.settle_outcome();
                    vec![ControllerEvent::FieldFocused(field)]
                } else {
                    vec![ControllerEvent::UnknownField(field)]
                }
            }
            ControllerCommand::Blur(field) => {
                if self.view.form.blur(&field) {
                    self.settle_outcome();
                    vec![ControllerEvent::FieldBlurred(field)]
                } else {
                    vec![ControllerEvent::UnknownField(field)]
                }
            }
            ControllerCommand::Submit => self.submit(),
            ControllerCommand::SubmissionFinished {
                request_id,
                outcome,
            } => self.finish_submission(request_id, outcome),
            ControllerCommand::TimerFired(token) => self.fire_timer(token),
            ControllerCommand::Reset => self.reset(),
        }
    }

    fn submit(&mut self) -> Vec<ControllerEvent> {
        if self.in_flight.is_some() || self.view.submit.disabled {
            tracing::debug!("submit ignored while a request is in flight");
            return vec![ControllerEvent::SubmissionIgnored];
        }

        if let Err(error) = self.view.form.validate_required() {
            tracing::info!(error = ?error, "submission blocked by validation");
            return vec![self.show_error(error)];
        }

        self.hide_result();
        self.hide_error();

        self.view.submit = SubmitControl {
            disabled: true,
            loading: true,
        };
        self.view.form_loading = true;
        self.ui_state = UiState::Submitting;

        self.last_request = self.last_request.next();
        let request_id = self.last_request;
        self.in_flight = Some(request_id);
        self.effects.push(Effect::Post {
            request_id,
            fields: self.view.form.serialize(),
        });
        tracing::info!(request_id = request_id.get(), "submission started");
        vec![ControllerEvent::SubmissionStarted(request_id)]
    }

    fn finish_submission(
        &mut self,
        request_id: RequestId,
        outcome: Result<Prediction, SubmitError>,
    ) -> Vec<ControllerEvent> {
        if self.in_flight != Some(request_id) {
            tracing::debug!(
                request_id = request_id.get(),
                "dropping response for a request that is no longer tracked"
            );
            return vec![ControllerEvent::StaleResponseIgnored(request_id)];
        }

        self.in_flight = None;
        self.end_loading();

        match outcome {
            Ok(prediction) => vec![self.show_result(&prediction)],
            Err(error) => vec![self.show_error(error)],
        }
    }

    /// The next field interaction ends an outcome's lifecycle. The card or
    /// banner stays on screen until reset or auto-dismiss.
    fn settle_outcome(&mut self) {
        if matches!(
            self.ui_state,
            UiState::ShowingResult | UiState::ShowingError
        ) {
            tracing::debug!(from = self.ui_state.as_str(), "field interaction returns to idle");
            self.ui_state = UiState::Idle;
        }
    }

    fn end_loading(&mut self) {
        self.view.submit = SubmitControl::default();
        self.view.form_loading = false;
    }

    fn show_result(&mut self, prediction: &Prediction) -> ControllerEvent {
        self.hide_error();

        let card = &mut self.view.result;
        card.icon = prediction.icon.clone();
        card.title = prediction.label.clone();
        card.grade = prediction.grade.clone();
        card.color = prediction.color.clone();
        card.confidence_text = prediction.confidence_text();
        card.fill_percent = 0;
        card.visible = true;

        let percent = prediction.fill_percent();
        let token = self.next_token();
        self.fill_timer = Some((token, percent));
        self.effects.push(Effect::Schedule {
            token,
            kind: TimerKind::FillConfidence { percent },
            after: self.timings.confidence_fill_delay,
        });
        self.scroll_to(Region::Result);

        self.ui_state = UiState::ShowingResult;
        tracing::info!(grade = %prediction.grade, confidence = prediction.confidence, "result shown");
        ControllerEvent::ResultShown {
            grade: prediction.grade.clone(),
        }
    }

    fn show_error(&mut self, error: SubmitError) -> ControllerEvent {
        self.hide_result();

        self.view.error = ErrorBanner {
            visible: true,
            message: error.to_string(),
        };
        let token = self.next_token();
        self.dismiss_timer = Some(token);
        self.effects.push(Effect::Schedule {
            token,
            kind: TimerKind::DismissError,
            after: self.timings.error_dismiss,
        });
        self.scroll_to(Region::Error);

        self.ui_state = UiState::ShowingError;
        tracing::warn!(kind = error.kind().as_str(), message = %error, "error shown");
        ControllerEvent::ErrorShown(error)
    }

    fn fire_timer(&mut self, token: TimerToken) -> Vec<ControllerEvent> {
        if self.dismiss_timer == Some(token) {
            self.hide_error();
            if self.ui_state == UiState::ShowingError {
                self.ui_state = UiState::Idle;
            }
            return vec![ControllerEvent::ErrorDismissed];
        }

        if let Some((fill_token, percent)) = self.fill_timer
            && fill_token == token
        {
            self.fill_timer = None;
            self.view.result.fill_percent = percent;
            return vec![ControllerEvent::ConfidenceFilled(percent)];
        }

        tracing::trace!(token = token.get(), "superseded timer fired");
        vec![ControllerEvent::StaleTimerIgnored(token)]
    }

    fn reset(&mut self) -> Vec<ControllerEvent> {
        self.hide_result();
        self.hide_error();
        self.view.form.clear_overrides();
        self.view.scrolled_to = None;

        if let Some(request_id) = self.in_flight.take() {
            tracing::info!(
                request_id = request_id.get(),
                "reset while submitting; response will be ignored"
            );
            self.end_loading();
        }

        self.ui_state = UiState::Idle;
        vec![ControllerEvent::Reset]
    }

    fn hide_result(&mut self) {
        self.view.result.visible = false;
        self.fill_timer = None;
    }

    fn hide_error(&mut self) {
        self.view.error.visible = false;
        self.dismiss_timer = None;
    }

    fn scroll_to(&mut self, region: Region) {
        self.view.scrolled_to = Some(region);
        self.effects.push(Effect::ScrollIntoView(region));
    }

    fn next_token(&mut self) -> TimerToken {
        self.last_token = self.last_token.next();
        self.last_token
    }
}
