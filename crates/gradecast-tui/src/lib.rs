// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use gradecast_app::{
    BorderOverride, ControllerCommand, Effect, ErrorBanner, FieldKind, FormController, FormField,
    FormView, Prediction, Region, RequestId, ResultCard, SubmitError, TimerToken,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Gauge, Paragraph};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

const SUBMIT_LABEL: &str = "[ Predict ]";
const LOADING_LABEL: &str = "[ Predicting... ]";
const FOCUS_MARK: &str = "›";
const CHOICE_PLACEHOLDER: &str = "choose one";

pub trait PredictRuntime {
    fn predict(&mut self, fields: &[(String, String)]) -> Result<Prediction, SubmitError>;

    /// Runs a prediction off the UI thread and reports back on `tx`. The
    /// default runs inline, which is what tests want.
    fn spawn_prediction(
        &mut self,
        request_id: RequestId,
        fields: Vec<(String, String)>,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let outcome = self.predict(&fields);
        tx.send(InternalEvent::SubmissionFinished {
            request_id,
            outcome,
        })
        .map_err(|_| anyhow::anyhow!("submission event channel closed"))?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InternalEvent {
    SubmissionFinished {
        request_id: RequestId,
        outcome: Result<Prediction, SubmitError>,
    },
    TimerFired(TimerToken),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum RowTone {
    #[default]
    Plain,
    Danger,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FormRow {
    text: String,
    tone: RowTone,
    focused: bool,
    validity: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct ViewData {
    cursor: usize,
    help_visible: bool,
}

pub fn run_app<R: PredictRuntime>(controller: &mut FormController, runtime: &mut R) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::default();
    let (internal_tx, internal_rx) = mpsc::channel();
    focus_cursor(controller, &view_data);

    let mut result = Ok(());
    loop {
        process_internal_events(controller, runtime, &internal_tx, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, controller, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(Duration::from_millis(120)).context("poll event")?;
        if has_event {
            match event::read().context("read event")? {
                Event::Key(key) => {
                    if handle_key_event(controller, runtime, &mut view_data, &internal_tx, key) {
                        break;
                    }
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn process_internal_events<R: PredictRuntime>(
    controller: &mut FormController,
    runtime: &mut R,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        handle_internal_event(controller, runtime, tx, event);
    }
}

fn handle_internal_event<R: PredictRuntime>(
    controller: &mut FormController,
    runtime: &mut R,
    tx: &Sender<InternalEvent>,
    event: InternalEvent,
) {
    let command = match event {
        InternalEvent::SubmissionFinished {
            request_id,
            outcome,
        } => ControllerCommand::SubmissionFinished {
            request_id,
            outcome,
        },
        InternalEvent::TimerFired(token) => ControllerCommand::TimerFired(token),
    };
    dispatch(controller, runtime, tx, command);
}

fn dispatch<R: PredictRuntime>(
    controller: &mut FormController,
    runtime: &mut R,
    tx: &Sender<InternalEvent>,
    command: ControllerCommand,
) {
    for event in controller.dispatch(command) {
        tracing::trace!(?event, "controller event");
    }
    apply_effects(controller, runtime, tx);
}

fn apply_effects<R: PredictRuntime>(
    controller: &mut FormController,
    runtime: &mut R,
    tx: &Sender<InternalEvent>,
) {
    for effect in controller.take_effects() {
        match effect {
            Effect::Post { request_id, fields } => {
                if let Err(error) = runtime.spawn_prediction(request_id, fields, tx.clone()) {
                    tracing::error!(error = %error, "could not start prediction request");
                    let _ = tx.send(InternalEvent::SubmissionFinished {
                        request_id,
                        outcome: Err(SubmitError::request(error.to_string())),
                    });
                }
            }
            Effect::Schedule { token, after, .. } => schedule_timer(tx, token, after),
            // Result and error panels are always on screen; the controller's
            // `scrolled_to` drives which one is highlighted.
            Effect::ScrollIntoView(_) => {}
        }
    }
}

fn schedule_timer(internal_tx: &Sender<InternalEvent>, token: TimerToken, after: Duration) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(after);
        let _ = sender.send(InternalEvent::TimerFired(token));
    });
}

fn handle_key_event<R: PredictRuntime>(
    controller: &mut FormController,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && matches!(key.code, KeyCode::Char('q') | KeyCode::Char('c')) {
        return true;
    }

    if view_data.help_visible {
        if matches!(key.code, KeyCode::Esc | KeyCode::F(1)) {
            view_data.help_visible = false;
        }
        return false;
    }

    if ctrl && key.code == KeyCode::Char('r') {
        dispatch(controller, runtime, internal_tx, ControllerCommand::Reset);
        return false;
    }

    match key.code {
        KeyCode::Esc => return true,
        KeyCode::F(1) => view_data.help_visible = true,
        KeyCode::Enter => {
            dispatch(controller, runtime, internal_tx, ControllerCommand::Submit);
        }
        KeyCode::Tab | KeyCode::Down => move_cursor(controller, view_data, 1),
        KeyCode::BackTab | KeyCode::Up => move_cursor(controller, view_data, -1),
        KeyCode::Left => cycle_current_choice(controller, runtime, view_data, internal_tx, -1),
        KeyCode::Right => cycle_current_choice(controller, runtime, view_data, internal_tx, 1),
        KeyCode::Backspace => {
            if let Some(field) = current_field(controller, view_data)
                && !matches!(field.spec.kind, FieldKind::Select { .. })
            {
                let mut value = field.value.clone();
                value.pop();
                let name = field.spec.name.to_owned();
                dispatch(
                    controller,
                    runtime,
                    internal_tx,
                    ControllerCommand::Input { field: name, value },
                );
            }
        }
        KeyCode::Char(ch) if !ctrl => {
            if let Some(field) = current_field(controller, view_data)
                && accepts_char(field.spec.kind, ch)
            {
                let mut value = field.value.clone();
                value.push(ch);
                let name = field.spec.name.to_owned();
                dispatch(
                    controller,
                    runtime,
                    internal_tx,
                    ControllerCommand::Input { field: name, value },
                );
            }
        }
        _ => {}
    }
    false
}

fn accepts_char(kind: FieldKind, ch: char) -> bool {
    match kind {
        FieldKind::Text => !ch.is_control(),
        FieldKind::Number { .. } => ch.is_ascii_digit() || ch == '-' || ch == '+',
        FieldKind::Select { .. } => false,
    }
}

fn current_field<'a>(controller: &'a FormController, view_data: &ViewData) -> Option<&'a FormField> {
    controller.view().form.fields().get(view_data.cursor)
}

fn focus_cursor(controller: &mut FormController, view_data: &ViewData) {
    if let Some(name) = current_field(controller, view_data).map(|field| field.spec.name) {
        controller.dispatch(ControllerCommand::Focus(name.to_owned()));
    }
}

fn move_cursor(controller: &mut FormController, view_data: &mut ViewData, delta: isize) {
    let count = controller.view().form.fields().len();
    if count == 0 {
        return;
    }
    if let Some(name) = current_field(controller, view_data).map(|field| field.spec.name) {
        controller.dispatch(ControllerCommand::Blur(name.to_owned()));
    }
    view_data.cursor = (view_data.cursor as isize + delta).rem_euclid(count as isize) as usize;
    focus_cursor(controller, view_data);
}

fn cycle_current_choice<R: PredictRuntime>(
    controller: &mut FormController,
    runtime: &mut R,
    view_data: &ViewData,
    internal_tx: &Sender<InternalEvent>,
    delta: isize,
) {
    let Some(field) = current_field(controller, view_data) else {
        return;
    };
    let Some(value) = field.spec.kind.cycle_choice(&field.value, delta) else {
        return;
    };
    let name = field.spec.name.to_owned();
    dispatch(
        controller,
        runtime,
        internal_tx,
        ControllerCommand::Input { field: name, value },
    );
}

fn form_rows(view: &FormView, cursor: usize) -> Vec<FormRow> {
    let label_width = view
        .form
        .fields()
        .iter()
        .map(|field| field.spec.label.chars().count())
        .max()
        .unwrap_or(0);

    view.form
        .fields()
        .iter()
        .enumerate()
        .map(|(index, field)| {
            let mark = if index == cursor { FOCUS_MARK } else { " " };
            let required = if field.spec.required { "*" } else { " " };
            let text = format!(
                "{mark} {label:<label_width$}{required} {value}",
                label = field.spec.label,
                value = display_value(field),
            );
            let tone = match field.border {
                Some(BorderOverride::Danger) => RowTone::Danger,
                Some(BorderOverride::Neutral) => RowTone::Neutral,
                None => RowTone::Plain,
            };
            FormRow {
                text,
                tone,
                focused: field.scale_percent > 100,
                validity: (!field.validity.is_empty()).then(|| field.validity.clone()),
            }
        })
        .collect()
}

fn display_value(field: &FormField) -> String {
    match field.spec.kind {
        FieldKind::Select { .. } if field.value.is_empty() => format!("‹ {CHOICE_PLACEHOLDER} ›"),
        FieldKind::Select { .. } => format!("‹ {} ›", field.value),
        FieldKind::Number { min, max } => format!("[{:<5}] ({min}-{max})", field.value),
        FieldKind::Text => format!("[{}]", field.value),
    }
}

fn submit_button_text(view: &FormView) -> &'static str {
    if view.submit.loading {
        LOADING_LABEL
    } else {
        SUBMIT_LABEL
    }
}

fn render_result_text(card: &ResultCard) -> String {
    if !card.visible {
        return "no prediction yet -- fill the form and press enter".to_owned();
    }
    [
        format!("{} {}", card.icon, card.title).trim().to_owned(),
        format!("grade: {}", card.grade),
        format!("confidence: {}", card.confidence_text),
    ]
    .join("\n")
}

fn render_error_text(banner: &ErrorBanner) -> String {
    if banner.visible {
        format!("! {}", banner.message)
    } else {
        String::new()
    }
}

fn status_text(controller: &FormController, view_data: &ViewData) -> String {
    let state = controller.ui_state().as_str().to_uppercase();
    let position = format!(
        "field {}/{}",
        view_data.cursor + 1,
        controller.view().form.fields().len()
    );
    format!("{state} | {position} | tab/↑↓ move | ←→ choose | enter predict | ctrl+r reset | f1 help | esc quit")
}

fn help_overlay_text() -> &'static str {
    "tab / down      next field\n\
     shift+tab / up  previous field\n\
     left / right    cycle choices\n\
     0-9, backspace  edit numbers\n\
     enter           submit for prediction\n\
     ctrl+r          reset results and highlights\n\
     esc / ctrl+q    quit\n\
     \n\
     esc or f1 closes this help"
}

/// Accepts `#rgb` and `#rrggbb`; anything else renders in the default style.
fn parse_css_color(raw: &str) -> Option<Color> {
    let hex = raw.trim().strip_prefix('#')?;
    if !hex.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |digits: &str| u8::from_str_radix(digits, 16).ok();
    match hex.len() {
        3 => {
            let expand = |index: usize| {
                let digit = &hex[index..=index];
                channel(&format!("{digit}{digit}"))
            };
            Some(Color::Rgb(expand(0)?, expand(1)?, expand(2)?))
        }
        6 => Some(Color::Rgb(
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
        )),
        _ => None,
    }
}

fn panel_block<'a>(title: &'a str, highlighted: bool) -> Block<'a> {
    let block = Block::default().title(title).borders(Borders::ALL);
    if highlighted {
        block.border_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        block
    }
}

fn render(frame: &mut ratatui::Frame<'_>, controller: &FormController, view_data: &ViewData) {
    let view = controller.view();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)])
        .split(frame.area());
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(layout[0]);

    render_form(frame, columns[0], view, view_data);
    render_outcome(frame, columns[1], view);

    let status = Paragraph::new(status_text(controller, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout[1]);

    if view_data.help_visible {
        let area = centered_rect(60, 50, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn render_form(frame: &mut ratatui::Frame<'_>, area: Rect, view: &FormView, view_data: &ViewData) {
    let mut lines = Vec::new();
    for row in form_rows(view, view_data.cursor) {
        let mut style = match row.tone {
            RowTone::Plain => Style::default(),
            RowTone::Danger => Style::default().fg(Color::Red),
            RowTone::Neutral => Style::default().fg(Color::Gray),
        };
        if row.focused {
            style = style.add_modifier(Modifier::BOLD);
        }
        if view.form_loading {
            style = style.add_modifier(Modifier::DIM);
        }
        lines.push(Line::from(Span::styled(row.text, style)));
        if let Some(validity) = row.validity {
            lines.push(Line::from(Span::styled(
                format!("    {validity}"),
                Style::default().fg(Color::Red),
            )));
        }
    }
    lines.push(Line::default());

    let button_style = if view.submit.disabled {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD)
    };
    lines.push(Line::from(vec![
        Span::styled(submit_button_text(view), button_style),
        Span::raw("   "),
        Span::styled("[ Reset: ctrl+r ]", Style::default().fg(Color::Gray)),
    ]));

    let title = if view.form_loading {
        "student (submitting)"
    } else {
        "student"
    };
    frame.render_widget(Paragraph::new(lines).block(panel_block(title, false)), area);
}

fn render_outcome(frame: &mut ratatui::Frame<'_>, area: Rect, view: &FormView) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),
            Constraint::Length(3),
            Constraint::Min(3),
        ])
        .split(area);

    let card = &view.result;
    let accent = parse_css_color(&card.color)
        .map(|color| Style::default().fg(color))
        .unwrap_or_default();
    let result_highlighted = view.scrolled_to == Some(Region::Result) && card.visible;
    let result = Paragraph::new(render_result_text(card))
        .style(if card.visible { accent } else { Style::default() })
        .block(panel_block("prediction", result_highlighted));
    frame.render_widget(result, rows[0]);

    let fill = if card.visible { card.fill_percent.min(100) } else { 0 };
    let gauge = Gauge::default()
        .block(Block::default().title("confidence").borders(Borders::ALL))
        .gauge_style(accent)
        .percent(fill)
        .label(if card.visible {
            card.confidence_text.clone()
        } else {
            String::new()
        });
    frame.render_widget(gauge, rows[1]);

    let error_highlighted = view.scrolled_to == Some(Region::Error) && view.error.visible;
    let error = Paragraph::new(render_error_text(&view.error))
        .style(Style::default().fg(Color::Red))
        .block(panel_block("errors", error_highlighted));
    frame.render_widget(error, rows[2]);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
