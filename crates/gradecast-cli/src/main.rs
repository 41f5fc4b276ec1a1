// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod runtime;

use anyhow::{Context, Result, anyhow, bail};
use config::Config;
use gradecast_app::{
    ControllerCommand, ControllerEvent, Effect, FormController, FormState, FormView,
};
use gradecast_client::Client;
use runtime::ClientRuntime;
use std::env;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(error) => {
            eprintln!("{error:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(ExitCode::SUCCESS);
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(ExitCode::SUCCESS);
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(ExitCode::SUCCESS);
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `gradecast --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;

    init_logging(config.log_level(), options.headless || options.check_only)?;

    let client = match &options.endpoint {
        Some(endpoint) => Client::new(endpoint, config.server_timeout()?)
            .with_context(|| format!("invalid --endpoint {endpoint:?}"))?,
        None => Client::new(config.base_url(), config.server_timeout()?).with_context(|| {
            format!(
                "invalid [server] config in {}; fix base_url/timeout values",
                options.config_path.display()
            )
        })?,
    };
    let timings = config.timings()?;
    tracing::info!(base_url = %client.base_url(), "starting gradecast");

    if options.check_only {
        client.ping()?;
        println!("ok: {} is reachable", client.base_url());
        return Ok(ExitCode::SUCCESS);
    }

    let mut controller = FormController::new(FormState::default(), timings);
    fill_fields(&mut controller, &options.fields)?;

    if options.headless {
        let outcome = run_headless(&mut controller, &client);
        return Ok(match outcome {
            Ok(report) => {
                println!("{report}");
                ExitCode::SUCCESS
            }
            Err(message) => {
                println!("error: {message}");
                ExitCode::FAILURE
            }
        });
    }

    let mut runtime = ClientRuntime::new(client);
    gradecast_tui::run_app(&mut controller, &mut runtime)?;
    Ok(ExitCode::SUCCESS)
}

/// Interactive runs own the terminal, so logs go to a file under the cache dir.
fn init_logging(level: &str, to_stderr: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid log filter {level:?}; set [log].level or RUST_LOG"))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if to_stderr {
        builder.with_writer(std::io::stderr).try_init()
    } else {
        let log_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow!("cannot resolve cache directory for the log file"))?
            .join(config::APP_NAME);
        fs::create_dir_all(&log_dir)
            .with_context(|| format!("create log directory {}", log_dir.display()))?;
        let log_path = log_dir.join("gradecast.log");
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("open log file {}", log_path.display()))?;
        builder
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init()
    };
    installed.map_err(|error| anyhow!("install log subscriber: {error}"))
}

fn fill_fields(controller: &mut FormController, fields: &[(String, String)]) -> Result<()> {
    for (field, value) in fields {
        let events = controller.dispatch(ControllerCommand::Input {
            field: field.clone(),
            value: value.clone(),
        });
        if let Some(ControllerEvent::UnknownField(name)) = events.first() {
            let known = controller
                .view()
                .form
                .fields()
                .iter()
                .map(|field| field.spec.name)
                .collect::<Vec<_>>()
                .join(", ");
            bail!("unknown form field {name:?}; expected one of: {known}");
        }
    }
    Ok(())
}

/// Drives one submission through the controller synchronously. Timers are
/// not waited on; the report reflects the state right after the outcome.
fn run_headless(controller: &mut FormController, client: &Client) -> Result<String, String> {
    controller.dispatch(ControllerCommand::Submit);
    for effect in controller.take_effects() {
        if let Effect::Post { request_id, fields } = effect {
            let outcome = client.predict(&fields);
            controller.dispatch(ControllerCommand::SubmissionFinished {
                request_id,
                outcome,
            });
        }
    }
    headless_report(controller.view())
}

fn headless_report(view: &FormView) -> Result<String, String> {
    if view.error.visible {
        return Err(view.error.message.clone());
    }
    if !view.result.visible {
        return Err("no prediction was produced".to_owned());
    }
    let card = &view.result;
    Ok(format!(
        "{} {}\ngrade: {}\nconfidence: {}",
        card.icon, card.title, card.grade, card.confidence_text
    )
    .trim_start()
    .to_owned())
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
    endpoint: Option<String>,
    fields: Vec<(String, String)>,
    headless: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_example: false,
        check_only: false,
        show_help: false,
        endpoint: None,
        fields: Vec::new(),
        headless: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            "--endpoint" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--endpoint requires a base URL"))?;
                options.endpoint = Some(value.as_ref().to_owned());
            }
            "--field" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--field requires NAME=VALUE"))?;
                let Some((name, field_value)) = value.as_ref().split_once('=') else {
                    bail!(
                        "--field expects NAME=VALUE, got {:?}",
                        value.as_ref()
                    );
                };
                if name.trim().is_empty() {
                    bail!("--field name must not be empty");
                }
                options
                    .fields
                    .push((name.trim().to_owned(), field_value.to_owned()));
            }
            "--headless" => {
                options.headless = true;
            }
            unknown => {
                bail!("unknown argument {unknown:?}; run with --help to see supported options");
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("gradecast");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a config template");
    println!("  --check                  Validate config and reach the prediction server");
    println!("  --endpoint <url>         Override [server].base_url");
    println!("  --field NAME=VALUE       Prefill a form field (repeatable)");
    println!("  --headless               Submit once without the UI and print the outcome");
    println!("  --help                   Show this help");
}
