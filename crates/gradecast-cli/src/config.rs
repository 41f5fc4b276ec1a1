// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use gradecast_app::{ControllerTimings, DEFAULT_CONFIDENCE_FILL_DELAY, DEFAULT_ERROR_DISMISS};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const APP_NAME: &str = "gradecast";
pub const CONFIG_PATH_ENV: &str = "GRADECAST_CONFIG_PATH";

const CONFIG_VERSION: i64 = 1;
const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub server: Server,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            server: Server::default(),
            ui: Ui::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub base_url: Option<String>,
    pub timeout: Option<String>,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            base_url: Some(DEFAULT_BASE_URL.to_owned()),
            timeout: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ui {
    pub error_dismiss: Option<String>,
    pub confidence_fill_delay: Option<String>,
}

impl Default for Ui {
    fn default() -> Self {
        Self {
            error_dismiss: Some("5s".to_owned()),
            confidence_fill_delay: Some("100ms".to_owned()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    pub level: Option<String>,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: Some(DEFAULT_LOG_LEVEL.to_owned()),
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set {CONFIG_PATH_ENV} to the config file")
        })?;

        let app_dir = config_root.join(APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is not versioned. Add `version = 1` and put values under [server], [ui], and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(base_url) = &self.server.base_url {
            gradecast_client::validate_base_url(base_url)
                .with_context(|| format!("invalid server.base_url in {}", path.display()))?;
        }

        let durations = [
            ("server.timeout", self.server.timeout.as_deref()),
            ("ui.error_dismiss", self.ui.error_dismiss.as_deref()),
            (
                "ui.confidence_fill_delay",
                self.ui.confidence_fill_delay.as_deref(),
            ),
        ];
        for (key, raw) in durations {
            let Some(raw) = raw else {
                continue;
            };
            let parsed = parse_duration(raw).with_context(|| format!("{key} in {}", path.display()))?;
            if parsed <= Duration::ZERO {
                bail!(
                    "{key} in {} must be positive, got {}",
                    path.display(),
                    raw
                );
            }
        }

        if let Some(level) = &self.log.level
            && level.trim().is_empty()
        {
            bail!(
                "log.level in {} must not be empty; use a level like \"info\" or \"debug\"",
                path.display()
            );
        }

        Ok(())
    }

    pub fn base_url(&self) -> &str {
        self.server
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }

    pub fn server_timeout(&self) -> Result<Option<Duration>> {
        self.server.timeout.as_deref().map(parse_duration).transpose()
    }

    pub fn timings(&self) -> Result<ControllerTimings> {
        Ok(ControllerTimings {
            error_dismiss: self
                .ui
                .error_dismiss
                .as_deref()
                .map(parse_duration)
                .transpose()?
                .unwrap_or(DEFAULT_ERROR_DISMISS),
            confidence_fill_delay: self
                .ui
                .confidence_fill_delay
                .as_deref()
                .map(parse_duration)
                .transpose()?
                .unwrap_or(DEFAULT_CONFIDENCE_FILL_DELAY),
        })
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# gradecast config\n# Place this file at: {}\n\nversion = 1\n\n[server]\nbase_url = \"{}\"\n# Optional. No request timeout unless set.\n# timeout = \"30s\"\n\n[ui]\nerror_dismiss = \"5s\"\nconfidence_fill_delay = \"100ms\"\n\n[log]\n# RUST_LOG takes precedence when set\nlevel = \"{}\"\n",
            path.display(),
            DEFAULT_BASE_URL,
            DEFAULT_LOG_LEVEL,
        )
    }
}

pub fn parse_duration(raw: &str) -> Result<Duration> {
    let raw = raw.trim();
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins.saturating_mul(60)));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 100ms or 5s)")
}

#[cfg(test)]
mod tests {
    use super::{CONFIG_PATH_ENV, Config, parse_duration};
    use anyhow::Result;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};
    use std::time::Duration;

    fn write_config(content: &str) -> Result<(tempfile::TempDir, PathBuf)> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(&path, content)?;
        Ok((temp, path))
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        match ENV_LOCK.get_or_init(|| Mutex::new(())).lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[test]
    fn missing_config_uses_defaults() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let config = Config::load(&temp.path().join("missing.toml"))?;
        assert_eq!(config.version, 1);
        assert_eq!(config.base_url(), "http://127.0.0.1:5000");
        assert_eq!(config.server_timeout()?, None);
        let timings = config.timings()?;
        assert_eq!(timings.error_dismiss, Duration::from_secs(5));
        assert_eq!(timings.confidence_fill_delay, Duration::from_millis(100));
        assert_eq!(config.log_level(), "info");
        Ok(())
    }

    #[test]
    fn unversioned_config_is_rejected_with_actionable_message() -> Result<()> {
        let (_temp, path) = write_config("[server]\nbase_url = \"http://localhost:5000\"\n")?;
        let error = Config::load(&path).expect_err("unversioned config should fail");
        let message = error.to_string();
        assert!(message.contains("version = 1"));
        assert!(message.contains("[server], [ui], and [log]"));
        Ok(())
    }

    #[test]
    fn full_config_parses() -> Result<()> {
        let (_temp, path) = write_config(
            "version = 1\n[server]\nbase_url = \"https://grades.example.edu/\"\ntimeout = \"30s\"\n[ui]\nerror_dismiss = \"2s\"\nconfidence_fill_delay = \"250ms\"\n[log]\nlevel = \"debug\"\n",
        )?;

        let config = Config::load(&path)?;
        assert_eq!(config.base_url(), "https://grades.example.edu");
        assert_eq!(config.server_timeout()?, Some(Duration::from_secs(30)));
        let timings = config.timings()?;
        assert_eq!(timings.error_dismiss, Duration::from_secs(2));
        assert_eq!(timings.confidence_fill_delay, Duration::from_millis(250));
        assert_eq!(config.log_level(), "debug");
        Ok(())
    }

    #[test]
    fn partial_sections_fall_back_per_key() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[ui]\nerror_dismiss = \"1m\"\n")?;
        let config = Config::load(&path)?;
        let timings = config.timings()?;
        assert_eq!(timings.error_dismiss, Duration::from_secs(60));
        assert_eq!(timings.confidence_fill_delay, Duration::from_millis(100));
        assert_eq!(config.base_url(), "http://127.0.0.1:5000");
        Ok(())
    }

    #[test]
    fn malformed_config_returns_parse_error() -> Result<()> {
        let (_temp, path) = write_config("{{not toml")?;
        let error = Config::load(&path).expect_err("malformed config should fail");
        assert!(error.to_string().contains("parse TOML config"));
        Ok(())
    }

    #[test]
    fn unsupported_config_version_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 2\n")?;
        let error = Config::load(&path).expect_err("v2 config should fail");
        assert!(error.to_string().contains("unsupported config version 2"));
        Ok(())
    }

    #[test]
    fn bad_base_urls_are_rejected() -> Result<()> {
        for (bad, reason) in [
            ("", "must not be empty"),
            ("not a url", "is not a valid URL"),
            ("ftp://example.com", "must use http or https"),
        ] {
            let (_temp, path) =
                write_config(&format!("version = 1\n[server]\nbase_url = \"{bad}\"\n"))?;
            let error = Config::load(&path).expect_err("bad base url should fail");
            let message = format!("{error:#}");
            assert!(
                message.contains("server.base_url") && message.contains(reason),
                "unexpected message for {bad:?}: {message}"
            );
        }
        Ok(())
    }

    #[test]
    fn non_positive_durations_are_rejected() -> Result<()> {
        for (section, key) in [
            ("server", "timeout"),
            ("ui", "error_dismiss"),
            ("ui", "confidence_fill_delay"),
        ] {
            let (_temp, path) =
                write_config(&format!("version = 1\n[{section}]\n{key} = \"0s\"\n"))?;
            let error = Config::load(&path).expect_err("zero duration should fail");
            let message = error.to_string();
            assert!(message.contains("must be positive"), "got {message}");
            assert!(message.contains(key), "got {message}");
        }
        Ok(())
    }

    #[test]
    fn empty_log_level_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[log]\nlevel = \" \"\n")?;
        let error = Config::load(&path).expect_err("empty level should fail");
        assert!(error.to_string().contains("log.level"));
        Ok(())
    }

    #[test]
    fn default_path_honors_env_override() -> Result<()> {
        let _guard = env_lock();
        let temp = tempfile::tempdir()?;
        let override_path = temp.path().join("custom-config.toml");
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var(CONFIG_PATH_ENV, &override_path);
        }
        let resolved = Config::default_path()?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var(CONFIG_PATH_ENV);
        }
        assert_eq!(resolved, override_path);
        Ok(())
    }

    #[test]
    fn default_path_uses_config_toml_suffix_when_no_env_override() -> Result<()> {
        let _guard = env_lock();
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::remove_var(CONFIG_PATH_ENV);
        }
        let path = Config::default_path()?;
        assert!(path.ends_with("gradecast/config.toml"));
        Ok(())
    }

    #[test]
    fn durations_parse_ms_seconds_and_minutes() -> Result<()> {
        assert_eq!(parse_duration("100ms")?, Duration::from_millis(100));
        assert_eq!(parse_duration("5s")?, Duration::from_secs(5));
        assert_eq!(parse_duration("2m")?, Duration::from_secs(120));
        Ok(())
    }

    #[test]
    fn invalid_durations_are_rejected() {
        for raw in ["oops", "5", "-1s", "1.5s"] {
            let error = parse_duration(raw).expect_err("invalid duration should fail");
            assert!(
                error.to_string().contains("invalid duration"),
                "unexpected message for {raw:?}: {error}"
            );
        }
    }

    #[test]
    fn example_config_round_trips_through_load() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        let example = Config::example_config(&path);
        assert!(example.contains("version = 1"));
        assert!(example.contains("[server]"));
        assert!(example.contains("[ui]"));
        assert!(example.contains("[log]"));

        std::fs::write(&path, example)?;
        let config = Config::load(&path)?;
        assert_eq!(config.base_url(), "http://127.0.0.1:5000");
        Ok(())
    }
}
