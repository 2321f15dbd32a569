//! Tracing subscriber setup: a stdout layer and an optional rolling file
//! layer, each behind an `EnvFilter` derived from its own level.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use serde_variant::to_variant_name;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

use crate::{config::LoggerSettings, Error, Result};

// Crates whose events pass the level-based filter.
const MODULE_WHITELIST: &[&str] = &["ontquery"];

// Keeps the background writer alive for the whole process.
static NONBLOCKING_WORK_GUARD_KEEP: OnceLock<WorkerGuard> = OnceLock::new();

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum LogLevel {
    #[serde(rename = "off")]
    Off,
    #[serde(rename = "trace")]
    Trace,
    #[serde(rename = "debug")]
    Debug,
    #[serde(rename = "info")]
    #[default]
    Info,
    #[serde(rename = "warn")]
    Warn,
    #[serde(rename = "error")]
    Error,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum Format {
    #[serde(rename = "compact")]
    #[default]
    Compact,
    #[serde(rename = "pretty")]
    Pretty,
    #[serde(rename = "json")]
    Json,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum Rotation {
    #[serde(rename = "minutely")]
    Minutely,
    #[serde(rename = "hourly")]
    #[default]
    Hourly,
    #[serde(rename = "daily")]
    Daily,
    #[serde(rename = "never")]
    Never,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match to_variant_name(self) {
            Ok(name) => f.write_str(name),
            Err(_) => Err(std::fmt::Error),
        }
    }
}

/// Installs the global subscriber described by `config`.
///
/// Nothing is installed when every layer is disabled.
///
/// # Errors
///
/// Fails when a subscriber is already installed, when the filter directives
/// do not parse, or when the log directory cannot be prepared.
pub fn init(config: &LoggerSettings) -> Result<()> {
    let layers = init_layers(config)?;
    if !layers.is_empty() {
        tracing_subscriber::registry().with(layers).try_init()?;
    }
    Ok(())
}

/// Builds the enabled layers, each filtered at its own level.
fn init_layers(config: &LoggerSettings) -> Result<Vec<Box<dyn Layer<Registry> + Sync + Send>>> {
    let mut layers: Vec<Box<dyn Layer<Registry> + Sync + Send>> = Vec::new();

    if let Some(file_appender_config) = config.file_appender.as_ref() {
        if file_appender_config.enable {
            let dir = file_appender_config
                .dir
                .clone()
                .unwrap_or_else(|| "./logs".to_string());
            let rotation = match file_appender_config.rotation {
                Rotation::Minutely => tracing_appender::rolling::Rotation::MINUTELY,
                Rotation::Hourly => tracing_appender::rolling::Rotation::HOURLY,
                Rotation::Daily => tracing_appender::rolling::Rotation::DAILY,
                Rotation::Never => tracing_appender::rolling::Rotation::NEVER,
            };
            let file_appender = tracing_appender::rolling::Builder::default()
                .max_log_files(file_appender_config.max_log_files)
                .rotation(rotation)
                .filename_prefix(
                    file_appender_config
                        .filename_prefix
                        .as_deref()
                        .unwrap_or("ontquery"),
                )
                .filename_suffix(
                    file_appender_config
                        .filename_suffix
                        .as_deref()
                        .unwrap_or("log"),
                )
                .build(dir)?;

            let file_appender_layer = if file_appender_config.non_blocking {
                let (non_blocking_file_appender, work_guard) =
                    tracing_appender::non_blocking(file_appender);
                NONBLOCKING_WORK_GUARD_KEEP
                    .set(work_guard)
                    .map_err(|_| Error::string("logger file appender already initialized"))?;
                init_layer(non_blocking_file_appender, file_appender_config.format, false)
            } else {
                init_layer(file_appender, file_appender_config.format, false)
            };
            let filter = init_env_filter(
                config.override_filter.as_deref(),
                file_appender_config.level,
            )?;
            layers.push(file_appender_layer.with_filter(filter).boxed());
        }
    }

    if config.enable {
        let filter = init_env_filter(config.override_filter.as_deref(), config.level)?;
        layers.push(
            init_layer(std::io::stdout, config.format, true)
                .with_filter(filter)
                .boxed(),
        );
    }

    Ok(layers)
}

/// `RUST_LOG` wins, then the override directives, then `<crate>=<level>` for
/// every whitelisted crate.
fn init_env_filter(override_filter: Option<&str>, level: LogLevel) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let directives = override_filter.map_or_else(|| default_directives(level), str::to_owned);
    Ok(EnvFilter::try_new(directives)?)
}

fn default_directives(level: LogLevel) -> String {
    MODULE_WHITELIST
        .iter()
        .map(|module| format!("{module}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn init_layer<W2>(make_writer: W2, format: Format, ansi: bool) -> Box<dyn Layer<Registry> + Sync + Send>
where
    W2: for<'writer> MakeWriter<'writer> + Sync + Send + 'static,
{
    match format {
        Format::Compact => fmt::Layer::default()
            .with_ansi(ansi)
            .with_writer(make_writer)
            .compact()
            .boxed(),
        Format::Pretty => fmt::Layer::default()
            .with_ansi(ansi)
            .with_writer(make_writer)
            .pretty()
            .boxed(),
        Format::Json => fmt::Layer::default()
            .with_ansi(ansi)
            .with_writer(make_writer)
            .json()
            .boxed(),
    }
}
