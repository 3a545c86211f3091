use std::collections::BTreeMap;
use std::io::IsTerminal;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::Subscriber;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::reload;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::utils;

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

/// Per-target log levels, e.g. `{ "newsdesk": "debug", "sqlx": "warn" }`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct LoggerTargets(BTreeMap<String, String>);

impl LoggerTargets {
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        utils::serde::load_json_from_file(path)
    }

    pub fn to_filter(&self) -> Result<EnvFilter> {
        self.0.iter().try_fold(EnvFilter::default(), |filter, (target, level)| {
            let directive = format!("{target}={level}")
                .parse::<Directive>()
                .with_context(|| format!("invalid log directive for `{target}`"))?;
            Ok(filter.add_directive(directive))
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerConfig {
    pub outputs: Vec<LoggerOutput>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            outputs: vec![LoggerOutput::Stderr(LoggerStderrOutput::default())],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Auto,
    Human,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LoggerOutput {
    Stderr(LoggerStderrOutput),
    File(LoggerFileOutput),
}

impl LoggerOutput {
    fn to_layer<S>(&self) -> Result<BoxedLayer<S>>
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        match self {
            Self::Stderr(stderr) => Ok(stderr.to_layer()),
            Self::File(file) => file.to_layer(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct LoggerStderrOutput {
    #[serde(default)]
    pub format: LogFormat,
}

impl LoggerStderrOutput {
    fn to_layer<S>(self) -> BoxedLayer<S>
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        match self.format {
            LogFormat::Json => tracing_stackdriver::layer()
                .with_writer(std::io::stderr)
                .boxed(),
            LogFormat::Human | LogFormat::Auto if is_systemd_child() => fmt::layer()
                .with_writer(std::io::stderr)
                .without_time()
                .with_ansi(false)
                .boxed(),
            LogFormat::Human | LogFormat::Auto => fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(std::io::stderr().is_terminal())
                .boxed(),
        }
    }
}

/// Hourly rotated log files. JSON unless `format` says otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerFileOutput {
    pub dir: PathBuf,
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default = "log_file_prefix")]
    pub file_prefix: String,
    #[serde(default = "max_log_files")]
    pub max_files: NonZeroUsize,
}

impl LoggerFileOutput {
    fn to_layer<S>(&self) -> Result<BoxedLayer<S>>
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        let writer = tracing_appender::rolling::Builder::new()
            .rotation(Rotation::HOURLY)
            .filename_prefix(&self.file_prefix)
            .max_log_files(self.max_files.get())
            .build(&self.dir)
            .with_context(|| format!("failed to open log dir {}", self.dir.display()))?;

        Ok(match self.format {
            LogFormat::Human => fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .boxed(),
            LogFormat::Json | LogFormat::Auto => {
                tracing_stackdriver::layer().with_writer(writer).boxed()
            }
        })
    }
}

fn log_file_prefix() -> String {
    "newsdesk.log".to_owned()
}

fn max_log_files() -> NonZeroUsize {
    NonZeroUsize::new(24).unwrap_or(NonZeroUsize::MIN)
}

pub fn is_systemd_child() -> bool {
    #[cfg(target_os = "linux")]
    {
        // SAFETY: `getppid` has no preconditions.
        let ppid = unsafe { libc::getppid() };
        ppid == 1 || std::env::var_os("SYSTEMD_EXEC_PID").is_some()
    }

    #[cfg(not(target_os = "linux"))]
    {
        false
    }
}

fn make_filter(targets: Option<&Path>) -> Result<EnvFilter> {
    match targets {
        None => Ok(EnvFilter::builder()
            .with_default_directive(tracing::Level::INFO.into())
            .from_env_lossy()),
        Some(path) => LoggerTargets::load_from(path)
            .context("failed to load logger targets")?
            .to_filter(),
    }
}

/// Installs the global subscriber. Fails when called twice.
///
/// With a `targets` file the filter is reloaded whenever the file's
/// modification time changes.
pub fn init_logger(config: &LoggerConfig, targets: Option<PathBuf>) -> Result<()> {
    use tracing_subscriber::layer::SubscriberExt;

    static INITIALIZED: AtomicBool = AtomicBool::new(false);
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        anyhow::bail!("logger was already initialized");
    }

    let (filter, handle) = reload::Layer::new(make_filter(targets.as_deref())?);
    let outputs = config
        .outputs
        .iter()
        .map(LoggerOutput::to_layer)
        .collect::<Result<Vec<_>>>()?;

    let subscriber = tracing_subscriber::registry().with(filter).with(outputs);
    tracing::subscriber::set_global_default(subscriber)?;

    if let Some(path) = targets {
        std::thread::Builder::new()
            .name("watch_logger_targets".to_owned())
            .spawn(move || watch_targets(path, handle))?;
    }

    Ok(())
}

// A plain thread so the watcher does not depend on the runtime being up.
fn watch_targets(path: PathBuf, handle: reload::Handle<EnvFilter, Registry>) {
    const INTERVAL: Duration = Duration::from_secs(10);

    let modified_at = |path: &Path| -> Option<SystemTime> {
        std::fs::metadata(path).and_then(|m| m.modified()).ok()
    };

    tracing::info!(targets = %path.display(), "watching logger targets");
    let mut last_modified = modified_at(&path);

    loop {
        std::thread::sleep(INTERVAL);

        let modified = modified_at(&path);
        if modified == last_modified {
            continue;
        }
        last_modified = modified;

        match make_filter(Some(&path)) {
            Ok(filter) => {
                if handle.reload(filter).is_err() {
                    break;
                }
                tracing::info!("reloaded logger targets");
            }
            Err(e) => tracing::error!("failed to reload logger targets: {e:#}"),
        }
    }

    tracing::info!("stopped watching logger targets");
}

/// Logs panics with a backtrace and exits the process.
pub fn set_abort_with_tracing() {
    std::panic::set_hook(Box::new(|info| {
        use std::io::Write;

        let backtrace = std::backtrace::Backtrace::force_capture();
        tracing::error!("panic: {info}\n{backtrace}");

        std::io::stderr().flush().ok();
        std::io::stdout().flush().ok();

        #[allow(clippy::exit)]
        std::process::exit(1);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_parse_into_filter() {
        let targets: LoggerTargets =
            serde_json::from_str(r#"{ "newsdesk": "debug", "sqlx": "warn" }"#).unwrap();
        assert!(targets.to_filter().is_ok());

        let bad: LoggerTargets = serde_json::from_str(r#"{ "newsdesk": "loud" }"#).unwrap();
        assert!(bad.to_filter().is_err());
    }

    #[test]
    fn outputs_are_tagged_by_type() {
        let config: LoggerConfig = serde_json::from_str(
            r#"{ "outputs": [
                { "type": "Stderr", "format": "json" },
                { "type": "File", "dir": "/var/log/newsdesk" }
            ] }"#,
        )
        .unwrap();

        assert!(matches!(
            config.outputs[0],
            LoggerOutput::Stderr(LoggerStderrOutput {
                format: LogFormat::Json
            })
        ));
        let LoggerOutput::File(file) = &config.outputs[1] else {
            panic!("expected file output");
        };
        assert_eq!(file.format, LogFormat::Auto);
        assert_eq!(file.file_prefix, "newsdesk.log");
        assert_eq!(file.max_files.get(), 24);
    }
}
