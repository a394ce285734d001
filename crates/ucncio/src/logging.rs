use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Filter directives that replace `--log-level` when set, e.g.
/// `UCNCIO_LOG=ucncio_bridge::exchange=trace`.
pub const LOG_ENV: &str = "UCNCIO_LOG";

/// Targets that follow `--log-level`. Anything else is capped at warn.
const UCNCIO_TARGETS: [&str; 4] = ["ucncio", "ucncio_bridge", "ucncio_transport", "ucncio_wire"];

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }

    fn directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Directives for `level`: the ucncio crates at `level`, the rest no louder
/// than warn.
fn default_directives(level: LogLevel) -> String {
    let base = if level.as_filter() > LevelFilter::WARN {
        LogLevel::Warn
    } else {
        level
    };
    let mut directives = base.directive().to_string();
    for target in UCNCIO_TARGETS {
        directives.push_str(&format!(",{target}={}", level.directive()));
    }
    directives
}

/// `UCNCIO_LOG` if it parses, else the `--log-level` directives. The
/// rejected text is returned so it can be reported once logging is up.
fn resolve_filter(level: LogLevel, env: Option<&str>) -> (EnvFilter, Option<String>) {
    match env.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => match EnvFilter::try_new(value) {
            Ok(filter) => (filter, None),
            Err(_) => (
                EnvFilter::new(default_directives(level)),
                Some(value.to_string()),
            ),
        },
        None => (EnvFilter::new(default_directives(level)), None),
    }
}

/// Install the stderr subscriber. Stdout stays reserved for command output.
///
/// Thread names are shown from debug up so that records from the
/// `ucncio-exchange` worker can be told apart from the panel thread.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let env = std::env::var(LOG_ENV).ok();
    let (filter, rejected) = resolve_filter(level, env.as_deref());

    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(false)
        .with_thread_names(level.as_filter() >= LevelFilter::DEBUG);

    match format {
        LogFormat::Text => {
            let _ = builder.try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().try_init();
        }
    }

    if let Some(value) = rejected {
        warn!(env = LOG_ENV, %value, "ignoring invalid log filter");
    }
}
