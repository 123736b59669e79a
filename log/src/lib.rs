//! Tracing output for the marten crates.
//!
//! [`init`] installs a file writer, quiet (`warn`) unless a filter is
//! configured, plus a stdout writer in debug builds or when `MARTEN_LOG` or
//! `RUST_LOG` is set. `MARTEN_LOG` wins over `RUST_LOG`; a bare level such
//! as `MARTEN_LOG=trace` applies to the workspace crates only, while values
//! containing directive syntax (`=`, `,`, `:`) are handed to the filter
//! unchanged.

use std::{
    env,
    error::Error,
    path::{Path, PathBuf},
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

/// The workspace crates a bare `MARTEN_LOG` level is expanded over.
const CRATES: &[&str] = &["marten", "marten_text", "marten_change", "marten_rangeset"];

const ENV_VAR: &str = "MARTEN_LOG";

type InitError = Box<dyn Error + Send + Sync>;

/// Keeps the background file writer alive; dropping it flushes and stops
/// the log file.
pub struct LogGuard {
    _writer: WorkerGuard,
    pub log_file: PathBuf,
}

#[derive(Default)]
pub struct LogConfig {
    /// Full path of the log file. Defaults to
    /// `<data_local_dir>/marten/logs/marten-<pid>.log`.
    pub log_file: Option<PathBuf>,
}

pub fn init(config: LogConfig) -> Result<LogGuard, InitError> {
    let log_file = config.log_file.unwrap_or_else(default_log_file);
    let dir = log_file.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).ok();
    let file_name = log_file
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| "marten.log".into());

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(
        dir, file_name,
    ));
    let file_filter = if env_configured() {
        filter()
    } else {
        EnvFilter::new("warn")
    };
    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_filter(file_filter);

    let stdout_layer = (cfg!(debug_assertions) || env_configured())
        .then(|| fmt::layer().with_filter(filter()));

    Registry::default()
        .with(file_layer)
        .with(stdout_layer)
        .try_init()?;

    Ok(LogGuard {
        _writer: guard,
        log_file,
    })
}

/// Stdout-only setup for tests. Safe to call from every test; losing the
/// race to another initializer is fine.
pub fn test() {
    let _ = fmt().with_env_filter(filter()).try_init();
}

fn env_configured() -> bool {
    env::var_os(ENV_VAR).is_some() || env::var_os("RUST_LOG").is_some()
}

fn default_log_file() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("marten")
        .join("logs")
        .join(format!("marten-{}.log", std::process::id()))
}

/// `MARTEN_LOG` over `RUST_LOG` over the default of `warn` globally and
/// `info` for the workspace crates.
fn filter() -> EnvFilter {
    match env::var(ENV_VAR) {
        Ok(value) if value.contains(|c| c == '=' || c == ',' || c == ':') => EnvFilter::new(value),
        Ok(level) => EnvFilter::new(expand(&level)),
        Err(_) => match env::var("RUST_LOG") {
            Ok(value) => EnvFilter::new(value),
            Err(_) => EnvFilter::new(expand("info")),
        },
    }
}

/// Spell `warn` globally and `level` for each crate in [`CRATES`].
fn expand(level: &str) -> String {
    CRATES.iter().fold(String::from("warn"), |mut spec, krate| {
        spec.push(',');
        spec.push_str(krate);
        spec.push('=');
        spec.push_str(level);
        spec
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_levels_expand_over_the_workspace_crates() {
        let spec = expand("debug");
        assert!(spec.starts_with("warn,"));
        for krate in CRATES {
            assert!(spec.contains(&format!("{krate}=debug")));
        }
    }

    #[test]
    fn default_location_is_under_the_marten_data_dir() {
        let path = default_log_file();
        assert!(path.to_string_lossy().contains("marten"));
        assert!(path.extension().is_some_and(|ext| ext == "log"));
    }
}
