/*!
 * Logging Module
 * Console and rolling file output for the server
 */
pub mod middleware;

use std::io;
use std::path::PathBuf;
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_DIR: &str = "logs";

/// Environment-driven logging options, read before `Config` so its errors get logged.
#[derive(Debug)]
struct LogSettings {
    environment: String,
    level: String,
    dir: PathBuf,
}

impl LogSettings {
    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string());
        let default_level = if environment == "production" {
            "info"
        } else {
            "debug"
        };
        Self {
            level: lookup("LOG_LEVEL").unwrap_or_else(|| default_level.to_string()),
            dir: PathBuf::from(lookup("LOG_DIR").unwrap_or_else(|| DEFAULT_LOG_DIR.to_string())),
            environment,
        }
    }

    fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Errors get their own file in production only.
    fn writes_error_log(&self) -> bool {
        self.is_production()
    }
}

/// Install the global subscriber.
///
/// Reads `ENVIRONMENT`, `LOG_LEVEL` and `LOG_DIR` straight from the environment. The
/// returned guards flush the non-blocking writers on drop and must be held for the life
/// of the process.
pub fn init() -> Vec<WorkerGuard> {
    let settings = LogSettings::from_lookup(|name| std::env::var(name).ok());

    if let Err(e) = std::fs::create_dir_all(&settings.dir) {
        eprintln!("Cannot create log directory {}: {e}", settings.dir.display());
    }

    let (file_writer, file_guard) = non_blocking(rolling::daily(&settings.dir, "app.log"));
    let (console_writer, console_guard) = non_blocking(io::stdout());
    let mut guards = vec![file_guard, console_guard];

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "portfolio_cms={},tower_http=info,sqlx=warn",
            settings.level
        ))
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if settings.is_production() {
        let file_layer = fmt::layer()
            .json()
            .with_writer(file_writer)
            .with_target(true)
            .with_current_span(true)
            .with_file(true)
            .with_line_number(true);

        let error_layer = settings.writes_error_log().then(|| {
            let (error_writer, error_guard) =
                non_blocking(rolling::daily(&settings.dir, "error.log"));
            guards.push(error_guard);
            fmt::layer()
                .json()
                .with_writer(error_writer)
                .with_target(true)
                .with_current_span(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(tracing_subscriber::filter::LevelFilter::ERROR)
        });

        let console_layer = fmt::layer()
            .json()
            .with_writer(console_writer)
            .with_target(false);

        subscriber
            .with(file_layer)
            .with(error_layer)
            .with(console_layer)
            .init();
    } else {
        let file_layer = fmt::layer()
            .with_writer(file_writer)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false);

        let console_layer = fmt::layer()
            .with_writer(console_writer)
            .with_target(true)
            .pretty();

        subscriber.with(file_layer).with(console_layer).init();
    }

    tracing::info!(
        "Logging initialized for {} environment",
        settings.environment
    );
    guards
}
