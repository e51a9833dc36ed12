//! 日志初始化
//!
//! 控制台输出 + 可选的三路文件日志 (每日轮转):
//!
//! | 通道       | 目录        | 内容                           | 清理        |
//! |------------|-------------|--------------------------------|-------------|
//! | app        | `app/`      | 除 audit/security 外的全部事件 | 保留 14 天  |
//! | audit      | `audit/`    | `audit_log!` (账本变更)        | 永久        |
//! | security   | `security/` | `security_log!` (登录、注销)   | 永久        |

use std::fs;
use std::path::Path;
use tracing::Metadata;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

/// Days an `app/` file is kept
pub const APP_LOG_RETENTION_DAYS: i64 = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogChannel {
    App,
    Audit,
    Security,
}

impl LogChannel {
    const ALL: [LogChannel; 3] = [LogChannel::App, LogChannel::Audit, LogChannel::Security];

    /// Directory name, file prefix and event target share this name
    fn name(self) -> &'static str {
        match self {
            LogChannel::App => "app",
            LogChannel::Audit => "audit",
            LogChannel::Security => "security",
        }
    }

    fn accepts(self, meta: &Metadata<'_>) -> bool {
        match self {
            LogChannel::App => {
                meta.target() != LogChannel::Audit.name()
                    && meta.target() != LogChannel::Security.name()
            }
            channel => meta.target() == channel.name(),
        }
    }

    /// Daily file layer for this channel. Audit and security are JSON lines.
    fn file_layer<S>(self, root: &Path) -> anyhow::Result<Box<dyn Layer<S> + Send + Sync>>
    where
        S: tracing::Subscriber + for<'a> LookupSpan<'a> + 'static,
    {
        let dir = root.join(self.name());
        fs::create_dir_all(&dir)?;
        let writer = std::sync::Mutex::new(RollingFileAppender::new(
            Rotation::DAILY,
            dir,
            self.name(),
        ));

        let base = fmt::layer().with_ansi(false).with_target(true).with_writer(writer);
        let layer = match self {
            LogChannel::App => base.with_thread_ids(true).boxed(),
            LogChannel::Audit | LogChannel::Security => base.json().boxed(),
        };
        Ok(layer.with_filter(filter_fn(move |meta| self.accepts(meta))).boxed())
    }
}

/// Parse the date out of `app.YYYY-MM-DD` (also `app-YYYY-MM-DD.log`)
fn app_log_date(file_name: &str) -> Option<chrono::NaiveDate> {
    let rest = file_name
        .strip_prefix("app.")
        .or_else(|| file_name.strip_prefix("app-"))?;
    let date = rest.strip_suffix(".log").unwrap_or(rest);
    chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

/// Remove `app/` files dated more than `days` days ago
///
/// `audit/` and `security/` are never touched. Returns the number of files
/// removed.
pub fn cleanup_old_logs(log_dir: &Path, days: i64) -> anyhow::Result<usize> {
    let app_dir = log_dir.join(LogChannel::App.name());
    if !app_dir.is_dir() {
        return Ok(0);
    }

    let oldest_kept = chrono::Local::now().date_naive() - chrono::Duration::days(days);
    let mut removed = 0;
    for entry in fs::read_dir(&app_dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if app_log_date(name).is_some_and(|date| date < oldest_kept) {
            fs::remove_file(&path)?;
            tracing::info!(file = %name, "Removed expired app log");
            removed += 1;
        }
    }
    Ok(removed)
}

/// Install the global subscriber
///
/// `RUST_LOG` wins over `level` when set. With `log_dir` the three file
/// channels are added under it and expired app logs are cleaned once.
///
/// ```no_run
/// referral_engine::init_logger_with_file("info", false, Some("./data/logs"))?;
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn init_logger_with_file(
    level: &str,
    json_format: bool,
    log_dir: Option<&str>,
) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console = if json_format {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        fmt::layer()
            .with_file(true)
            .with_line_number(true)
            .with_writer(std::io::stderr)
            .boxed()
    };

    let mut layers = vec![console];
    if let Some(dir) = log_dir {
        for channel in LogChannel::ALL {
            layers.push(channel.file_layer(Path::new(dir))?);
        }
    }

    tracing_subscriber::registry()
        .with(filter)
        .with(layers)
        .try_init()?;

    if let Some(dir) = log_dir
        && let Err(e) = cleanup_old_logs(Path::new(dir), APP_LOG_RETENTION_DAYS)
    {
        tracing::error!(error = %e, "App log cleanup failed");
    }
    Ok(())
}

/// Record a ledger change on the `audit` channel
///
/// ```no_run
/// referral_engine::audit_log!("admin", "reject_code_request", "code_request:43");
/// referral_engine::audit_log!("admin", "approve_code_request", "code_request:42", "issued ALICE0002");
/// ```
#[macro_export]
macro_rules! audit_log {
    ($actor:expr, $action:expr, $subject:expr) => {
        $crate::audit_log!($actor, $action, $subject, "")
    };
    ($actor:expr, $action:expr, $subject:expr, $note:expr) => {
        tracing::info!(
            target: "audit",
            actor = $actor,
            action = $action,
            subject = $subject,
            note = $note,
            at = chrono::Local::now().to_rfc3339(),
            "AUDIT"
        )
    };
}

/// Record an authentication or account-removal event on the `security` channel
///
/// The first argument is a `tracing::Level` constant name.
///
/// ```no_run
/// referral_engine::security_log!(WARN, "login_failed", username = "alice");
/// referral_engine::security_log!(INFO, "login_success", account_id = "acc-1");
/// ```
#[macro_export]
macro_rules! security_log {
    ($level:ident, $event:expr, $($field:tt)*) => {
        tracing::event!(
            target: "security",
            tracing::Level::$level,
            event = $event,
            at = chrono::Local::now().to_rfc3339(),
            $($field)*
        )
    };
}
