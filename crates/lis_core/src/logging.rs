//! Process-wide file logging.
//!
//! One rotating file logger per process, started by [`init_logging`]. Calling
//! it again with the same settings is a no-op; different settings are refused
//! so two callers never silently fight over the log sink.
//!
//! Log lines carry metadata only (keys, kinds, durations), never patient
//! names, contact details or test codes.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info, LevelFilter};
use once_cell::sync::OnceCell;
use std::any::Any;
use std::path::{Path, PathBuf};

const FILE_BASENAME: &str = "lis_core";
const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;
const KEEP_ROTATED: usize = 5;
const PANIC_MESSAGE_LIMIT: usize = 160;

static LOGGER: OnceCell<RunningLogger> = OnceCell::new();
static PANIC_HOOK_SET: OnceCell<()> = OnceCell::new();

/// Effective logger settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: LevelFilter,
    pub dir: PathBuf,
}

struct RunningLogger {
    settings: LogSettings,
    _handle: LoggerHandle,
}

/// Starts file logging at `level` under the absolute directory `log_dir`.
///
/// Never panics. Fails when the level is unknown, the directory is blank,
/// relative or cannot be created, logging already runs with other settings,
/// or the backend refuses to start.
pub fn init_logging(level: &str, log_dir: &str) -> Result<(), String> {
    let wanted = LogSettings {
        level: normalize_level(level)?,
        dir: normalize_log_dir(log_dir)?,
    };

    let running = LOGGER.get_or_try_init(|| start(wanted.clone()))?;
    if running.settings != wanted {
        return Err(format!(
            "logging already runs with level={} dir=`{}`; refusing level={} dir=`{}`",
            running.settings.level,
            running.settings.dir.display(),
            wanted.level,
            wanted.dir.display()
        ));
    }
    Ok(())
}

/// Settings of the running logger, if [`init_logging`] succeeded.
pub fn logging_status() -> Option<LogSettings> {
    LOGGER.get().map(|running| running.settings.clone())
}

/// `Debug` for debug builds, `Info` otherwise.
pub fn default_log_level() -> LevelFilter {
    if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

fn start(settings: LogSettings) -> Result<RunningLogger, String> {
    std::fs::create_dir_all(&settings.dir)
        .map_err(|err| format!("cannot create `{}`: {err}", settings.dir.display()))?;

    let filter = settings.level.as_str().to_ascii_lowercase();
    let handle = Logger::try_with_str(&filter)
        .map_err(|err| format!("rejected log filter `{filter}`: {err}"))?
        .log_to_file(
            FileSpec::default()
                .directory(&settings.dir)
                .basename(FILE_BASENAME)
                .suffix("log"),
        )
        .rotate(
            Criterion::Size(ROTATE_AT_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(KEEP_ROTATED),
        )
        .append()
        .write_mode(WriteMode::BufferAndFlush)
        .format_for_files(flexi_logger::with_thread)
        .start()
        .map_err(|err| format!("logger backend did not start: {err}"))?;

    set_panic_hook();
    info!(
        "event=logging_init module=core status=ok version={} os={} level={} dir={}",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        filter,
        settings.dir.display()
    );

    Ok(RunningLogger {
        settings,
        _handle: handle,
    })
}

/// Accepts `trace|debug|info|warn|error` in any case, plus `warning`.
pub(crate) fn normalize_level(raw: &str) -> Result<LevelFilter, String> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("warning") {
        return Ok(LevelFilter::Warn);
    }
    match trimmed.parse::<LevelFilter>() {
        Ok(LevelFilter::Off) | Err(_) => Err(format!(
            "unknown log level `{trimmed}` (use trace, debug, info, warn or error)"
        )),
        Ok(level) => Ok(level),
    }
}

pub(crate) fn normalize_log_dir(raw: &str) -> Result<PathBuf, String> {
    let dir = Path::new(raw.trim());
    if dir.as_os_str().is_empty() {
        return Err("log directory is empty".to_string());
    }
    if dir.is_relative() {
        return Err(format!("log directory `{}` is not absolute", dir.display()));
    }
    Ok(dir.to_path_buf())
}

fn set_panic_hook() {
    if PANIC_HOOK_SET.set(()).is_err() {
        return;
    }

    let chained = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let at = panic.location().map_or_else(
            || "unknown".to_string(),
            |location| format!("{}:{}", location.file(), location.line()),
        );
        error!(
            "event=panic module=core status=error at={} message={}",
            at,
            one_line(&panic_message(panic.payload()), PANIC_MESSAGE_LIMIT)
        );
        chained(panic);
    }));
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        return (*text).to_string();
    }
    if let Some(text) = payload.downcast_ref::<String>() {
        return text.clone();
    }
    "<non-string payload>".to_string()
}

/// Joins lines and truncates to `limit` chars, marking the cut with `...`.
fn one_line(text: &str, limit: usize) -> String {
    let joined: String = text
        .chars()
        .map(|ch| if ch == '\n' || ch == '\r' { ' ' } else { ch })
        .collect();
    match joined.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &joined[..cut]),
        None => joined,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        init_logging, logging_status, normalize_level, normalize_log_dir, one_line, panic_message,
    };
    use log::LevelFilter;

    #[test]
    fn levels_are_case_insensitive_and_off_is_rejected() {
        assert_eq!(normalize_level("INFO").unwrap(), LevelFilter::Info);
        assert_eq!(normalize_level(" Warning ").unwrap(), LevelFilter::Warn);
        assert!(normalize_level("off").is_err());
        assert!(normalize_level("verbose").is_err());
    }

    #[test]
    fn log_dir_must_be_absolute_and_non_blank() {
        assert!(normalize_log_dir("  ").unwrap_err().contains("empty"));
        assert!(normalize_log_dir("logs/dev")
            .unwrap_err()
            .contains("not absolute"));
    }

    #[test]
    fn one_line_joins_and_truncates() {
        assert_eq!(one_line("a\nb\rc", 10), "a b c");
        assert_eq!(one_line("abcdef", 3), "abc...");
    }

    #[test]
    fn panic_message_reads_str_and_string_payloads() {
        assert_eq!(panic_message(&"boom"), "boom");
        assert_eq!(panic_message(&String::from("bang")), "bang");
        assert_eq!(panic_message(&42_u8), "<non-string payload>");
    }

    #[test]
    fn init_is_idempotent_and_refuses_other_settings() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        let first_dir = first.path().to_str().unwrap();
        let second_dir = second.path().to_str().unwrap();

        init_logging("info", first_dir).unwrap();
        init_logging("INFO", first_dir).unwrap();
        assert!(init_logging("debug", first_dir)
            .unwrap_err()
            .contains("refusing"));
        assert!(init_logging("info", second_dir)
            .unwrap_err()
            .contains("refusing"));

        let active = logging_status().unwrap();
        assert_eq!(active.level, LevelFilter::Info);
        assert_eq!(active.dir, first.path());
    }
}
