//! Process-wide logging sink (§2 AMBIENT, §6 `-l`/`-x` flags).
//!
//! The engine this was distilled from logs through a single `dolog()`
//! helper: every line is pid-stamped and timestamped, prefixed with an
//! optional tag, and appended to a file set once at startup via `-l`; if no
//! file is configured nothing is written. This sink reimplements that
//! behind the `log` facade so every component in this crate logs through
//! `log::{info,warn,debug,...}!` rather than printing directly, while
//! still landing in the same place the original engine's operators expect.
//!
//! When no `-l` path is given, falls back to `env_logger`'s normal
//! stderr behavior (respecting `RUST_LOG`) so the engine is still usable
//! interactively without a log file configured.

use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{Log, Metadata, Record};

struct FileLogger {
    file: Mutex<std::fs::File>,
    tag: Option<String>,
}

impl Log for FileLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        let pid = std::process::id();
        let tag = self.tag.as_deref().unwrap_or("");
        let line = format!(
            "{pid:05}] {}.{:06} {tag} {}\n",
            now.as_secs(),
            now.subsec_micros(),
            record.args()
        );
        if let Ok(mut file) = self.file.lock() {
            let _ = file.write_all(line.as_bytes());
            let _ = file.flush();
        }
    }

    fn flush(&self) {
        if let Ok(mut file) = self.file.lock() {
            let _ = file.flush();
        }
    }
}

/// Install the process-wide logger. `log_path` is the `-l` flag; `tag` is
/// `-x`. Called once at process start, before any other component logs.
/// A failure to open the configured log file falls back to stderr logging
/// rather than aborting startup over a diagnostic-only concern.
pub fn init(log_path: Option<&str>, tag: Option<&str>) {
    let Some(path) = log_path else {
        let _ = env_logger::try_init();
        return;
    };

    let file = OpenOptions::new().create(true).append(true).open(path);
    match file {
        Ok(file) => {
            let logger = FileLogger {
                file: Mutex::new(file),
                tag: tag.map(str::to_string),
            };
            log::set_max_level(log::LevelFilter::Trace);
            if log::set_boxed_logger(Box::new(logger)).is_err() {
                // A logger is already installed (e.g. in tests that call
                // init() more than once); leave it in place.
            }
        }
        Err(e) => {
            eprintln!("failed to open log file {path}: {e}, falling back to stderr");
            let _ = env_logger::try_init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn writes_pid_and_tag_to_configured_file() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("chess_engine_log_test_{}.log", std::process::id()));
        let path_str = path.to_str().unwrap().to_string();

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path_str)
            .unwrap();
        let logger = FileLogger {
            file: Mutex::new(file),
            tag: Some("[test]".to_string()),
        };

        logger.log(
            &Record::builder()
                .args(format_args!("hello"))
                .level(log::Level::Info)
                .build(),
        );
        logger.flush();

        let mut contents = String::new();
        std::fs::File::open(&path_str)
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert!(contents.contains("[test]"));
        assert!(contents.contains("hello"));
        assert!(contents.contains(&format!("{:05}", std::process::id())));

        let _ = std::fs::remove_file(&path_str);
    }
}
