use super::StatePaths;
use std::fs;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Appends one JSON object per line to the runtime log. Failures are dropped:
/// the wizard keeps running when the log cannot be written.
pub fn append_runtime_log(paths: &StatePaths, level: LogLevel, event: &str, message: &str) {
    let payload = serde_json::json!({
        "timestamp": super::now_secs(),
        "level": level.as_str(),
        "event": event,
        "message": message,
    });

    let Ok(line) = serde_json::to_string(&payload) else {
        return;
    };

    let path = paths.runtime_log_path();
    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(mut file) = fs::OpenOptions::new().create(true).append(true).open(path) else {
        return;
    };
    let _ = writeln!(file, "{line}");
}

/// Optional sink handed to long-lived components so tests can run without a
/// state root.
#[derive(Debug, Clone, Default)]
pub struct RuntimeLog {
    paths: Option<StatePaths>,
}

impl RuntimeLog {
    pub fn new(paths: StatePaths) -> Self {
        Self { paths: Some(paths) }
    }

    pub fn disabled() -> Self {
        Self { paths: None }
    }

    pub fn info(&self, event: &str, message: &str) {
        self.write(LogLevel::Info, event, message);
    }

    pub fn warn(&self, event: &str, message: &str) {
        self.write(LogLevel::Warn, event, message);
    }

    pub fn error(&self, event: &str, message: &str) {
        self.write(LogLevel::Error, event, message);
    }

    fn write(&self, level: LogLevel, event: &str, message: &str) {
        if let Some(paths) = &self.paths {
            append_runtime_log(paths, level, event, message);
        }
    }
}
