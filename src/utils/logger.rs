use std::error::Error;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use backtrace::Backtrace;
use serde::Serialize;
use slog::{Drain, Logger, error, o};

#[derive(Serialize, Debug)]
pub struct StackFrame {
    func: String,
    source: String,
    line: u32,
}

/// Captures the current backtrace, keeping only frames that resolve to a
/// named symbol.
fn marshal_stack() -> Vec<StackFrame> {
    let bt = Backtrace::new();
    let mut frames = Vec::new();

    for frame in bt.frames() {
        for symbol in frame.symbols() {
            let Some(func) = symbol.name().map(|n| n.to_string()) else {
                continue;
            };
            let source = symbol
                .filename()
                .map(|p| {
                    // parent dir + file name is enough to find the code
                    match (p.parent().and_then(Path::file_name), p.file_name()) {
                        (Some(parent), Some(file)) => {
                            format!("{}/{}", parent.to_string_lossy(), file.to_string_lossy())
                        }
                        _ => p.to_string_lossy().into_owned(),
                    }
                })
                .unwrap_or_else(|| "unknown".to_owned());
            let line = symbol.lineno().unwrap_or(0);
            frames.push(StackFrame { func, source, line });
        }
    }
    frames
}

/// Joins an error and all of its sources into one line.
pub fn error_chain(err: &dyn Error) -> String {
    let mut chain = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        chain.push_str(": ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }
    chain
}

/// JSON logger writing to stdout.
pub fn get_logger() -> Logger {
    let drain = slog_json::Json::default(io::stdout()).fuse();
    let drain = Mutex::new(drain).fuse();
    Logger::root(drain, o!("service" => env!("CARGO_PKG_NAME")))
}

/// A logger that drops everything, for tests.
pub fn discard_logger() -> Logger {
    Logger::root(slog::Discard, o!())
}

/// Logs a failure with its full error chain and the stack it was observed on.
pub fn error_context(logger: &Logger, context: &str, err: &dyn Error) {
    let frames = marshal_stack();
    error!(logger, "{}", context;
        "error" => error_chain(err),
        "stack_trace" => format!("{:?}", frames)
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StoreError;

    #[test]
    fn chain_includes_every_source() {
        let err = StoreError::Io {
            path: "data/songs.json".into(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        let chain = error_chain(&err);
        assert!(chain.starts_with("I/O error on data/songs.json"));
        assert!(chain.ends_with(": denied"));
    }
}
