// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use std::io::Write;

/// Append-only destination for tagged log lines.
///
/// Safe for concurrent calls from many tailer tasks; ordering across calls
/// is whatever the sink itself serializes. The tag identifies the source
/// (revision and pod) so interleaved output stays attributable.
pub trait LogSink: Send + Sync {
    fn write_line(&self, tag: &str, line: &[u8]);
}

/// Writes `"<tag> | <line>"` to stdout.
pub struct ConsoleSink;

impl LogSink for ConsoleSink {
    fn write_line(&self, tag: &str, line: &[u8]) {
        let line = String::from_utf8_lossy(line);
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{tag} | {line}");
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::LogSink;

    /// Collects written lines for assertions.
    #[derive(Default)]
    pub struct RecordingSink {
        lines: Mutex<Vec<String>>,
    }

    impl RecordingSink {
        pub fn lines(&self) -> Vec<String> {
            self.lines.lock().unwrap().clone()
        }
    }

    impl LogSink for RecordingSink {
        fn write_line(&self, tag: &str, line: &[u8]) {
            let line = String::from_utf8_lossy(line);
            self.lines.lock().unwrap().push(format!("{tag} | {line}"));
        }
    }
}
