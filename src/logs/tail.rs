// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Single-container log tailing.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::options::{TailOptions, TailOptionsError};
use super::sink::LogSink;

/// Delay before retrying a failed log-stream acquisition. Acquisition
/// retries forever: the container may simply not have started yet, and
/// availability wins over fast failure here.
const ACQUIRE_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Raw log bytes for one container.
pub type LogByteStream = Pin<Box<dyn AsyncBufRead + Send>>;

/// The narrow log-fetch surface the tailer consumes.
#[async_trait]
pub trait LogStreamSource: Send + Sync + 'static {
    async fn open(
        &self,
        pod: &str,
        container: &str,
        options: &TailOptions,
    ) -> Result<LogByteStream>;
}

/// Streams one (pod, container) pair's log into a sink, each line prefixed
/// with the tailer's tag.
///
/// Lines from a single tailer reach the sink in container order; nothing is
/// guaranteed across tailers.
pub struct LogTailer<S> {
    source: Arc<S>,
    pod: String,
    container: String,
    tag: String,
    options: TailOptions,
}

impl<S: LogStreamSource> LogTailer<S> {
    /// Options are validated here, before any network call.
    pub fn new(
        source: Arc<S>,
        pod: impl Into<String>,
        container: impl Into<String>,
        tag: impl Into<String>,
        options: TailOptions,
    ) -> Result<Self, TailOptionsError> {
        options.validate()?;
        Ok(Self {
            source,
            pod: pod.into(),
            container: container.into(),
            tag: tag.into(),
            options,
        })
    }

    pub async fn tail(&self, sink: Arc<dyn LogSink>, cancel: CancellationToken) -> Result<()> {
        let mut stream = match self.acquire(&cancel).await {
            Some(stream) => stream,
            None => return Ok(()),
        };

        let mut buffer = Vec::new();
        loop {
            buffer.clear();
            let read = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                read = stream.read_until(b'\n', &mut buffer) => read,
            };
            match read {
                // Clean end of stream.
                Ok(0) => return Ok(()),
                Ok(_) => {
                    while buffer.last().is_some_and(|b| *b == b'\n' || *b == b'\r') {
                        buffer.pop();
                    }
                    sink.write_line(&self.tag, &buffer);
                }
                Err(error) => {
                    if cancel.is_cancelled() {
                        // The interrupted read is the expected way out of a
                        // cancelled follow.
                        return Ok(());
                    }
                    return Err(error.into());
                }
            }
        }
    }

    /// Acquire the log stream, retrying on the fixed interval until it
    /// opens or the operation is cancelled.
    async fn acquire(&self, cancel: &CancellationToken) -> Option<LogByteStream> {
        loop {
            if cancel.is_cancelled() {
                return None;
            }
            match self
                .source
                .open(&self.pod, &self.container, &self.options)
                .await
            {
                Ok(stream) => return Some(stream),
                Err(error) => {
                    debug!(pod = %self.pod, error = %error, "log stream not ready, retrying");
                    tokio::select! {
                        _ = cancel.cancelled() => return None,
                        _ = tokio::time::sleep(ACQUIRE_RETRY_INTERVAL) => {}
                    }
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::anyhow;

    use super::*;

    /// Scripted log source: canned bytes per pod name, with an optional
    /// number of failures before a stream opens.
    #[derive(Default)]
    pub struct ScriptedLogs {
        content: Mutex<HashMap<String, Vec<u8>>>,
        failures_before_open: AtomicUsize,
        opens: AtomicUsize,
    }

    impl ScriptedLogs {
        pub fn with_log(self, pod: &str, content: &str) -> Self {
            self.content
                .lock()
                .unwrap()
                .insert(pod.to_string(), content.as_bytes().to_vec());
            self
        }

        pub fn failing_first(self, failures: usize) -> Self {
            self.failures_before_open.store(failures, Ordering::SeqCst);
            self
        }

        pub fn opens(&self) -> usize {
            self.opens.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LogStreamSource for ScriptedLogs {
        async fn open(
            &self,
            pod: &str,
            _container: &str,
            _options: &TailOptions,
        ) -> Result<LogByteStream> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            if self
                .failures_before_open
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(anyhow!("container not started"));
            }
            let content = self
                .content
                .lock()
                .unwrap()
                .get(pod)
                .cloned()
                .unwrap_or_default();
            Ok(Box::pin(std::io::Cursor::new(content)) as LogByteStream)
        }
    }

    /// An [`tokio::io::AsyncRead`] that never produces data and never ends.
    struct HangingReader;

    impl tokio::io::AsyncRead for HangingReader {
        fn poll_read(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            // Only ever escaped via cancellation, so no waker is needed.
            std::task::Poll::Pending
        }
    }

    /// Scripted logs whose streams deliver their content and then stay
    /// open, like a live follow against a quiet container.
    #[derive(Default)]
    pub struct OpenEndedLogs {
        content: Mutex<HashMap<String, Vec<u8>>>,
    }

    impl OpenEndedLogs {
        pub fn with_log(self, pod: &str, content: &str) -> Self {
            self.content
                .lock()
                .unwrap()
                .insert(pod.to_string(), content.as_bytes().to_vec());
            self
        }
    }

    #[async_trait]
    impl LogStreamSource for OpenEndedLogs {
        async fn open(
            &self,
            pod: &str,
            _container: &str,
            _options: &TailOptions,
        ) -> Result<LogByteStream> {
            use tokio::io::AsyncReadExt;
            let content = self
                .content
                .lock()
                .unwrap()
                .get(pod)
                .cloned()
                .unwrap_or_default();
            let stream = std::io::Cursor::new(content).chain(HangingReader);
            Ok(Box::pin(tokio::io::BufReader::new(stream)) as LogByteStream)
        }
    }
}
