// /////////////////////////////////////////////////////////////////////////////
// Lifo
// SPDX-License-Identifier: MIT
// /////////////////////////////////////////////////////////////////////////////

//! Stream abstractions passed to every command: a `Reader` yields chunks or
//! `read_all`s to a string; a `Writer` accepts strings. Pipeline stages are
//! connected by an in-memory channel pipe; redirections and command
//! substitution use a buffer.

use async_trait::async_trait;
use tokio::io::{AsyncWriteExt, Stdout};
use tokio::sync::mpsc;
use tokio::sync::Mutex;

/// A reader yields chunks one at a time, or `None` at end of stream.
#[async_trait]
pub trait CommandReader: Send + Sync {
    async fn read(&mut self) -> Option<String>;

    async fn read_all(&mut self) -> String {
        let mut out = String::new();
        while let Some(chunk) = self.read().await {
            out.push_str(&chunk);
        }
        out
    }
}

/// A writer accepts strings.
#[async_trait]
pub trait CommandWriter: Send + Sync {
    async fn write(&mut self, data: &str) -> std::io::Result<()>;

    async fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// A reader with nothing behind it: `read` always returns `None`.
pub struct EmptyReader;

#[async_trait]
impl CommandReader for EmptyReader {
    async fn read(&mut self) -> Option<String> {
        None
    }
}

/// A reader that yields the whole of a preloaded string exactly once, then
/// `None` — used to feed `<`-redirected file content or a fixed string to
/// stdin.
pub struct StringReader {
    remaining: Option<String>,
}

impl StringReader {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            remaining: Some(content.into()),
        }
    }
}

#[async_trait]
impl CommandReader for StringReader {
    async fn read(&mut self) -> Option<String> {
        self.remaining.take()
    }
}

/// A writer that discards everything written to it (`/dev/null`).
pub struct NullWriter;

#[async_trait]
impl CommandWriter for NullWriter {
    async fn write(&mut self, _data: &str) -> std::io::Result<()> {
        Ok(())
    }
}

/// A writer that appends to an in-memory buffer, shared behind an `Arc`.
/// Used for command substitution capture and for tests.
#[derive(Clone, Default)]
pub struct CapturingWriter {
    buffer: std::sync::Arc<Mutex<String>>,
}

impl CapturingWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn into_string(self) -> String {
        std::mem::take(&mut *self.buffer.lock().await)
    }

    pub async fn contents(&self) -> String {
        self.buffer.lock().await.clone()
    }
}

#[async_trait]
impl CommandWriter for CapturingWriter {
    async fn write(&mut self, data: &str) -> std::io::Result<()> {
        self.buffer.lock().await.push_str(data);
        Ok(())
    }
}

/// Writer backed by the host process's real stdout/stderr, for the
/// top-level interactive shell. Background pipelines route to a captured
/// stream or the terminal as the embedder chooses.
pub struct HostWriter {
    inner: Stdout,
}

impl HostWriter {
    pub fn stdout() -> Self {
        Self { inner: tokio::io::stdout() }
    }
}

#[async_trait]
impl CommandWriter for HostWriter {
    async fn write(&mut self, data: &str) -> std::io::Result<()> {
        self.inner.write_all(data.as_bytes()).await
    }

    async fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush().await
    }
}

/// One end of an in-memory pipe connecting two pipeline stages: the
/// producer's stdout feeds the consumer's stdin. Closing the sender
/// (dropping `PipeWriter`) causes the reader to observe end-of-stream, the
/// pipe equivalent of a closed file descriptor.
pub struct PipeWriter {
    tx: mpsc::Sender<String>,
}

pub struct PipeReader {
    rx: mpsc::Receiver<String>,
}

/// Create a bounded pipe between two pipeline stages. A small bound keeps
/// a fast producer from buffering unbounded output in memory and gives
/// natural backpressure while still preserving write order.
pub fn pipe() -> (PipeWriter, PipeReader) {
    let (tx, rx) = mpsc::channel(64);
    (PipeWriter { tx }, PipeReader { rx })
}

#[async_trait]
impl CommandWriter for PipeWriter {
    async fn write(&mut self, data: &str) -> std::io::Result<()> {
        self.tx
            .send(data.to_string())
            .await
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed"))
    }
}

#[async_trait]
impl CommandReader for PipeReader {
    async fn read(&mut self) -> Option<String> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pipe_delivers_chunks_in_order() {
        let (mut w, mut r) = pipe();
        w.write("a").await.unwrap();
        w.write("b").await.unwrap();
        drop(w);
        assert_eq!(r.read().await, Some("a".to_string()));
        assert_eq!(r.read().await, Some("b".to_string()));
        assert_eq!(r.read().await, None);
    }

    #[tokio::test]
    async fn capturing_writer_accumulates() {
        let mut w = CapturingWriter::new();
        w.write("hello ").await.unwrap();
        w.write("world").await.unwrap();
        assert_eq!(w.contents().await, "hello world");
    }

    #[tokio::test]
    async fn string_reader_yields_once_then_ends() {
        let mut r = StringReader::new("hi");
        assert_eq!(r.read().await, Some("hi".to_string()));
        assert_eq!(r.read().await, None);
    }

    #[tokio::test]
    async fn read_all_concatenates_chunks() {
        let (mut w, mut r) = pipe();
        tokio::spawn(async move {
            w.write("one ").await.unwrap();
            w.write("two").await.unwrap();
        });
        assert_eq!(r.read_all().await, "one two");
    }
}
