//! # Output Sink Module / 输出接收器模块
//!
//! Task output is buffered in full while the subprocess runs and handed to an
//! [`OutputSink`] as one block. The sink writes each block under a single lock,
//! so blocks of concurrently running tasks never interleave.
//!
//! 任务输出在子进程运行期间被完整缓冲，然后作为一个整体块交给 [`OutputSink`]。
//! 接收器在单个锁内写入每个块，因此并发任务的输出块永远不会交错。

use once_cell::sync::Lazy;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};

static STDOUT_SINK: Lazy<OutputSink> = Lazy::new(|| OutputSink::from_writer(io::stdout()));

/// A shared destination for task output blocks.
#[derive(Clone)]
pub struct OutputSink {
    inner: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl OutputSink {
    /// The process-wide sink writing to standard output.
    pub fn stdout() -> Self {
        STDOUT_SINK.clone()
    }

    pub fn from_writer<W>(writer: W) -> Self
    where
        W: Write + Send + 'static,
    {
        Self {
            inner: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Writes `block` contiguously and flushes it.
    pub fn emit_block(&self, block: &[u8]) -> io::Result<()> {
        let mut writer = self.lock();
        writer.write_all(block)?;
        writer.flush()
    }

    fn lock(&self) -> MutexGuard<'_, Box<dyn Write + Send>> {
        // Poisoning only means another writer panicked mid-block.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// An in-memory writer whose contents can be inspected after the fact.
///
/// 一个内存写入器，其内容可以在事后检查。
#[derive(Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of everything written so far.
    pub fn contents(&self) -> Vec<u8> {
        self.bytes
            .lock()
            .map(|bytes| bytes.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Everything written so far as text, with invalid UTF-8 replaced.
    pub fn contents_lossy(&self) -> String {
        String::from_utf8_lossy(&self.contents()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut bytes = self
            .bytes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
