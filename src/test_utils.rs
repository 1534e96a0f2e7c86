//! In-memory port backend for tests and benchmarks
//!
//! [`ScriptedBackend`] hands out transports that replay a shared script of
//! reads, and lets tests make specific ports fail to open. It also counts
//! live transports so tests can assert that no port is left open.

#![cfg(any(test, feature = "benchmark"))]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::transport::{LinkSettings, PortBackend, Transport};
use crate::{Result, SimulatorError};

/// One scripted read.
#[derive(Debug, Clone)]
pub enum ScriptedRead {
    /// A line of bytes
    Line(Vec<u8>),
    /// A read that fails with an I/O error
    Error,
    /// A read that never completes
    Hang,
}

impl ScriptedRead {
    pub fn line(text: &str) -> Self {
        ScriptedRead::Line(text.as_bytes().to_vec())
    }
}

#[derive(Debug, Default)]
struct Shared {
    reads: Mutex<VecDeque<ScriptedRead>>,
    open_failures: Mutex<HashMap<String, usize>>,
    opened: AtomicUsize,
    live: AtomicUsize,
}

/// Backend whose ports and reads are scripted by the test.
///
/// When the script runs dry, reads return empty lines.
#[derive(Debug, Clone, Default)]
pub struct ScriptedBackend {
    ports: Vec<String>,
    shared: Arc<Shared>,
}

impl ScriptedBackend {
    pub fn with_ports<I, S>(ports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { ports: ports.into_iter().map(Into::into).collect(), shared: Arc::default() }
    }

    /// Append reads to the script.
    pub fn push_reads<I>(&self, reads: I)
    where
        I: IntoIterator<Item = ScriptedRead>,
    {
        lock(&self.shared.reads).extend(reads);
    }

    /// Append text lines to the script.
    pub fn push_lines(&self, lines: &[&str]) {
        self.push_reads(lines.iter().map(|l| ScriptedRead::line(l)));
    }

    /// Make the next `times` opens of `port` fail.
    pub fn fail_opens(&self, port: &str, times: usize) {
        lock(&self.shared.open_failures).insert(port.to_string(), times);
    }

    /// Number of successful opens so far.
    pub fn open_count(&self) -> usize {
        self.shared.opened.load(Ordering::SeqCst)
    }

    /// Number of transports currently alive.
    pub fn live_transports(&self) -> usize {
        self.shared.live.load(Ordering::SeqCst)
    }

    /// Reads left in the script.
    pub fn remaining_reads(&self) -> usize {
        lock(&self.shared.reads).len()
    }
}

#[async_trait::async_trait]
impl PortBackend for ScriptedBackend {
    fn available_ports(&self) -> Result<Vec<String>> {
        Ok(self.ports.clone())
    }

    async fn open(&self, port: &str, _settings: LinkSettings) -> Result<Box<dyn Transport>> {
        {
            let mut failures = lock(&self.shared.open_failures);
            if let Some(remaining) = failures.get_mut(port) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(SimulatorError::port_open_failed(port, "scripted open failure"));
                }
            }
        }
        if !self.ports.iter().any(|p| p == port) {
            return Err(SimulatorError::port_open_failed(port, "no such port"));
        }

        self.shared.opened.fetch_add(1, Ordering::SeqCst);
        self.shared.live.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedTransport { port: port.to_string(), shared: Arc::clone(&self.shared) }))
    }
}

struct ScriptedTransport {
    port: String,
    shared: Arc<Shared>,
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn read_line(&mut self) -> Result<Vec<u8>> {
        // Every read is a suspension point, like a real port
        tokio::task::yield_now().await;

        let next = lock(&self.shared.reads).pop_front();
        match next {
            Some(ScriptedRead::Line(bytes)) => Ok(bytes),
            Some(ScriptedRead::Error) => Err(SimulatorError::Read {
                port: self.port.clone(),
                source: std::io::Error::new(std::io::ErrorKind::BrokenPipe, "scripted"),
            }),
            Some(ScriptedRead::Hang) => std::future::pending().await,
            None => Ok(Vec::new()),
        }
    }

    fn port_name(&self) -> &str {
        &self.port
    }
}

impl Drop for ScriptedTransport {
    fn drop(&mut self) {
        self.shared.live.fetch_sub(1, Ordering::SeqCst);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
