//! Mock transport for deterministic testing of the input engine.
//!
//! [`MockTransport`] implements the [`Transport`] trait over an in-memory
//! byte queue. The Beast link is receiver-driven -- bytes flow in
//! unprompted and the engine's writes are fire-and-forget -- so unlike a
//! request/response mock this one is a push stream: the paired
//! [`MockHandle`] feeds read data (or injects read errors) at any point
//! and inspects everything the engine sent, opened, and retuned.
//!
//! A transport with no queued data behaves like a silent serial line: the
//! read simply never completes, which is exactly what timer-driven tests
//! (autobaud advance, receiver detection timeout) need.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use modeslink_core::error::{Error, Result};
use modeslink_core::transport::Transport;

/// One scripted read outcome.
enum ReadStep {
    /// Bytes to deliver, possibly across several reads.
    Data(Vec<u8>),
    /// Fail the read that reaches this step.
    Error,
}

/// State shared between the transport and its handle.
struct Shared {
    /// Whether the transport is currently open.
    open: AtomicBool,
    /// The baud rate passed to each `open` call.
    opens: Mutex<Vec<u32>>,
    /// The baud rate passed to each `set_baud_rate` call.
    baud_changes: Mutex<Vec<u32>>,
    /// Every buffer passed to `write_all`, in order.
    sent: Mutex<Vec<Vec<u8>>>,
}

/// A mock [`Transport`] for exercising the input engine without hardware.
pub struct MockTransport {
    steps: mpsc::UnboundedReceiver<ReadStep>,
    /// Remainder of a data step not yet handed out by `read`.
    pending: VecDeque<u8>,
    shared: Arc<Shared>,
}

/// Test-side handle to a [`MockTransport`] that has been handed to the
/// engine.
#[derive(Clone)]
pub struct MockHandle {
    steps: mpsc::UnboundedSender<ReadStep>,
    shared: Arc<Shared>,
}

impl MockTransport {
    /// Create a transport and the handle used to script and observe it.
    pub fn new() -> (MockTransport, MockHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            open: AtomicBool::new(false),
            opens: Mutex::new(Vec::new()),
            baud_changes: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
        });
        (
            MockTransport {
                steps: rx,
                pending: VecDeque::new(),
                shared: shared.clone(),
            },
            MockHandle { steps: tx, shared },
        )
    }
}

impl MockHandle {
    /// Queue bytes for the engine to read.
    pub fn push(&self, bytes: &[u8]) {
        let _ = self.steps.send(ReadStep::Data(bytes.to_vec()));
    }

    /// Make the read that drains the queue up to this point fail.
    pub fn push_read_error(&self) {
        let _ = self.steps.send(ReadStep::Error);
    }

    /// Everything the engine has written, one entry per `write_all`.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.shared.sent.lock().unwrap().clone()
    }

    /// The baud rate of every `open` call so far.
    pub fn opens(&self) -> Vec<u32> {
        self.shared.opens.lock().unwrap().clone()
    }

    /// The baud rate of every in-place retune so far.
    pub fn baud_changes(&self) -> Vec<u32> {
        self.shared.baud_changes.lock().unwrap().clone()
    }

    /// Whether the transport is currently open.
    pub fn is_open(&self) -> bool {
        self.shared.open.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn open(&mut self, baud_rate: u32) -> Result<()> {
        self.shared.opens.lock().unwrap().push(baud_rate);
        self.shared.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if !self.shared.open.load(Ordering::SeqCst) {
            return Err(Error::NotConnected);
        }

        loop {
            if !self.pending.is_empty() {
                let n = self.pending.len().min(buf.len());
                for slot in buf.iter_mut().take(n) {
                    *slot = self.pending.pop_front().unwrap_or(0);
                }
                return Ok(n);
            }

            match self.steps.recv().await {
                Some(ReadStep::Data(bytes)) => self.pending.extend(bytes),
                Some(ReadStep::Error) => return Err(Error::ConnectionLost),
                // Handle dropped: behave like a line that went quiet.
                None => std::future::pending().await,
            }
        }
    }

    async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        if !self.shared.open.load(Ordering::SeqCst) {
            return Err(Error::NotConnected);
        }
        self.shared.sent.lock().unwrap().push(data.to_vec());
        Ok(())
    }

    fn set_baud_rate(&mut self, baud_rate: u32) -> Result<()> {
        if !self.shared.open.load(Ordering::SeqCst) {
            return Err(Error::NotConnected);
        }
        self.shared.baud_changes.lock().unwrap().push(baud_rate);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.shared.open.store(false, Ordering::SeqCst);
        // Bytes queued for the old connection are stale.
        self.pending.clear();
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.shared.open.load(Ordering::SeqCst)
    }
}
