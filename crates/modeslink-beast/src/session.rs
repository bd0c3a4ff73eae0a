//! The serial input session.
//!
//! A [`SerialSession`] owns the link to one receiver and runs the whole
//! adaptation loop: open the port, push settings, deframe the byte stream,
//! hunt for the baud rate, detect the receiver family, and recover from
//! errors by reconnecting. All of that happens on a background task that
//! owns the transport exclusively; the handle talks to it over a command
//! channel, so `set_filter` and friends never race the byte stream.
//!
//! The task is a single `tokio::select!` loop over the command channel,
//! the three timers (autobaud advance, radarcape detection, reconnect),
//! and the one outstanding read. Completion of any arm runs its handler
//! before anything else is polled, which keeps the session state
//! consistent without locks.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use modeslink_core::error::{Error, Result};
use modeslink_core::filter::Filter;
use modeslink_core::settings::{ResolvedSettings, Settings};
use modeslink_core::transport::Transport;
use modeslink_core::types::{Message, MessageType, ReceiverType};
use modeslink_transport::SerialTransport;

use crate::autobaud::AutobaudController;
use crate::detect::{ReceiverDetector, RADARCAPE_DETECT_INTERVAL};
use crate::frame::{Deframer, ParseEvent, RawFrame};

/// Bytes to request per serial read. The buffer is reused across reads.
pub const READ_BUFFER_SIZE: usize = 4096;

/// How long to wait before reopening the port after an error.
pub const RECONNECT_INTERVAL: Duration = Duration::from_secs(15);

/// Callback invoked for every delivered message, synchronously from the
/// session task. It must not block.
pub type MessageNotifier = Arc<dyn Fn(Message) + Send + Sync>;

/// Requests from the handle to the session task.
enum Command {
    /// Replace the downstream filter.
    SetFilter(Filter),
    /// Install the downstream message consumer.
    SetNotifier(MessageNotifier),
    /// Shut down; reply once the transport is released.
    Close { done: oneshot::Sender<()> },
}

/// Where the session task gets its transport from.
pub(crate) enum TransportSource {
    /// Open the configured device path; a fresh transport per start.
    Device,
    /// A caller-provided transport (tests); consumed by the first start.
    Provided(Mutex<Option<Box<dyn Transport>>>),
}

/// Handle state shared with whoever clones the session around.
struct Shared {
    cmd_tx: Option<mpsc::UnboundedSender<Command>>,
    task: Option<JoinHandle<()>>,
    /// Latest filter, re-applied if the task is respawned.
    filter: Filter,
    /// Latest notifier, re-applied if the task is respawned.
    notifier: Option<MessageNotifier>,
}

/// A serial input session for one Beast/Radarcape receiver.
///
/// Created via [`SessionBuilder`](crate::builder::SessionBuilder). After
/// [`start`](SerialSession::start) the session self-manages: it hunts for
/// the baud rate, autodetects the receiver family, pushes settings, and
/// reconnects after errors, until [`close`](SerialSession::close) is
/// called. The only user-facing sign of trouble is silence on the message
/// notifier.
pub struct SerialSession {
    path: String,
    fixed_baud_rate: Option<u32>,
    fixed_settings: Settings,
    source: TransportSource,
    shared: Mutex<Shared>,
}

impl SerialSession {
    pub(crate) fn new(
        path: String,
        fixed_baud_rate: Option<u32>,
        fixed_settings: Settings,
        filter: Filter,
        source: TransportSource,
    ) -> SerialSession {
        SerialSession {
            path,
            fixed_baud_rate,
            fixed_settings,
            source,
            shared: Mutex::new(Shared {
                cmd_tx: None,
                task: None,
                filter,
                notifier: None,
            }),
        }
    }

    /// The device path this session talks to.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Start (or restart) the session.
    ///
    /// Idempotent: calling this while the session is running is a no-op.
    /// Must be called from within a tokio runtime. A session built with a
    /// provided transport can only be started once; restarting after
    /// [`close`](Self::close) returns [`Error::Closed`] for those.
    pub fn start(&self) -> Result<()> {
        let mut shared = self.shared.lock().unwrap();
        if let Some(task) = &shared.task {
            if !task.is_finished() {
                return Ok(());
            }
        }

        let transport: Box<dyn Transport> = match &self.source {
            TransportSource::Device => Box::new(SerialTransport::new(&self.path)),
            TransportSource::Provided(slot) => {
                slot.lock().unwrap().take().ok_or(Error::Closed)?
            }
        };

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let task = SessionTask {
            path: self.path.clone(),
            transport,
            port_open: false,
            fixed_settings: self.fixed_settings,
            filter: shared.filter.clone(),
            notifier: shared.notifier.clone(),
            deframer: Deframer::new(),
            autobaud: AutobaudController::new(self.fixed_baud_rate),
            detector: ReceiverDetector::from_settings(&self.fixed_settings),
            autobaud_deadline: None,
            detect_deadline: None,
            reconnect_deadline: None,
        };

        shared.task = Some(tokio::spawn(task.run(cmd_rx)));
        shared.cmd_tx = Some(cmd_tx);
        Ok(())
    }

    /// Shut the session down: cancel the timers and any in-flight read,
    /// release the serial handle, and wait for the task to finish. No
    /// notifier callbacks happen after this returns.
    pub async fn close(&self) {
        let (cmd_tx, task) = {
            let mut shared = self.shared.lock().unwrap();
            (shared.cmd_tx.take(), shared.task.take())
        };

        if let Some(cmd_tx) = cmd_tx {
            let (done_tx, done_rx) = oneshot::channel();
            if cmd_tx.send(Command::Close { done: done_tx }).is_ok() {
                let _ = done_rx.await;
            }
        }
        if let Some(task) = task {
            let _ = task.await;
        }
    }

    /// Replace the downstream filter.
    ///
    /// The filter gates what reaches the message notifier, and its derived
    /// settings shape what the receiver is asked to send in the first
    /// place. If the session is running, the port is open, and the filter
    /// actually changed, the settings are re-sent to the receiver.
    pub fn set_filter(&self, filter: Filter) {
        let mut shared = self.shared.lock().unwrap();
        shared.filter = filter.clone();
        if let Some(cmd_tx) = &shared.cmd_tx {
            let _ = cmd_tx.send(Command::SetFilter(filter));
        }
    }

    /// Install the downstream consumer. The callback runs synchronously on
    /// the session task for every delivered message; it must not block.
    /// While no notifier is installed, delivered messages are dropped.
    pub fn set_message_notifier<F>(&self, notifier: F)
    where
        F: Fn(Message) + Send + Sync + 'static,
    {
        let notifier: MessageNotifier = Arc::new(notifier);
        let mut shared = self.shared.lock().unwrap();
        shared.notifier = Some(notifier.clone());
        if let Some(cmd_tx) = &shared.cmd_tx {
            let _ = cmd_tx.send(Command::SetNotifier(notifier));
        }
    }
}

/// Sleep until the deadline, or forever when there is none.
async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// The state owned by the background task.
struct SessionTask {
    path: String,
    transport: Box<dyn Transport>,
    /// Tracked separately from the transport so the read arm of the select
    /// loop can be gated without touching the transport.
    port_open: bool,
    fixed_settings: Settings,
    filter: Filter,
    notifier: Option<MessageNotifier>,
    deframer: Deframer,
    autobaud: AutobaudController,
    detector: ReceiverDetector,
    autobaud_deadline: Option<Instant>,
    detect_deadline: Option<Instant>,
    reconnect_deadline: Option<Instant>,
}

impl SessionTask {
    async fn run(mut self, mut cmd_rx: mpsc::UnboundedReceiver<Command>) {
        let mut readbuf = vec![0u8; READ_BUFFER_SIZE];

        self.open_port().await;

        loop {
            tokio::select! {
                biased;

                // Priority: handle requests from the handle.
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(Command::SetFilter(filter)) => self.apply_filter(filter).await,
                        Some(Command::SetNotifier(notifier)) => self.notifier = Some(notifier),
                        Some(Command::Close { done }) => {
                            self.shutdown().await;
                            let _ = done.send(());
                            return;
                        }
                        None => {
                            // The handle was dropped without close().
                            self.shutdown().await;
                            return;
                        }
                    }
                }

                _ = wait_until(self.autobaud_deadline) => {
                    self.on_autobaud_timer().await;
                }

                _ = wait_until(self.detect_deadline) => {
                    self.on_detect_timeout().await;
                }

                _ = wait_until(self.reconnect_deadline) => {
                    tracing::info!(path = %self.path, "reconnect timer fired");
                    self.reconnect_deadline = None;
                    self.open_port().await;
                }

                // One outstanding read at a time, into the reused buffer.
                result = self.transport.read(&mut readbuf), if self.port_open => {
                    match result {
                        Ok(0) => self.handle_error(&Error::ConnectionLost).await,
                        Ok(n) => {
                            let events = self.deframer.feed(&readbuf[..n]);
                            self.handle_parse_events(events).await;
                        }
                        Err(error) => self.handle_error(&error).await,
                    }
                }
            }
        }
    }

    /// Open the port at the current rate, push settings, and arm the
    /// autobaud and detection timers. Failures land in the error handler,
    /// which schedules a reconnect.
    async fn open_port(&mut self) {
        let baud_rate = self.autobaud.current_rate();
        if let Err(error) = self.transport.open(baud_rate).await {
            self.handle_error(&error).await;
            return;
        }
        self.port_open = true;
        self.deframer.reset();

        self.send_settings().await;
        if !self.port_open {
            return;
        }

        if self.autobaud.timer_needed() {
            self.autobaud_deadline = Some(Instant::now() + self.autobaud.interval());
        }
        if self.detector.needs_detection() {
            self.detect_deadline = Some(Instant::now() + RADARCAPE_DETECT_INTERVAL);
        }
    }

    async fn on_autobaud_timer(&mut self) {
        tracing::debug!("autobaud timer fired");
        self.autobaud_deadline = None;
        self.advance_autobaud().await;
    }

    /// Retune to the next candidate rate and rearm the advance timer.
    async fn advance_autobaud(&mut self) {
        let baud_rate = self.autobaud.advance();
        tracing::info!(baud_rate, "set baud rate");
        if let Err(error) = self.transport.set_baud_rate(baud_rate) {
            self.handle_error(&error).await;
            return;
        }

        self.send_settings().await;

        if self.port_open && self.autobaud.timer_needed() {
            self.autobaud_deadline = Some(Instant::now() + self.autobaud.interval());
        }
    }

    async fn on_detect_timeout(&mut self) {
        self.detect_deadline = None;
        if self.detector.on_detect_timeout() {
            tracing::info!("no status frames seen, assuming beast receiver");
            self.send_settings().await;
        }
    }

    async fn handle_parse_events(&mut self, events: Vec<ParseEvent>) {
        for event in events {
            // An error while dispatching closes the port; the rest of this
            // batch belongs to the dead connection.
            if !self.port_open {
                return;
            }
            match event {
                ParseEvent::Frame(frame) => self.on_frame(frame).await,
                ParseEvent::LostSync => self.on_lost_sync().await,
            }
        }
    }

    async fn on_frame(&mut self, frame: RawFrame) {
        if self.autobaud.on_good_sync() {
            tracing::info!(baud_rate = self.autobaud.current_rate(), "autobaud succeeded");
            self.autobaud_deadline = None;
        }

        // Not convinced of this rate yet; don't act on the traffic.
        if self.autobaud.is_autobauding() {
            return;
        }

        if frame.message_type == MessageType::Status
            && self.detector.on_status_frame(&frame.payload)
        {
            tracing::info!("detected radarcape receiver");
            self.detect_deadline = None;
            self.send_settings().await;
            if !self.port_open {
                return;
            }
        }

        // Until the receiver family is known, the shared settings switch
        // is ambiguous and delivery stays off.
        if self.detector.receiver_type() == ReceiverType::Unknown {
            return;
        }

        if let Some(notifier) = &self.notifier {
            let message = frame.into_message(self.detector.timestamp_kind());
            if self.filter.accepts(&message) {
                notifier(message);
            }
        }
    }

    async fn on_lost_sync(&mut self) {
        tracing::debug!("lost sync with input stream");
        if self.autobaud.on_lost_sync() {
            tracing::info!("restarting autobaud");
            self.advance_autobaud().await;
        }
    }

    async fn apply_filter(&mut self, filter: Filter) {
        if filter == self.filter {
            return;
        }
        tracing::debug!(filter = %filter, "filter changed");
        self.filter = filter;
        if self.port_open {
            self.send_settings().await;
        }
    }

    /// Encode and write the effective settings. Write failures go through
    /// the error handler like any other I/O failure.
    async fn send_settings(&mut self) {
        if !self.port_open {
            return;
        }
        let settings = self.effective_settings();
        tracing::debug!(settings = %settings, "sending settings");
        if let Err(error) = self.transport.write_all(&settings.to_message()).await {
            self.handle_error(&error).await;
        }
    }

    /// Fixed settings win over filter-derived defaults; the detected
    /// receiver family then decides the meaning of the shared switch.
    fn effective_settings(&self) -> ResolvedSettings {
        let mut resolved = (self.fixed_settings | Settings::derived_from(&self.filter)).resolve();
        match self.detector.receiver_type() {
            ReceiverType::Radarcape => resolved.radarcape = true,
            ReceiverType::Beast => resolved.radarcape = false,
            ReceiverType::Unknown => {}
        }
        resolved
    }

    /// Error policy for everything but shutdown: drop the connection,
    /// rewind the adaptation state, and try again after a pause.
    async fn handle_error(&mut self, error: &Error) {
        tracing::warn!(path = %self.path, error = %error, "got error");

        self.port_open = false;
        self.autobaud_deadline = None;
        self.detect_deadline = None;
        let _ = self.transport.close().await;

        self.autobaud.reset();
        self.detector.reset();

        tracing::info!(
            delay_secs = RECONNECT_INTERVAL.as_secs(),
            "waiting before reconnecting"
        );
        self.reconnect_deadline = Some(Instant::now() + RECONNECT_INTERVAL);
    }

    async fn shutdown(&mut self) {
        tracing::debug!(path = %self.path, "closing session");
        self.port_open = false;
        self.autobaud_deadline = None;
        self.detect_deadline = None;
        self.reconnect_deadline = None;
        let _ = self.transport.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::SessionBuilder;
    use modeslink_core::types::{TimestampKind, ESCAPE};
    use modeslink_test_harness::MockTransport;
    use tokio::sync::mpsc::error::TryRecvError;

    /// Encode a frame the way the receiver would, doubling escapes.
    fn encode_frame(type_byte: u8, metadata: &[u8; 7], payload: &[u8]) -> Vec<u8> {
        let mut out = vec![ESCAPE, type_byte];
        for &b in metadata.iter().chain(payload.iter()) {
            out.push(b);
            if b == ESCAPE {
                out.push(ESCAPE);
            }
        }
        out
    }

    fn mode_s_short_frame() -> Vec<u8> {
        encode_frame(
            0x32,
            &[0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0xFF],
            &[0x28, 0x00, 0x1B, 0xB8, 0x30, 0x50, 0x4D],
        )
    }

    fn status_frame(first_payload_byte: u8) -> Vec<u8> {
        let mut payload = [0u8; 14];
        payload[0] = first_payload_byte;
        encode_frame(0x34, &[0u8; 7], &payload)
    }

    /// Fixed settings that skip receiver autodetection.
    fn beast_settings() -> Settings {
        Settings {
            radarcape: Some(false),
            ..Settings::default()
        }
    }

    fn collector() -> (MessageNotifier, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let notifier: MessageNotifier = Arc::new(move |message| {
            let _ = tx.send(message);
        });
        (notifier, rx)
    }

    /// Let the session task run everything that is ready.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn settings_sent_after_open() {
        let (mock, handle) = MockTransport::new();
        let session = SessionBuilder::new("/dev/mock")
            .fixed_baud_rate(3_000_000)
            .fixed_settings(beast_settings())
            .build_with_transport(Box::new(mock));

        session.start().unwrap();
        settle().await;

        assert_eq!(handle.opens(), vec![3_000_000]);
        let sent = handle.sent();
        assert_eq!(sent.len(), 1);
        // Default filter accepts everything: CRC checks off, FEC on,
        // Mode A/C on, no prefilters, beast meaning for the g switch.
        assert_eq!(
            sent[0],
            vec![
                0x1A, b'1', b'C',
                0x1A, b'1', b'd',
                0x1A, b'1', b'e',
                0x1A, b'1', b'F',
                0x1A, b'1', b'g',
                0x1A, b'1', b'H',
                0x1A, b'1', b'i',
                0x1A, b'1', b'J',
            ]
        );

        session.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn fixed_rate_delivers_immediately() {
        let (mock, handle) = MockTransport::new();
        let session = SessionBuilder::new("/dev/mock")
            .fixed_baud_rate(1_000_000)
            .fixed_settings(beast_settings())
            .build_with_transport(Box::new(mock));
        let (notifier, mut rx) = collector();
        session.set_message_notifier(move |m| notifier(m));

        session.start().unwrap();
        settle().await;

        let mut input = vec![0x00];
        input.extend(mode_s_short_frame());
        handle.push(&input);
        settle().await;

        let message = rx.try_recv().unwrap();
        assert_eq!(message.message_type, MessageType::ModeSShort);
        assert_eq!(message.timestamp_kind, TimestampKind::TwelveMeg);
        assert_eq!(message.timestamp, 0x0001_0203_0405);
        assert_eq!(message.signal, 0xFF);
        assert_eq!(message.payload, vec![0x28, 0x00, 0x1B, 0xB8, 0x30, 0x50, 0x4D]);

        session.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn autobaud_suppresses_delivery_until_pinned() {
        let (mock, handle) = MockTransport::new();
        let session = SessionBuilder::new("/dev/mock")
            .fixed_settings(beast_settings())
            .build_with_transport(Box::new(mock));
        let (notifier, mut rx) = collector();
        session.set_message_notifier(move |m| notifier(m));

        session.start().unwrap();
        settle().await;

        // 49 clean frames: not yet convinced of the rate.
        let mut input = vec![0x00];
        for _ in 0..49 {
            input.extend(mode_s_short_frame());
        }
        handle.push(&input);
        settle().await;
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

        // The 50th pins the rate and is itself delivered.
        handle.push(&mode_s_short_frame());
        settle().await;
        assert!(rx.try_recv().is_ok());
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

        session.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn autobaud_walks_rates_on_silence() {
        let (mock, handle) = MockTransport::new();
        let session = SessionBuilder::new("/dev/mock")
            .fixed_settings(beast_settings())
            .build_with_transport(Box::new(mock));

        session.start().unwrap();
        settle().await;
        assert_eq!(handle.opens(), vec![3_000_000]);

        // A silent line: one advance per second through the preference
        // list, then a wrap back to the head with a doubled interval.
        tokio::time::sleep(Duration::from_millis(5500)).await;
        assert_eq!(
            handle.baud_changes(),
            vec![1_000_000, 921_600, 230_400, 115_200, 3_000_000]
        );
        // Settings go out after the open and after every retune.
        assert_eq!(handle.sent().len(), 6);

        // The doubled interval: next advance two seconds after the wrap.
        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(handle.baud_changes().last(), Some(&1_000_000));

        session.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn read_error_schedules_reconnect() {
        let (mock, handle) = MockTransport::new();
        let session = SessionBuilder::new("/dev/mock")
            .fixed_baud_rate(1_000_000)
            .fixed_settings(beast_settings())
            .build_with_transport(Box::new(mock));

        session.start().unwrap();
        settle().await;
        assert_eq!(handle.opens().len(), 1);

        handle.push_read_error();
        settle().await;
        assert!(!handle.is_open());

        // Not yet: the reconnect interval hasn't elapsed.
        tokio::time::sleep(Duration::from_millis(14_000)).await;
        assert_eq!(handle.opens().len(), 1);

        // After the interval the port reopens and settings go out again.
        tokio::time::sleep(Duration::from_millis(2_000)).await;
        assert_eq!(handle.opens().len(), 2);
        assert_eq!(handle.sent().len(), 2);

        session.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn status_frame_resolves_radarcape_and_reclassifies_timestamps() {
        let (mock, handle) = MockTransport::new();
        // Fixed rate, but the receiver family is left to autodetection.
        let session = SessionBuilder::new("/dev/mock")
            .fixed_baud_rate(3_000_000)
            .build_with_transport(Box::new(mock));
        let (notifier, mut rx) = collector();
        session.set_message_notifier(move |m| notifier(m));

        session.start().unwrap();
        settle().await;
        assert_eq!(handle.sent().len(), 1);

        // A status frame with the GPS bit set arrives before the
        // detection window closes.
        let mut input = vec![0x00];
        input.extend(status_frame(0x10));
        handle.push(&input);
        settle().await;

        // Settings were re-sent for the radarcape, with the shared switch
        // now carrying the GPS-timestamp meaning.
        let sent = handle.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1][14], b'G');

        // The resolving status frame itself is delivered, GPS-stamped.
        let message = rx.try_recv().unwrap();
        assert_eq!(message.message_type, MessageType::Status);
        assert_eq!(message.timestamp_kind, TimestampKind::Gps);

        // So is subsequent traffic.
        handle.push(&mode_s_short_frame());
        settle().await;
        let message = rx.try_recv().unwrap();
        assert_eq!(message.message_type, MessageType::ModeSShort);
        assert_eq!(message.timestamp_kind, TimestampKind::Gps);

        session.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn detect_timeout_resolves_beast() {
        let (mock, handle) = MockTransport::new();
        let session = SessionBuilder::new("/dev/mock")
            .fixed_baud_rate(3_000_000)
            .build_with_transport(Box::new(mock));
        let (notifier, mut rx) = collector();
        session.set_message_notifier(move |m| notifier(m));

        session.start().unwrap();
        settle().await;

        // Traffic before the family is known is parsed but not delivered.
        let mut input = vec![0x00];
        input.extend(mode_s_short_frame());
        handle.push(&input);
        settle().await;
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

        // The detection window closes without a status frame.
        tokio::time::sleep(RADARCAPE_DETECT_INTERVAL + Duration::from_millis(100)).await;
        assert_eq!(handle.sent().len(), 2);

        handle.push(&mode_s_short_frame());
        settle().await;
        let message = rx.try_recv().unwrap();
        assert_eq!(message.timestamp_kind, TimestampKind::TwelveMeg);

        session.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn status_frame_during_autobaud_does_not_resolve() {
        let (mock, handle) = MockTransport::new();
        let session = SessionBuilder::new("/dev/mock").build_with_transport(Box::new(mock));

        session.start().unwrap();
        settle().await;
        assert_eq!(handle.sent().len(), 1);

        // One status frame while still hunting: no resolution, no
        // settings re-send, nothing delivered.
        let mut input = vec![0x00];
        input.extend(status_frame(0x10));
        handle.push(&input);
        settle().await;
        assert_eq!(handle.sent().len(), 1);

        session.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn filter_change_repropagates_settings() {
        let (mock, handle) = MockTransport::new();
        let session = SessionBuilder::new("/dev/mock")
            .fixed_baud_rate(1_000_000)
            .fixed_settings(beast_settings())
            .build_with_transport(Box::new(mock));

        session.start().unwrap();
        settle().await;
        assert_eq!(handle.sent().len(), 1);

        let mut narrow = Filter::default();
        narrow.receive_df[11] = true;
        narrow.receive_df[17] = true;
        session.set_filter(narrow.clone());
        settle().await;

        let sent = handle.sent();
        assert_eq!(sent.len(), 2);
        // DF11/17 prefilter switched on.
        assert_eq!(sent[1][5], b'D');

        // Setting the same filter again is a no-op.
        session.set_filter(narrow);
        settle().await;
        assert_eq!(handle.sent().len(), 2);

        session.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn filter_gates_delivery_to_the_notifier() {
        let (mock, handle) = MockTransport::new();
        let session = SessionBuilder::new("/dev/mock")
            .fixed_baud_rate(1_000_000)
            .fixed_settings(beast_settings())
            .build_with_transport(Box::new(mock));
        let (notifier, mut rx) = collector();
        session.set_message_notifier(move |m| notifier(m));

        let mut narrow = Filter::default();
        narrow.receive_df[17] = true;
        session.set_filter(narrow);

        session.start().unwrap();
        settle().await;

        // The receiver may keep sending DF5 replies regardless of what it
        // was asked for; the filter stops them short of the notifier.
        let mut input = vec![0x00];
        input.extend(mode_s_short_frame()); // DF 5
        handle.push(&input);
        settle().await;
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

        // A DF17 extended squitter passes.
        let mut payload = [0u8; 14];
        payload[0] = 17 << 3;
        handle.push(&encode_frame(0x33, &[0u8; 7], &payload));
        settle().await;
        let message = rx.try_recv().unwrap();
        assert_eq!(message.payload[0], 17 << 3);

        session.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn unset_notifier_drops_messages() {
        let (mock, handle) = MockTransport::new();
        let session = SessionBuilder::new("/dev/mock")
            .fixed_baud_rate(1_000_000)
            .fixed_settings(beast_settings())
            .build_with_transport(Box::new(mock));

        session.start().unwrap();
        settle().await;

        // No notifier installed: frames vanish.
        let mut input = vec![0x00];
        input.extend(mode_s_short_frame());
        input.extend(mode_s_short_frame());
        handle.push(&input);
        settle().await;

        // Installing one only affects traffic from here on.
        let (notifier, mut rx) = collector();
        session.set_message_notifier(move |m| notifier(m));
        settle().await;

        handle.push(&mode_s_short_frame());
        settle().await;
        assert!(rx.try_recv().is_ok());
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

        session.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn close_releases_transport_and_stops_callbacks() {
        let (mock, handle) = MockTransport::new();
        let session = SessionBuilder::new("/dev/mock")
            .fixed_baud_rate(1_000_000)
            .fixed_settings(beast_settings())
            .build_with_transport(Box::new(mock));
        let (notifier, mut rx) = collector();
        session.set_message_notifier(move |m| notifier(m));

        session.start().unwrap();
        settle().await;
        session.close().await;
        assert!(!handle.is_open());

        // Bytes arriving after close go nowhere.
        let mut input = vec![0x00];
        input.extend(mode_s_short_frame());
        handle.push(&input);
        settle().await;
        assert!(rx.try_recv().is_err());

        // A provided transport is gone for good.
        assert!(matches!(session.start(), Err(Error::Closed)));
    }

    #[tokio::test(start_paused = true)]
    async fn start_is_idempotent() {
        let (mock, handle) = MockTransport::new();
        let session = SessionBuilder::new("/dev/mock")
            .fixed_baud_rate(1_000_000)
            .fixed_settings(beast_settings())
            .build_with_transport(Box::new(mock));

        session.start().unwrap();
        settle().await;
        session.start().unwrap();
        settle().await;

        assert_eq!(handle.opens().len(), 1);
        session.close().await;
    }
}
