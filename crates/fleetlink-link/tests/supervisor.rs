//! Integration tests for the reconnect loop.
//!
//! Time is paused: sleeps resolve as soon as every task is idle, and
//! `tokio::time::Instant` reports the virtual clock, so backoff delays can
//! be asserted exactly without waiting for them.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fleetlink_link::{
    BackoffConfig, ControllerConnection, ControllerListener, LinkError, LinkState, Supervisor,
};
use fleetlink_protocol::{
    Authentication, Codec, LinkServer, Message, MsgPackCodec, Ping, Pong, Request, ServerKind,
    TransportPlayer, UnlinkServer,
};
use fleetlink_transport::{Connection, Connector, FramedConnection, TransportError};
use tokio::io::DuplexStream;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::field::{Field, Visit};
use tracing::{Event as LogEvent, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

// =========================================================================
// Helpers
// =========================================================================

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Refuse,
    Accept,
}

/// One connect attempt as seen from the controller side.
struct Attempt {
    at: Instant,
    peer: Option<FramedConnection>,
}

/// Connector that follows a script of outcomes, then refuses forever.
struct ScriptedConnector {
    script: Mutex<VecDeque<Outcome>>,
    attempts: mpsc::UnboundedSender<Attempt>,
}

impl ScriptedConnector {
    fn new(script: impl IntoIterator<Item = Outcome>) -> (Self, mpsc::UnboundedReceiver<Attempt>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connector = Self {
            script: Mutex::new(script.into_iter().collect()),
            attempts: tx,
        };
        (connector, rx)
    }
}

impl Connector for ScriptedConnector {
    type Stream = DuplexStream;

    async fn connect(&self) -> Result<DuplexStream, TransportError> {
        let outcome = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Outcome::Refuse);
        let at = Instant::now();

        match outcome {
            Outcome::Refuse => {
                let _ = self.attempts.send(Attempt { at, peer: None });
                Err(TransportError::Connect {
                    addr: "controller:25550".into(),
                    source: std::io::ErrorKind::ConnectionRefused.into(),
                })
            }
            Outcome::Accept => {
                let (ours, theirs) = tokio::io::duplex(64 * 1024);
                let _ = self.attempts.send(Attempt {
                    at,
                    peer: Some(FramedConnection::new(theirs)),
                });
                Ok(ours)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Connected,
    Disconnected,
    Linked(String),
    Unlinked(String),
    Transported(String, String),
    Requested(ServerKind),
    Pinged(i32),
}

/// Listener that authenticates as a lobby and reports every callback.
struct RecordingListener {
    events: mpsc::UnboundedSender<Event>,
    reject_connect: bool,
}

impl RecordingListener {
    fn new() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let listener = Self {
            events: tx,
            reject_connect: false,
        };
        (listener, rx)
    }

    fn record(&self, event: Event) {
        let _ = self.events.send(event);
    }
}

impl ControllerListener for RecordingListener {
    async fn on_connect(&self, conn: &Arc<ControllerConnection>) -> Result<(), LinkError> {
        if self.reject_connect {
            return Err(LinkError::Closed(conn.id()));
        }
        conn.write(Authentication {
            name: "lobby-1".into(),
            ip: "0.0.0.0:25565".into(),
            kind: ServerKind::Lobby,
        })
        .await?;
        self.record(Event::Connected);
        Ok(())
    }

    async fn on_disconnect(&self) {
        self.record(Event::Disconnected);
    }

    async fn on_link_server(
        &self,
        _conn: &ControllerConnection,
        packet: LinkServer,
    ) -> Result<(), LinkError> {
        self.record(Event::Linked(packet.name));
        Ok(())
    }

    async fn on_unlink_server(
        &self,
        _conn: &ControllerConnection,
        packet: UnlinkServer,
    ) -> Result<(), LinkError> {
        self.record(Event::Unlinked(packet.name));
        Ok(())
    }

    async fn on_transport_player(
        &self,
        _conn: &ControllerConnection,
        packet: TransportPlayer,
    ) -> Result<(), LinkError> {
        self.record(Event::Transported(packet.player, packet.to));
        Ok(())
    }

    async fn on_request(&self, _conn: &ControllerConnection, packet: Request) -> Result<(), LinkError> {
        self.record(Event::Requested(packet.kind));
        Ok(())
    }

    async fn on_ping(&self, conn: &ControllerConnection, packet: Ping) -> Result<(), LinkError> {
        self.record(Event::Pinged(packet.timer));
        conn.write(Pong { timer: packet.timer }).await
    }
}

async fn next_attempt(attempts: &mut mpsc::UnboundedReceiver<Attempt>) -> Attempt {
    attempts.recv().await.expect("connector dropped")
}

async fn next_event(events: &mut mpsc::UnboundedReceiver<Event>) -> Event {
    events.recv().await.expect("listener dropped")
}

async fn read_message(peer: &FramedConnection) -> Message {
    let frame = peer.recv().await.unwrap().expect("satellite closed the stream");
    MsgPackCodec.decode_message(&frame).unwrap()
}

async fn send_message(peer: &FramedConnection, message: impl Into<Message>) {
    let bytes = MsgPackCodec.encode_message(&message.into()).unwrap();
    peer.send(&bytes).await.unwrap();
}

/// Layer that keeps the level and message of every log event.
#[derive(Clone, Default)]
struct LogCapture {
    lines: Arc<Mutex<Vec<(Level, String)>>>,
}

impl LogCapture {
    fn level_of(&self, message: &str) -> Option<Level> {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .find(|(_, m)| m == message)
            .map(|(level, _)| *level)
    }
}

struct MessageField(String);

impl Visit for MessageField {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl<S: Subscriber> Layer<S> for LogCapture {
    fn on_event(&self, event: &LogEvent<'_>, _ctx: Context<'_, S>) {
        let mut message = MessageField(String::new());
        event.record(&mut message);
        self.lines
            .lock()
            .unwrap()
            .push((*event.metadata().level(), message.0));
    }
}

fn assert_close(actual: Duration, expected: Duration) {
    let diff = actual.abs_diff(expected);
    assert!(
        diff <= Duration::from_millis(5),
        "expected ~{expected:?}, got {actual:?}"
    );
}

// =========================================================================
// Backoff timing
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_backoff_doubles_then_resets_after_session() {
    use Outcome::*;
    let (connector, mut attempts) = ScriptedConnector::new([Refuse, Refuse, Refuse, Refuse, Accept]);
    let (listener, mut events) = RecordingListener::new();
    let handle = Supervisor::new(connector, Arc::new(listener)).spawn();

    let mut times = Vec::new();
    for _ in 0..4 {
        let attempt = next_attempt(&mut attempts).await;
        assert!(attempt.peer.is_none());
        times.push(attempt.at);
    }

    let accepted = next_attempt(&mut attempts).await;
    times.push(accepted.at);
    let peer = accepted.peer.expect("fifth attempt is accepted");
    assert!(matches!(read_message(&peer).await, Message::Authentication(_)));
    assert_eq!(next_event(&mut events).await, Event::Connected);

    // Controller drops the session; the next attempt comes one initial
    // delay later, not sixteen seconds.
    peer.close().await;
    assert_eq!(next_event(&mut events).await, Event::Disconnected);
    let dropped_at = Instant::now();

    times.push(next_attempt(&mut attempts).await.at);
    times.push(next_attempt(&mut attempts).await.at);

    let gaps: Vec<Duration> = times.windows(2).map(|w| w[1] - w[0]).collect();
    let expected = [1, 2, 4, 8].map(Duration::from_secs);
    for (gap, want) in gaps.iter().zip(expected) {
        assert_close(*gap, want);
    }
    assert_close(times[5] - dropped_at, Duration::from_secs(1));
    // Refused again right after a reset: still the initial delay.
    assert_close(gaps[5], Duration::from_secs(1));

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_custom_backoff_config() {
    let (connector, mut attempts) = ScriptedConnector::new([Outcome::Refuse]);
    let (listener, _events) = RecordingListener::new();
    let handle = Supervisor::new(connector, Arc::new(listener))
        .backoff(BackoffConfig {
            initial: Duration::from_millis(100),
            max: Duration::from_millis(250),
            multiplier: 3,
        })
        .spawn();

    let mut times = Vec::new();
    for _ in 0..4 {
        times.push(next_attempt(&mut attempts).await.at);
    }
    let gaps: Vec<Duration> = times.windows(2).map(|w| w[1] - w[0]).collect();
    assert_close(gaps[0], Duration::from_millis(100));
    assert_close(gaps[1], Duration::from_millis(250));
    assert_close(gaps[2], Duration::from_millis(250));

    handle.shutdown().await;
}

// =========================================================================
// Authentication ordering
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_authentication_is_first_frame_on_every_connection() {
    const CYCLES: usize = 100;
    let (connector, mut attempts) = ScriptedConnector::new([Outcome::Accept; CYCLES]);
    let (listener, mut events) = RecordingListener::new();
    let handle = Supervisor::new(connector, Arc::new(listener)).spawn();

    for cycle in 0..CYCLES {
        let peer = next_attempt(&mut attempts)
            .await
            .peer
            .unwrap_or_else(|| panic!("cycle {cycle} was refused"));

        match read_message(&peer).await {
            Message::Authentication(auth) => {
                assert_eq!(auth.name, "lobby-1");
                assert_eq!(auth.kind, ServerKind::Lobby);
            }
            other => panic!("cycle {cycle}: first frame was {}", other.tag()),
        }

        assert_eq!(next_event(&mut events).await, Event::Connected);
        peer.close().await;
        assert_eq!(next_event(&mut events).await, Event::Disconnected);
    }

    handle.shutdown().await;
}

// =========================================================================
// Dispatch
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_messages_dispatch_in_wire_order() {
    let (connector, mut attempts) = ScriptedConnector::new([Outcome::Accept]);
    let (listener, mut events) = RecordingListener::new();
    let handle = Supervisor::new(connector, Arc::new(listener)).spawn();

    let peer = next_attempt(&mut attempts).await.peer.unwrap();
    read_message(&peer).await;
    assert_eq!(next_event(&mut events).await, Event::Connected);

    send_message(
        &peer,
        LinkServer {
            name: "L1".into(),
            address: "10.0.0.4".into(),
            port: 25566,
            priority: 2,
        },
    )
    .await;
    let unknown = MsgPackCodec
        .encode(&BTreeMap::from([("Teleport", BTreeMap::<String, i32>::new())]))
        .unwrap();
    peer.send(&unknown).await.unwrap();
    send_message(
        &peer,
        TransportPlayer {
            player: "123e4567-e89b-12d3-a456-426614174000".into(),
            to: "L1".into(),
        },
    )
    .await;
    send_message(
        &peer,
        Request {
            kind: ServerKind::minigame("tag-ctf"),
            player: None,
        },
    )
    .await;
    // Satellite-originated variants are ignored without ending the session.
    send_message(&peer, Pong { timer: 9 }).await;
    send_message(&peer, Ping { timer: 5 }).await;
    send_message(&peer, UnlinkServer { name: "L1".into() }).await;

    let expected = vec![
        Event::Linked("L1".into()),
        Event::Transported("123e4567-e89b-12d3-a456-426614174000".into(), "L1".into()),
        Event::Requested(ServerKind::minigame("tag-ctf")),
        Event::Pinged(5),
        Event::Unlinked("L1".into()),
    ];
    let mut received = Vec::new();
    for _ in 0..expected.len() {
        received.push(next_event(&mut events).await);
    }
    assert_eq!(received, expected);
    assert_eq!(read_message(&peer).await, Message::Pong(Pong { timer: 5 }));

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_unknown_variant_is_informational() {
    let logs = LogCapture::default();
    let _guard = tracing_subscriber::registry().with(logs.clone()).set_default();

    let (connector, mut attempts) = ScriptedConnector::new([Outcome::Accept]);
    let (listener, mut events) = RecordingListener::new();
    let handle = Supervisor::new(connector, Arc::new(listener)).spawn();

    let peer = next_attempt(&mut attempts).await.peer.unwrap();
    read_message(&peer).await;
    assert_eq!(next_event(&mut events).await, Event::Connected);

    let unknown = MsgPackCodec
        .encode(&BTreeMap::from([("Teleport", BTreeMap::<String, i32>::new())]))
        .unwrap();
    peer.send(&unknown).await.unwrap();
    send_message(&peer, Ping { timer: 1 }).await;
    assert_eq!(next_event(&mut events).await, Event::Pinged(1));

    assert_eq!(logs.level_of("skipping unrecognized message"), Some(Level::INFO));
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_malformed_frame_ends_session() {
    let (connector, mut attempts) = ScriptedConnector::new([Outcome::Accept]);
    let (listener, mut events) = RecordingListener::new();
    let handle = Supervisor::new(connector, Arc::new(listener)).spawn();
    let mut state = handle.subscribe();

    let peer = next_attempt(&mut attempts).await.peer.unwrap();
    read_message(&peer).await;
    assert_eq!(next_event(&mut events).await, Event::Connected);

    peer.send(&[0xc1]).await.unwrap();
    assert_eq!(next_event(&mut events).await, Event::Disconnected);
    assert!(peer.recv().await.unwrap().is_none());

    // The loop goes on to reconnect.
    let retry = next_attempt(&mut attempts).await;
    assert!(retry.peer.is_none());
    state
        .wait_for(|s| *s == LinkState::BackingOff)
        .await
        .unwrap();

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_oversized_frame_ends_session() {
    let (connector, mut attempts) = ScriptedConnector::new([Outcome::Accept]);
    let (listener, mut events) = RecordingListener::new();
    let handle = Supervisor::new(connector, Arc::new(listener))
        .max_frame_len(16)
        .spawn();

    let peer = next_attempt(&mut attempts).await.peer.unwrap();
    read_message(&peer).await;
    assert_eq!(next_event(&mut events).await, Event::Connected);

    peer.send(&[0u8; 64]).await.unwrap();
    assert_eq!(next_event(&mut events).await, Event::Disconnected);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_failed_on_connect_skips_on_disconnect() {
    let (connector, mut attempts) = ScriptedConnector::new([Outcome::Accept]);
    let (mut listener, mut events) = RecordingListener::new();
    listener.reject_connect = true;
    let handle = Supervisor::new(connector, Arc::new(listener)).spawn();

    let first = next_attempt(&mut attempts).await;
    let peer = first.peer.unwrap();
    assert!(peer.recv().await.unwrap().is_none());

    let second = next_attempt(&mut attempts).await;
    assert_close(second.at - first.at, Duration::from_secs(1));

    handle.shutdown().await;
    assert!(events.try_recv().is_err());
}

// =========================================================================
// Shutdown
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_shutdown_while_running_closes_and_notifies() {
    let (connector, mut attempts) = ScriptedConnector::new([Outcome::Accept]);
    let (listener, mut events) = RecordingListener::new();
    let handle = Supervisor::new(connector, Arc::new(listener)).spawn();
    let mut state = handle.subscribe();

    let peer = next_attempt(&mut attempts).await.peer.unwrap();
    read_message(&peer).await;
    assert_eq!(next_event(&mut events).await, Event::Connected);
    state.wait_for(|s| *s == LinkState::Running).await.unwrap();
    assert_eq!(handle.state(), LinkState::Running);

    handle.shutdown().await;

    assert_eq!(next_event(&mut events).await, Event::Disconnected);
    assert!(peer.recv().await.unwrap().is_none());
    assert_eq!(*state.borrow(), LinkState::Stopped);
    assert!(attempts.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_while_handler_write_is_stalled() {
    let (connector, mut attempts) = ScriptedConnector::new([Outcome::Accept]);
    let (listener, mut events) = RecordingListener::new();
    let handle = Supervisor::new(connector, Arc::new(listener)).spawn();

    let peer = Arc::new(next_attempt(&mut attempts).await.peer.unwrap());
    read_message(&peer).await;
    assert_eq!(next_event(&mut events).await, Event::Connected);

    // The controller keeps pinging and never reads a pong, so both
    // directions of the pipe fill up and the pong write blocks.
    let pinger = Arc::clone(&peer);
    let flood = tokio::spawn(async move {
        for timer in 0..20_000 {
            let bytes = MsgPackCodec.encode_message(&Ping { timer }.into()).unwrap();
            if pinger.send(&bytes).await.is_err() {
                break;
            }
        }
    });
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(!flood.is_finished());

    tokio::time::timeout(Duration::from_secs(5), handle.shutdown())
        .await
        .expect("shutdown waited on a stalled pong");

    loop {
        match next_event(&mut events).await {
            Event::Pinged(_) => continue,
            event => {
                assert_eq!(event, Event::Disconnected);
                break;
            }
        }
    }
    peer.close().await;
    flood.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_while_backing_off_is_prompt() {
    let (connector, mut attempts) = ScriptedConnector::new([Outcome::Refuse]);
    let (listener, mut events) = RecordingListener::new();
    let handle = Supervisor::new(connector, Arc::new(listener))
        .backoff(BackoffConfig {
            initial: Duration::from_secs(3600),
            max: Duration::from_secs(3600),
            multiplier: 2,
        })
        .spawn();
    let mut state = handle.subscribe();

    next_attempt(&mut attempts).await;
    state
        .wait_for(|s| *s == LinkState::BackingOff)
        .await
        .unwrap();

    handle.shutdown().await;

    assert_eq!(*state.borrow(), LinkState::Stopped);
    assert!(attempts.try_recv().is_err());
    assert!(events.try_recv().is_err());
}
