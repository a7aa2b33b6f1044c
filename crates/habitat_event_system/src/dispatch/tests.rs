use super::*;
use crate::session::{Session, SessionRef};
use crate::types::SessionId;
use async_trait::async_trait;
use bytes::Bytes;
use habitat_protocol::{Charset, InboundMessage, OutboundMessage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn session() -> SessionRef {
    let (session, rx) = Session::channel(SessionId(1), "127.0.0.1:9000".parse().unwrap(), 16);
    // keep the queue open for the whole test
    std::mem::forget(rx);
    session
}

fn chat_message(text: &str) -> InboundMessage {
    let mut out = OutboundMessage::new(52);
    out.write_fixed_string(text, Charset::Utf8);
    InboundMessage::new(52, Bytes::copy_from_slice(out.body()))
}

/// Records what the body read and where the cursor started.
struct RecordingHandler {
    calls: AtomicUsize,
    seen: Mutex<Vec<(usize, String)>>,
}

impl RecordingHandler {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl PacketHandler for RecordingHandler {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn preview(&self, message: &mut InboundMessage) -> PacketFields {
        PacketFields::default().with("text", message.read_fixed_string(Charset::Utf8))
    }

    async fn handle(
        &self,
        _session: &SessionRef,
        message: &mut InboundMessage,
    ) -> Result<(), DispatchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let start = message.position();
        let text = message.read_fixed_string(Charset::Utf8);
        self.seen.lock().unwrap().push((start, text));
        Ok(())
    }
}

struct NamedHandler(&'static str, Arc<Mutex<Vec<&'static str>>>);

#[async_trait]
impl PacketHandler for NamedHandler {
    fn name(&self) -> &'static str {
        self.0
    }

    async fn handle(&self, _: &SessionRef, _: &mut InboundMessage) -> Result<(), DispatchError> {
        self.1.lock().unwrap().push(self.0);
        Ok(())
    }
}

struct PanickingHandler;

#[async_trait]
impl PacketHandler for PanickingHandler {
    fn name(&self) -> &'static str {
        "panicking"
    }

    async fn handle(&self, _: &SessionRef, message: &mut InboundMessage) -> Result<(), DispatchError> {
        if message.remaining() > 0 {
            panic!("malformed");
        }
        Err(DispatchError::Handler("empty".into()))
    }
}

#[tokio::test]
async fn handler_runs_once_from_cursor_zero() {
    let dispatcher = PacketDispatcher::new();
    let handler = RecordingHandler::new();
    dispatcher.register(52, handler.clone());

    // an observer that consumes its own copy must not shift the body's view
    dispatcher.observe(52, |event| {
        let mut copy = event.message().clone();
        copy.read_fixed_string(Charset::Utf8);
    });

    let outcome = dispatcher.dispatch(&session(), chat_message("hello")).await;
    assert_eq!(outcome, DispatchOutcome::Handled);
    assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    assert_eq!(*handler.seen.lock().unwrap(), vec![(0, "hello".to_string())]);
}

#[tokio::test]
async fn cancelled_events_skip_the_body() {
    let dispatcher = PacketDispatcher::new();
    let handler = RecordingHandler::new();
    dispatcher.register(52, handler.clone());

    let observed = Arc::new(Mutex::new(None));
    let observed_clone = observed.clone();
    dispatcher.observe(52, move |event| {
        *observed_clone.lock().unwrap() = event.fields().text("text").map(str::to_string);
        if event.fields().text("text") == Some("forbidden") {
            event.cancel();
        }
    });

    let outcome = dispatcher.dispatch(&session(), chat_message("forbidden")).await;
    assert_eq!(outcome, DispatchOutcome::Cancelled);
    assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
    assert!(handler.seen.lock().unwrap().is_empty());
    assert_eq!(observed.lock().unwrap().as_deref(), Some("forbidden"));

    let outcome = dispatcher.dispatch(&session(), chat_message("fine")).await;
    assert_eq!(outcome, DispatchOutcome::Handled);
    assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn global_observers_can_cancel_too() {
    let dispatcher = PacketDispatcher::new();
    let handler = RecordingHandler::new();
    dispatcher.register(52, handler.clone());
    dispatcher.observe_all(|event| event.cancel());

    let outcome = dispatcher.dispatch(&session(), chat_message("hi")).await;
    assert_eq!(outcome, DispatchOutcome::Cancelled);
    assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn last_registration_wins() {
    let dispatcher = PacketDispatcher::new();
    let calls = Arc::new(Mutex::new(Vec::new()));
    dispatcher.register(7, Arc::new(NamedHandler("first", calls.clone())));
    dispatcher.register(7, Arc::new(NamedHandler("second", calls.clone())));

    let message = InboundMessage::new(7, Bytes::new());
    dispatcher.dispatch(&session(), message).await;
    assert_eq!(*calls.lock().unwrap(), vec!["second"]);
    assert_eq!(dispatcher.handler_count(), 1);
}

#[tokio::test]
async fn unknown_headers_reach_the_default_observers() {
    let dispatcher = PacketDispatcher::new();
    let unknown = Arc::new(Mutex::new(Vec::new()));
    let unknown_clone = unknown.clone();
    dispatcher.on_unhandled(move |_session, message| {
        unknown_clone.lock().unwrap().push(message.header());
    });

    let outcome = dispatcher
        .dispatch(&session(), InboundMessage::new(999, Bytes::new()))
        .await;
    assert_eq!(outcome, DispatchOutcome::Unhandled);
    assert_eq!(*unknown.lock().unwrap(), vec![999]);
}

#[tokio::test]
async fn errors_and_panics_stop_at_the_boundary() {
    let dispatcher = PacketDispatcher::new();
    dispatcher.register(1, Arc::new(PanickingHandler));

    let panics = dispatcher
        .dispatch(&session(), InboundMessage::new(1, Bytes::from_static(b"x")))
        .await;
    let errors = dispatcher
        .dispatch(&session(), InboundMessage::new(1, Bytes::new()))
        .await;
    assert_eq!(panics, DispatchOutcome::Failed);
    assert_eq!(errors, DispatchOutcome::Failed);

    let stats = dispatcher.get_stats().await;
    assert_eq!(stats.dispatched, 2);
    assert_eq!(stats.failed, 2);
}

#[tokio::test]
async fn panicking_observer_does_not_block_the_handler() {
    let dispatcher = PacketDispatcher::new();
    let handler = RecordingHandler::new();
    dispatcher.register(52, handler.clone());
    dispatcher.observe(52, |_event| panic!("observer bug"));

    let outcome = dispatcher.dispatch(&session(), chat_message("still works")).await;
    assert_eq!(outcome, DispatchOutcome::Handled);
    assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
}
