use super::event::PacketEvent;
use super::handler::PacketHandler;
use crate::session::SessionRef;
use arc_swap::ArcSwap;
use dashmap::DashMap;
use futures::FutureExt;
use habitat_protocol::InboundMessage;
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

type Observer = Arc<dyn Fn(&PacketEvent) + Send + Sync>;
type UnhandledObserver = Arc<dyn Fn(&SessionRef, &InboundMessage) + Send + Sync>;

/// What happened to one dispatched packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Handled,
    Cancelled,
    Unhandled,
    /// The handler returned an error or panicked; the packet was dropped.
    Failed,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct DispatchStats {
    pub dispatched: u64,
    pub handled: u64,
    pub cancelled: u64,
    pub unhandled: u64,
    pub failed: u64,
}

/// Header id to handler table plus the observer chains.
pub struct PacketDispatcher {
    handlers: DashMap<u16, Arc<dyn PacketHandler>>,
    observers: DashMap<u16, Vec<Observer>>,
    global_observers: ArcSwap<Vec<Observer>>,
    unhandled_observers: ArcSwap<Vec<UnhandledObserver>>,
    stats: tokio::sync::RwLock<DispatchStats>,
}

impl std::fmt::Debug for PacketDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketDispatcher")
            .field("handlers", &self.handlers.len())
            .field("observed_headers", &self.observers.len())
            .finish()
    }
}

impl PacketDispatcher {
    pub fn new() -> Self {
        Self {
            handlers: DashMap::new(),
            observers: DashMap::new(),
            global_observers: ArcSwap::from_pointee(Vec::new()),
            unhandled_observers: ArcSwap::from_pointee(Vec::new()),
            stats: tokio::sync::RwLock::new(DispatchStats::default()),
        }
    }

    /// Binds `handler` to `header`. A later registration replaces an earlier
    /// one.
    pub fn register(&self, header: u16, handler: Arc<dyn PacketHandler>) {
        let name = handler.name();
        match self.handlers.insert(header, handler) {
            Some(previous) => info!(
                "🔁 Header {} handler {} replaced by {}",
                header,
                previous.name(),
                name
            ),
            None => debug!("📝 Header {} -> {}", header, name),
        }
    }

    pub fn is_registered(&self, header: u16) -> bool {
        self.handlers.contains_key(&header)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Observes (and may cancel) packets with one header id.
    pub fn observe<F>(&self, header: u16, observer: F)
    where
        F: Fn(&PacketEvent) + Send + Sync + 'static,
    {
        self.observers
            .entry(header)
            .or_default()
            .push(Arc::new(observer));
    }

    /// Observes every handled packet, after the per-header observers.
    pub fn observe_all<F>(&self, observer: F)
    where
        F: Fn(&PacketEvent) + Send + Sync + 'static,
    {
        let observer: Observer = Arc::new(observer);
        self.global_observers.rcu(|current| {
            let mut next = Vec::clone(current);
            next.push(observer.clone());
            next
        });
    }

    /// Observes packets with no registered handler.
    pub fn on_unhandled<F>(&self, observer: F)
    where
        F: Fn(&SessionRef, &InboundMessage) + Send + Sync + 'static,
    {
        let observer: UnhandledObserver = Arc::new(observer);
        self.unhandled_observers.rcu(|current| {
            let mut next = Vec::clone(current);
            next.push(observer.clone());
            next
        });
    }

    pub async fn get_stats(&self) -> DispatchStats {
        self.stats.read().await.clone()
    }

    /// Runs one packet through the pipeline. Never fails: every error is
    /// logged here and reported only through the outcome.
    pub async fn dispatch(&self, session: &SessionRef, mut message: InboundMessage) -> DispatchOutcome {
        let header = message.header();
        let handler = self.handlers.get(&header).map(|entry| entry.value().clone());

        let outcome = match handler {
            None => {
                self.notify_unhandled(session, &message);
                DispatchOutcome::Unhandled
            }
            Some(handler) => self.run(session, handler, &mut message).await,
        };

        let mut stats = self.stats.write().await;
        stats.dispatched += 1;
        match outcome {
            DispatchOutcome::Handled => stats.handled += 1,
            DispatchOutcome::Cancelled => stats.cancelled += 1,
            DispatchOutcome::Unhandled => stats.unhandled += 1,
            DispatchOutcome::Failed => stats.failed += 1,
        }
        outcome
    }

    async fn run(
        &self,
        session: &SessionRef,
        handler: Arc<dyn PacketHandler>,
        message: &mut InboundMessage,
    ) -> DispatchOutcome {
        let header = message.header();
        let name = handler.name();

        message.reset();
        let fields = match std::panic::catch_unwind(AssertUnwindSafe(|| handler.preview(message))) {
            Ok(fields) => fields,
            Err(_) => {
                error!("💥 Preview of {} (header {}) panicked; packet dropped", name, header);
                return DispatchOutcome::Failed;
            }
        };

        message.reset();
        let event = PacketEvent::new(session.clone(), message.clone(), fields);
        self.notify_observers(&event);
        if event.is_cancelled() {
            debug!("🚫 {} from {} cancelled by an observer", name, session.id());
            return DispatchOutcome::Cancelled;
        }

        message.reset();
        trace!("📨 {} -> {}", session.id(), name);
        match AssertUnwindSafe(handler.handle(session, message))
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => DispatchOutcome::Handled,
            Ok(Err(e)) => {
                warn!("⚠️ {} failed for {}: {}", name, session.id(), e);
                DispatchOutcome::Failed
            }
            Err(_) => {
                error!("💥 {} panicked for {}; packet dropped", name, session.id());
                DispatchOutcome::Failed
            }
        }
    }

    fn notify_observers(&self, event: &PacketEvent) {
        let per_header = self
            .observers
            .get(&event.header())
            .map(|entry| entry.value().clone())
            .unwrap_or_default();
        let global = self.global_observers.load();

        for observer in per_header.iter().chain(global.iter()) {
            if std::panic::catch_unwind(AssertUnwindSafe(|| observer(event))).is_err() {
                error!("💥 Observer for header {} panicked", event.header());
            }
        }
    }

    fn notify_unhandled(&self, session: &SessionRef, message: &InboundMessage) {
        let observers = self.unhandled_observers.load();
        if observers.is_empty() {
            debug!(
                "❓ No handler for header {} from {} ({} bytes)",
                message.header(),
                session.id(),
                message.body().len()
            );
        }
        for observer in observers.iter() {
            if std::panic::catch_unwind(AssertUnwindSafe(|| observer(session, message))).is_err() {
                error!("💥 Unhandled-packet observer panicked");
            }
        }
    }
}

impl Default for PacketDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

