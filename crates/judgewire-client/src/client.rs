//! Client facade: typed sends, broadcast subscriptions, connection status.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use judgewire_proto::{
    AdminSnapshot, ClientEvent, Hack, HackAssignment, HackDraft, Judge, JudgeDraft, ProtocolFault,
    Rating, ReplyOutcome, RequestToken, Routed, ServerEvent, SharedSnapshot, Superlative,
    SuperlativeDraft, SuperlativePlacement, TableKind,
};

use crate::pending::{Pending, PendingReplies, ReplyError};
use crate::relay::{Relay, Subscription};
use crate::socket::{EventSink, SocketError, SocketEvent};
use crate::status::{ConnectionStatus, StatusTracker};

/// Client construction knobs.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Settle a request with [`ReplyError::TimedOut`] if no reply arrives
    /// within this window. `None` preserves the protocol's native behavior:
    /// an unanswered request pends forever and its entry is never reclaimed.
    pub response_timeout: Option<Duration>,
}

impl ClientConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opt in to a response timeout.
    #[must_use]
    pub const fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = Some(timeout);
        self
    }
}

struct ClientInner {
    sink: Box<dyn EventSink>,
    pending: PendingReplies,
    status: StatusTracker,
    shared_updates: Relay<SharedSnapshot>,
    admin_updates: Relay<AdminSnapshot>,
    faults: Relay<ProtocolFault>,
    config: ClientConfig,
}

/// Protocol client over one transport handle.
///
/// Cheap to clone; all clones share one pending table, one status tracker,
/// and one set of subscriber lists. Construction wires every response kind
/// and lifecycle notice exactly once.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
    reader: AbortHandle,
}

impl Client {
    /// Wire a client onto a transport handle and start its read loop.
    #[must_use]
    pub fn spawn(sink: impl EventSink + 'static, events: mpsc::Receiver<SocketEvent>) -> Self {
        Self::spawn_with_config(sink, events, ClientConfig::default())
    }

    /// Like [`Client::spawn`] with explicit configuration.
    #[must_use]
    pub fn spawn_with_config(
        sink: impl EventSink + 'static,
        events: mpsc::Receiver<SocketEvent>,
        config: ClientConfig,
    ) -> Self {
        let inner = Arc::new(ClientInner {
            sink: Box::new(sink),
            pending: PendingReplies::new(),
            status: StatusTracker::new(),
            shared_updates: Relay::new(),
            admin_updates: Relay::new(),
            faults: Relay::new(),
            config,
        });

        let reader = tokio::spawn(Arc::clone(&inner).read_loop(events)).abort_handle();
        Self { inner, reader }
    }

    /// Stop the read loop. Outstanding requests stay registered but can no
    /// longer be resolved.
    pub fn stop(&self) {
        self.reader.abort();
    }

    /// Current transport health.
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.inner.status.current()
    }

    /// Number of requests still waiting for a reply.
    #[must_use]
    pub fn outstanding_requests(&self) -> usize {
        self.inner.pending.outstanding()
    }

    /// Observe connection status transitions (each new value).
    pub fn subscribe_status<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&ConnectionStatus) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.inner.status.subscribe(observer)
    }

    /// Observe judge-facing state broadcasts.
    pub fn subscribe_shared<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&SharedSnapshot) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.inner.shared_updates.subscribe(observer)
    }

    /// Observe admin-console state broadcasts.
    pub fn subscribe_admin<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&AdminSnapshot) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.inner.admin_updates.subscribe(observer)
    }

    /// Observe server-reported protocol faults.
    ///
    /// A fault names the originating event but carries no correlation token,
    /// so it settles no pending request.
    pub fn subscribe_protocol_errors<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&ProtocolFault) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.inner.faults.subscribe(observer)
    }

    /// Create a hack record.
    ///
    /// # Errors
    /// Returns an error if the transport cannot accept the event.
    pub async fn add_hack(&self, hack: HackDraft) -> Result<Pending<Hack>, SocketError> {
        self.request(|seq| ClientEvent::AddHack { seq, hack }).await
    }

    /// Create a judge record.
    ///
    /// # Errors
    /// Returns an error if the transport cannot accept the event.
    pub async fn add_judge(&self, judge: JudgeDraft) -> Result<Pending<Judge>, SocketError> {
        self.request(|seq| ClientEvent::AddJudge { seq, judge })
            .await
    }

    /// Create a superlative category.
    ///
    /// # Errors
    /// Returns an error if the transport cannot accept the event.
    pub async fn add_superlative(
        &self,
        superlative: SuperlativeDraft,
    ) -> Result<Pending<Superlative>, SocketError> {
        self.request(|seq| ClientEvent::AddSuperlative { seq, superlative })
            .await
    }

    /// Create a row in an arbitrary table.
    ///
    /// # Errors
    /// Returns an error if the transport cannot accept the event.
    pub async fn add_row(&self, table: TableKind, row: Value) -> Result<Pending<Value>, SocketError> {
        self.request(|seq| ClientEvent::AddRow { seq, table, row })
            .await
    }

    /// Modify a row in an arbitrary table.
    ///
    /// # Errors
    /// Returns an error if the transport cannot accept the event.
    pub async fn modify_row(
        &self,
        table: TableKind,
        row_id: i64,
        changes: Value,
    ) -> Result<Pending<Value>, SocketError> {
        self.request(|seq| ClientEvent::ModifyRow {
            seq,
            table,
            row_id,
            changes,
        })
        .await
    }

    /// Submit a judge's score for a hack.
    ///
    /// # Errors
    /// Returns an error if the transport cannot accept the event.
    pub async fn rate_hack(&self, rating: Rating) -> Result<Pending<Rating>, SocketError> {
        self.request(|seq| ClientEvent::RateHack { seq, rating })
            .await
    }

    /// Submit a judge's first/second choice for a superlative.
    ///
    /// # Errors
    /// Returns an error if the transport cannot accept the event.
    pub async fn rank_superlative(
        &self,
        placement: SuperlativePlacement,
    ) -> Result<Pending<SuperlativePlacement>, SocketError> {
        self.request(|seq| ClientEvent::RankSuperlative { seq, placement })
            .await
    }

    /// Reorder a judge's assigned hacks; the reply echoes the stored queue.
    ///
    /// # Errors
    /// Returns an error if the transport cannot accept the event.
    pub async fn set_judge_hack_priority(
        &self,
        judge_id: i64,
        hack_ids: Vec<i64>,
    ) -> Result<Pending<Vec<HackAssignment>>, SocketError> {
        self.request(|seq| ClientEvent::SetJudgeHackPriority {
            seq,
            judge_id,
            hack_ids,
        })
        .await
    }

    /// Toggle delivery of judge-facing state broadcasts.
    ///
    /// # Errors
    /// Returns an error if the transport cannot accept the event.
    pub async fn set_synchronize_shared(&self, enabled: bool) -> Result<Pending<bool>, SocketError> {
        self.request(|seq| ClientEvent::SetSynchronizeShared { seq, enabled })
            .await
    }

    /// Toggle delivery of admin-console state broadcasts.
    ///
    /// # Errors
    /// Returns an error if the transport cannot accept the event.
    pub async fn set_synchronize_admin(&self, enabled: bool) -> Result<Pending<bool>, SocketError> {
        self.request(|seq| ClientEvent::SetSynchronizeAdmin { seq, enabled })
            .await
    }

    /// Present the admin-console secret.
    ///
    /// # Errors
    /// Returns an error if the transport cannot accept the event.
    pub async fn authenticate(
        &self,
        secret: impl Into<String>,
    ) -> Result<Pending<bool>, SocketError> {
        let secret = secret.into();
        self.request(|seq| ClientEvent::Authenticate { seq, secret })
            .await
    }

    /// Present a judge's personal secret; the reply carries the judge record.
    ///
    /// # Errors
    /// Returns an error if the transport cannot accept the event.
    pub async fn login(&self, secret: impl Into<String>) -> Result<Pending<Judge>, SocketError> {
        let secret = secret.into();
        self.request(|seq| ClientEvent::Login { seq, secret }).await
    }

    /// Register a pending entry, emit the envelope, hand back the reply
    /// handle. An emit failure unregisters the entry.
    async fn request<T>(
        &self,
        build: impl FnOnce(RequestToken) -> ClientEvent,
    ) -> Result<Pending<T>, SocketError> {
        let seq = RequestToken::fresh();
        let rx = self.inner.pending.register(seq);
        let event = build(seq);
        tracing::debug!(event = event.kind(), %seq, "sending request");

        if let Err(e) = self.inner.sink.emit(event).await {
            self.inner.pending.forget(seq);
            return Err(e);
        }

        if let Some(timeout) = self.inner.config.response_timeout {
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                if inner.pending.expire(seq) {
                    tracing::warn!(%seq, "request timed out without a reply");
                }
            });
        }

        Ok(Pending::new(rx))
    }
}

impl ClientInner {
    async fn read_loop(self: Arc<Self>, mut events: mpsc::Receiver<SocketEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                SocketEvent::Connect => self.status.transition(ConnectionStatus::Connected),
                SocketEvent::Reconnecting => {
                    self.status.transition(ConnectionStatus::Reconnecting);
                }
                SocketEvent::ReconnectFailed => {
                    self.status.transition(ConnectionStatus::Disconnected);
                }
                SocketEvent::Message(payload) => self.dispatch(payload),
            }
        }
        tracing::debug!("socket event stream closed");
    }

    fn dispatch(&self, payload: Value) {
        let event: ServerEvent = match serde_json::from_value(payload) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("unrecognized server event: {e}");
                return;
            }
        };

        match event.route() {
            Routed::Reply { origin, reply } => {
                let result = match reply.outcome {
                    ReplyOutcome::Success { data } => Ok(data),
                    ReplyOutcome::Failure { message } => Err(ReplyError::Rejected(message)),
                };
                if let Err(e) = self.pending.resolve(reply.seq, result) {
                    // Client/server desynchronization; stays loud.
                    tracing::error!(origin, "{e}");
                }
            }
            Routed::Shared(snapshot) => self.shared_updates.publish(&snapshot),
            Routed::Admin(snapshot) => self.admin_updates.publish(&snapshot),
            Routed::Fault(fault) => {
                tracing::error!(
                    origin = %fault.origin,
                    "server reported a protocol fault: {}", fault.message
                );
                self.faults.publish(&fault);
            }
        }
    }
}
