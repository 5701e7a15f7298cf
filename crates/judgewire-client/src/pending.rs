//! Pending-request bookkeeping and the reply handle.

use std::collections::HashMap;
use std::future::IntoFuture;
use std::marker::PhantomData;
use std::sync::Mutex;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::oneshot;

use judgewire_proto::RequestToken;

/// How a settled request ended short of a success payload.
#[derive(Debug, Error)]
pub enum ReplyError {
    /// The server answered with a failure outcome.
    #[error("request rejected: {0}")]
    Rejected(String),
    /// The success payload did not decode into the expected shape.
    #[error("malformed reply payload: {0}")]
    Decode(#[from] serde_json::Error),
    /// The configured response timeout elapsed first.
    #[error("timed out waiting for a reply")]
    TimedOut,
    /// The client was torn down before a reply arrived.
    #[error("client closed before a reply arrived")]
    ClientClosed,
}

/// Raw settlement value handed through the table.
pub(crate) type ReplyResult = Result<Value, ReplyError>;

/// Protocol violation detected while resolving a reply.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The echoed token matches no outstanding request: a token collision, a
    /// duplicate delivery, or a listener bound to the wrong response kind.
    #[error("no pending request for correlation token {0}")]
    UnknownToken(RequestToken),
}

/// Table of outstanding requests keyed by correlation token.
///
/// One entry per in-flight request: created at send time, consumed exactly
/// once by the matching reply (or by the timeout reaper). With no reply and
/// no timeout configured an entry lives for the rest of the client.
pub(crate) struct PendingReplies {
    entries: Mutex<HashMap<RequestToken, oneshot::Sender<ReplyResult>>>,
}

impl PendingReplies {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Store an entry for `token` and hand back the settlement receiver.
    pub(crate) fn register(&self, token: RequestToken) -> oneshot::Receiver<ReplyResult> {
        let (tx, rx) = oneshot::channel();
        if self.entries.lock().unwrap().insert(token, tx).is_some() {
            // The stale caller observes `ClientClosed` rather than a
            // stranger's payload.
            tracing::error!(%token, "correlation token collision");
        }
        rx
    }

    /// Settle and remove the entry for `token`.
    ///
    /// # Errors
    /// Returns [`ResolveError::UnknownToken`] if no entry matches - a
    /// protocol violation the dispatcher must surface, never swallow.
    pub(crate) fn resolve(
        &self,
        token: RequestToken,
        result: ReplyResult,
    ) -> Result<(), ResolveError> {
        let sender = self
            .entries
            .lock()
            .unwrap()
            .remove(&token)
            .ok_or(ResolveError::UnknownToken(token))?;
        // The caller may have discarded its handle; that is not an error.
        let _ = sender.send(result);
        Ok(())
    }

    /// Drop the entry for `token` without settling it (the emit failed, so
    /// no reply can ever arrive).
    pub(crate) fn forget(&self, token: RequestToken) {
        self.entries.lock().unwrap().remove(&token);
    }

    /// Settle the entry for `token` with [`ReplyError::TimedOut`], if it is
    /// still outstanding.
    pub(crate) fn expire(&self, token: RequestToken) -> bool {
        match self.entries.lock().unwrap().remove(&token) {
            Some(sender) => {
                let _ = sender.send(Err(ReplyError::TimedOut));
                true
            }
            None => false,
        }
    }

    /// Number of outstanding requests.
    pub(crate) fn outstanding(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

/// Asynchronous handle to the eventual reply of one request.
///
/// Settles at most once. With no reply and no timeout configured it never
/// settles; an interactive caller surfaces that as a degraded state, not a
/// crash.
pub struct Pending<T> {
    rx: oneshot::Receiver<ReplyResult>,
    _reply: PhantomData<fn() -> T>,
}

impl<T> Pending<T> {
    pub(crate) fn new(rx: oneshot::Receiver<ReplyResult>) -> Self {
        Self {
            rx,
            _reply: PhantomData,
        }
    }
}

impl<T: DeserializeOwned> Pending<T> {
    /// Wait for the reply and decode its success payload.
    ///
    /// # Errors
    /// [`ReplyError::Rejected`] for a failure outcome, [`ReplyError::Decode`]
    /// if the payload does not match `T`, [`ReplyError::TimedOut`] under a
    /// configured timeout, [`ReplyError::ClientClosed`] if the client was
    /// dropped first.
    pub async fn wait(self) -> Result<T, ReplyError> {
        match self.rx.await {
            Ok(Ok(data)) => Ok(serde_json::from_value(data)?),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ReplyError::ClientClosed),
        }
    }
}

impl<T> IntoFuture for Pending<T>
where
    T: DeserializeOwned + Send + 'static,
{
    type Output = Result<T, ReplyError>;
    type IntoFuture = BoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        self.wait().boxed()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio_test::{assert_pending, task};

    use super::*;

    #[test]
    fn resolve_settles_the_matching_entry_exactly_once() {
        let table = PendingReplies::new();
        let token = RequestToken::fresh();
        let rx = table.register(token);
        assert_eq!(table.outstanding(), 1);

        table.resolve(token, Ok(json!({ "id": 7 }))).unwrap();
        assert_eq!(table.outstanding(), 0);

        let result = tokio_test::block_on(rx).unwrap().unwrap();
        assert_eq!(result, json!({ "id": 7 }));

        // A second delivery of the same token is a violation, not a settle.
        assert!(matches!(
            table.resolve(token, Ok(Value::Null)),
            Err(ResolveError::UnknownToken(t)) if t == token
        ));
    }

    #[test]
    fn unknown_tokens_do_not_disturb_other_entries() {
        let table = PendingReplies::new();
        let token = RequestToken::fresh();
        let rx = table.register(token);

        let stray = RequestToken::fresh();
        assert!(table.resolve(stray, Ok(Value::Null)).is_err());
        assert_eq!(table.outstanding(), 1);

        let mut waiting = task::spawn(rx);
        assert_pending!(waiting.poll());
    }

    #[test]
    fn expire_settles_with_a_timeout() {
        let table = PendingReplies::new();
        let token = RequestToken::fresh();
        let rx = table.register(token);

        assert!(table.expire(token));
        assert!(!table.expire(token));

        let result = tokio_test::block_on(rx).unwrap();
        assert!(matches!(result, Err(ReplyError::TimedOut)));
    }

    #[test]
    fn forget_discards_without_settling() {
        let table = PendingReplies::new();
        let token = RequestToken::fresh();
        let rx = table.register(token);

        table.forget(token);
        assert_eq!(table.outstanding(), 0);
        assert!(tokio_test::block_on(rx).is_err());
    }

    #[test]
    fn token_collision_replaces_the_stale_entry() {
        let table = PendingReplies::new();
        let token = RequestToken::fresh();
        let stale = table.register(token);
        let fresh = table.register(token);
        assert_eq!(table.outstanding(), 1);

        table.resolve(token, Ok(Value::Null)).unwrap();
        assert!(tokio_test::block_on(stale).is_err());
        assert!(tokio_test::block_on(fresh).unwrap().is_ok());
    }

    #[test]
    fn wait_decodes_the_success_payload() {
        let table = PendingReplies::new();
        let token = RequestToken::fresh();
        let pending: Pending<Vec<i64>> = Pending::new(table.register(token));

        table.resolve(token, Ok(json!([1, 2, 3]))).unwrap();
        let rows = tokio_test::block_on(pending.wait()).unwrap();
        assert_eq!(rows, vec![1, 2, 3]);
    }

    #[test]
    fn wait_surfaces_a_shape_mismatch_as_decode() {
        let table = PendingReplies::new();
        let token = RequestToken::fresh();
        let pending: Pending<Vec<i64>> = Pending::new(table.register(token));

        table.resolve(token, Ok(json!("not rows"))).unwrap();
        let result = tokio_test::block_on(pending.wait());
        assert!(matches!(result, Err(ReplyError::Decode(_))));
    }
}
