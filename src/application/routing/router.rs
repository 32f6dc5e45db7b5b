//! MessageRouter - dispatches inbound messages from every platform adapter
//! to the query service and delivers the answer back to the origin.
//!
//! ```text
//! adapter stream ──▶ consumer task ──▶ route_message (own task per message)
//!                                        │ archive (detached, best effort)
//!                                        │ QueryService::process_query
//!                                        ├─ web origin ──▶ hub.send_to_session
//!                                        └─ other ─────▶ adapter.send_message
//! ```
//!
//! The dispatch decision depends only on the origin adapter's platform.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::adapters::websocket::{HubHandle, ServerMessage};
use crate::domain::knowledge::QueryAnswer;
use crate::domain::messaging::{PlatformType, UnifiedMessage};
use crate::ports::{
    AdapterError, MessageArchive, MessageStream, PlatformAdapter, QueryError, QueryRequest,
    QueryService,
};

use super::history::{SessionHistory, DEFAULT_MAX_SESSIONS, DEFAULT_TURNS_PER_SESSION};

pub const DEFAULT_ROUTE_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_IN_FLIGHT: usize = 256;

/// Configuration for [`MessageRouter`].
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Budget for resolving and delivering one message.
    pub route_timeout: Duration,
    pub history_turns: usize,
    pub history_sessions: usize,
    /// Messages being answered at once across all adapters. Intake pauses
    /// while the limit is reached.
    pub max_in_flight: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            route_timeout: DEFAULT_ROUTE_TIMEOUT,
            history_turns: DEFAULT_TURNS_PER_SESSION,
            history_sessions: DEFAULT_MAX_SESSIONS,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

/// Routing errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("no adapter registered for origin '{0}'")]
    UnknownOrigin(String),

    #[error("routing timed out after {0:?}")]
    Timeout(Duration),

    #[error("query failed: {0}")]
    Query(#[from] QueryError),

    #[error("delivery failed: {0}")]
    Delivery(#[from] AdapterError),

    #[error("router already running")]
    AlreadyRunning,

    #[error("adapter '{id}' failed to start: {source}")]
    Start {
        id: String,
        #[source]
        source: AdapterError,
    },
}

/// One registered adapter as reported by [`MessageRouter::stats`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdapterInfo {
    pub id: String,
    pub platform: PlatformType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouterStats {
    pub running: bool,
    pub adapters: Vec<AdapterInfo>,
}

#[derive(Default)]
struct Lifecycle {
    running: bool,
    consumers: HashMap<String, JoinHandle<()>>,
}

struct RouterInner {
    query_service: Arc<dyn QueryService>,
    hub: HubHandle,
    archive: Option<Arc<dyn MessageArchive>>,
    adapters: RwLock<BTreeMap<String, Arc<dyn PlatformAdapter>>>,
    lifecycle: Mutex<Lifecycle>,
    history: SessionHistory,
    route_timeout: Duration,
    in_flight: Arc<Semaphore>,
}

/// Cloneable handle to the router.
#[derive(Clone)]
pub struct MessageRouter {
    inner: Arc<RouterInner>,
}

impl MessageRouter {
    pub fn new(query_service: Arc<dyn QueryService>, hub: HubHandle) -> Self {
        Self::with_config(query_service, hub, None, RouterConfig::default())
    }

    pub fn with_config(
        query_service: Arc<dyn QueryService>,
        hub: HubHandle,
        archive: Option<Arc<dyn MessageArchive>>,
        config: RouterConfig,
    ) -> Self {
        Self {
            inner: Arc::new(RouterInner {
                query_service,
                hub,
                archive,
                adapters: RwLock::new(BTreeMap::new()),
                lifecycle: Mutex::new(Lifecycle::default()),
                history: SessionHistory::new(config.history_turns, config.history_sessions),
                route_timeout: config.route_timeout,
                in_flight: Arc::new(Semaphore::new(config.max_in_flight.max(1))),
            }),
        }
    }

    /// Registers an adapter under `id`, replacing and stopping any previous one.
    ///
    /// While the router is running the new adapter is started immediately;
    /// if that start fails the id is left unregistered.
    pub async fn register_adapter(
        &self,
        id: impl Into<String>,
        adapter: Arc<dyn PlatformAdapter>,
    ) -> Result<(), RouteError> {
        let id = id.into();
        let mut lifecycle = self.inner.lifecycle.lock().await;

        if lifecycle.running {
            // The previous entry may be this very adapter, or share its inbound
            // channel, so it is stopped before the replacement starts.
            let previous = self.inner.adapters.read().await.get(&id).cloned();
            self.retire(&mut lifecycle, &id, previous).await;
            let stream = match start_adapter(&id, adapter.as_ref()).await {
                Ok(stream) => stream,
                Err(e) => {
                    self.swap_adapter(&id, None).await;
                    return Err(e);
                }
            };
            self.swap_adapter(&id, Some(adapter)).await;
            let consumer = tokio::spawn(self.clone().consume(id.clone(), stream));
            lifecycle.consumers.insert(id.clone(), consumer);
        } else {
            let previous = self.swap_adapter(&id, Some(adapter)).await;
            self.retire(&mut lifecycle, &id, previous).await;
        }

        tracing::info!(adapter_id = %id, "Adapter registered");
        Ok(())
    }

    /// Stops and removes the adapter registered under `id`.
    pub async fn unregister_adapter(&self, id: &str) -> Result<(), RouteError> {
        let mut lifecycle = self.inner.lifecycle.lock().await;
        let adapter = self
            .inner
            .adapters
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| RouteError::UnknownOrigin(id.to_string()))?;

        self.retire(&mut lifecycle, id, Some(adapter)).await;
        self.swap_adapter(id, None).await;
        tracing::info!(adapter_id = %id, "Adapter unregistered");
        Ok(())
    }

    async fn swap_adapter(
        &self,
        id: &str,
        adapter: Option<Arc<dyn PlatformAdapter>>,
    ) -> Option<Arc<dyn PlatformAdapter>> {
        let mut adapters = self.inner.adapters.write().await;
        match adapter {
            Some(adapter) => adapters.insert(id.to_string(), adapter),
            None => adapters.remove(id),
        }
    }

    /// Stops a replaced or removed adapter and its consumer.
    async fn retire(
        &self,
        lifecycle: &mut Lifecycle,
        id: &str,
        adapter: Option<Arc<dyn PlatformAdapter>>,
    ) {
        if let Some(consumer) = lifecycle.consumers.remove(id) {
            consumer.abort();
        }
        if let Some(adapter) = adapter {
            if let Err(e) = adapter.stop().await {
                tracing::warn!(adapter_id = %id, error = %e, "Adapter failed to stop");
            }
        }
    }

    /// Starts every adapter in id order and begins consuming their streams.
    ///
    /// If any adapter fails, the ones already started are stopped again and
    /// the router stays stopped.
    pub async fn start(&self) -> Result<(), RouteError> {
        let mut lifecycle = self.inner.lifecycle.lock().await;
        if lifecycle.running {
            return Err(RouteError::AlreadyRunning);
        }

        let adapters: Vec<_> = self
            .inner
            .adapters
            .read()
            .await
            .iter()
            .map(|(id, a)| (id.clone(), Arc::clone(a)))
            .collect();

        let mut started: Vec<(String, Arc<dyn PlatformAdapter>, MessageStream)> = Vec::new();
        for (id, adapter) in adapters {
            match start_adapter(&id, adapter.as_ref()).await {
                Ok(stream) => started.push((id, adapter, stream)),
                Err(e) => {
                    for (started_id, started_adapter, _) in started.into_iter().rev() {
                        if let Err(stop_err) = started_adapter.stop().await {
                            tracing::warn!(adapter_id = %started_id, error = %stop_err, "Rollback stop failed");
                        }
                    }
                    tracing::error!(error = %e, "Router start aborted");
                    return Err(e);
                }
            }
        }

        let count = started.len();
        for (id, _, stream) in started {
            let consumer = tokio::spawn(self.clone().consume(id.clone(), stream));
            lifecycle.consumers.insert(id, consumer);
        }
        lifecycle.running = true;
        tracing::info!(adapters = count, "Message router started");
        Ok(())
    }

    /// Stops every adapter. Individual failures are logged, not returned.
    pub async fn stop(&self) {
        let mut lifecycle = self.inner.lifecycle.lock().await;
        if !lifecycle.running {
            return;
        }

        let adapters: Vec<_> = self
            .inner
            .adapters
            .read()
            .await
            .iter()
            .map(|(id, a)| (id.clone(), Arc::clone(a)))
            .collect();
        for (id, adapter) in adapters {
            if let Err(e) = adapter.stop().await {
                tracing::warn!(adapter_id = %id, error = %e, "Adapter failed to stop");
            }
        }
        for (_, consumer) in lifecycle.consumers.drain() {
            consumer.abort();
        }
        lifecycle.running = false;
        tracing::info!("Message router stopped");
    }

    pub async fn stats(&self) -> RouterStats {
        let running = self.inner.lifecycle.lock().await.running;
        let adapters = self
            .inner
            .adapters
            .read()
            .await
            .iter()
            .map(|(id, a)| AdapterInfo {
                id: id.clone(),
                platform: a.platform_type(),
            })
            .collect();
        RouterStats { running, adapters }
    }

    /// Answers one message and delivers the answer to its origin.
    ///
    /// The whole resolve-and-deliver sequence runs under the route timeout.
    pub async fn route_message(
        &self,
        origin_id: &str,
        message: UnifiedMessage,
    ) -> Result<QueryAnswer, RouteError> {
        let adapter = self
            .inner
            .adapters
            .read()
            .await
            .get(origin_id)
            .cloned()
            .ok_or_else(|| RouteError::UnknownOrigin(origin_id.to_string()))?;

        self.archive(&message);

        tracing::debug!(
            origin = %origin_id,
            session_id = %message.session_id(),
            message_id = %message.id(),
            "Routing message"
        );

        let route_timeout = self.inner.route_timeout;
        timeout(route_timeout, self.resolve_and_deliver(adapter.as_ref(), &message))
            .await
            .map_err(|_| RouteError::Timeout(route_timeout))?
    }

    async fn resolve_and_deliver(
        &self,
        adapter: &dyn PlatformAdapter,
        message: &UnifiedMessage,
    ) -> Result<QueryAnswer, RouteError> {
        let history = self
            .inner
            .history
            .record(message.session_id(), message.content());
        let request = QueryRequest::new(
            message.session_id().clone(),
            message.user_id().clone(),
            message.content(),
        )
        .with_history(history);

        let answer = self.inner.query_service.process_query(request).await?;

        match adapter.platform_type() {
            PlatformType::Web => self
                .inner
                .hub
                .send_to_session(message.session_id(), ServerMessage::answer(&answer)),
            _ => {
                adapter
                    .send_message(message.user_id().as_str(), &answer.content)
                    .await?
            }
        }
        Ok(answer)
    }

    fn archive(&self, message: &UnifiedMessage) {
        let Some(archive) = self.inner.archive.clone() else {
            return;
        };
        let message = message.clone();
        tokio::spawn(async move {
            if let Err(e) = archive.record(&message).await {
                tracing::warn!(message_id = %message.id(), error = %e, "Failed to archive message");
            }
        });
    }

    async fn consume(self, origin_id: String, mut stream: MessageStream) {
        while let Some(message) = stream.next().await {
            let Ok(permit) = Arc::clone(&self.inner.in_flight).acquire_owned().await else {
                break;
            };
            let router = self.clone();
            let origin = origin_id.clone();
            tokio::spawn(async move {
                if let Err(e) = router.route_message(&origin, message).await {
                    tracing::warn!(origin = %origin, error = %e, "Routing failed");
                }
                drop(permit);
            });
        }
        tracing::debug!(origin = %origin_id, "Inbound stream ended");
    }
}

async fn start_adapter(id: &str, adapter: &dyn PlatformAdapter) -> Result<MessageStream, RouteError> {
    let start_error = |source| RouteError::Start {
        id: id.to_string(),
        source,
    };
    adapter.start().await.map_err(start_error)?;
    match adapter.receive_messages() {
        Ok(stream) => Ok(stream),
        Err(e) => {
            let _ = adapter.stop().await;
            Err(start_error(e))
        }
    }
}
