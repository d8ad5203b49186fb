//! State shared between the client facade and its background tasks.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use okobere_heartbeat::HeartbeatHandle;
use okobere_protocol::Message;
use okobere_session::{ClientState, Session};
use okobere_transport::{ConnectionId, LineConnection};
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::event::ClientEvent;
use crate::queue::MessageQueue;

/// Handles of the background tasks bound to the current connection.
///
/// `reconnect` is separate: the coordinator stops the others but must not
/// abort itself.
#[derive(Default)]
pub(crate) struct Tasks {
    pub(crate) router: Option<JoinHandle<()>>,
    pub(crate) processor: Option<JoinHandle<()>>,
    pub(crate) watcher: Option<JoinHandle<()>>,
    pub(crate) heartbeat: Option<HeartbeatHandle>,
    pub(crate) reconnect: Option<JoinHandle<()>>,
}

impl Tasks {
    fn stop_session_tasks(&mut self) {
        for task in [
            self.router.take(),
            self.processor.take(),
            self.watcher.take(),
        ]
        .into_iter()
        .flatten()
        {
            task.abort();
        }
        if let Some(heartbeat) = self.heartbeat.take() {
            heartbeat.stop();
        }
    }
}

pub(crate) struct Shared {
    pub(crate) config: ClientConfig,
    pub(crate) session: tokio::sync::Mutex<Session>,
    pub(crate) sync_queue: MessageQueue,
    pub(crate) async_queue: MessageQueue,
    /// Set by `disconnect()`; suppresses every automatic reconnect.
    pub(crate) manual_disconnect: AtomicBool,
    /// Set while a reconnect coordinator owns the connection.
    pub(crate) reconnecting: AtomicBool,
    connection: RwLock<Option<Arc<LineConnection>>>,
    /// Id of `connection`, readable without awaiting. 0 means none.
    connection_id: AtomicU64,
    endpoint: Mutex<Option<(String, u16)>>,
    /// State to restore after a dropped connection. Survives failed
    /// reconnect rounds so a manual retry restores the same thing.
    resume_target: Mutex<Option<ClientState>>,
    tasks: Mutex<Tasks>,
    events: mpsc::UnboundedSender<ClientEvent>,
}

impl Shared {
    pub(crate) fn new(config: ClientConfig, events: mpsc::UnboundedSender<ClientEvent>) -> Self {
        let recheck = config.waiter_recheck();
        Self {
            config,
            session: tokio::sync::Mutex::new(Session::new()),
            sync_queue: MessageQueue::new(recheck),
            async_queue: MessageQueue::new(recheck),
            manual_disconnect: AtomicBool::new(false),
            reconnecting: AtomicBool::new(false),
            connection: RwLock::new(None),
            connection_id: AtomicU64::new(0),
            endpoint: Mutex::new(None),
            resume_target: Mutex::new(None),
            tasks: Mutex::new(Tasks::default()),
            events,
        }
    }

    pub(crate) fn emit(&self, event: ClientEvent) {
        if self.events.send(event).is_err() {
            debug!("event receiver dropped");
        }
    }

    // -- Connection ------------------------------------------------------------

    /// The live connection, or [`ClientError::NotConnected`].
    pub(crate) async fn connection(&self) -> Result<Arc<LineConnection>, ClientError> {
        self.connection
            .read()
            .await
            .clone()
            .ok_or(ClientError::NotConnected)
    }

    pub(crate) async fn install_connection(&self, conn: Arc<LineConnection>) {
        self.connection_id
            .store(conn.id().into_inner(), Ordering::SeqCst);
        *self.connection.write().await = Some(conn);
    }

    pub(crate) async fn take_connection(&self) -> Option<Arc<LineConnection>> {
        self.connection_id.store(0, Ordering::SeqCst);
        self.connection.write().await.take()
    }

    /// `true` if `id` is the connection currently installed.
    pub(crate) fn is_current(&self, id: ConnectionId) -> bool {
        self.connection_id.load(Ordering::SeqCst) == id.into_inner()
    }

    pub(crate) fn set_endpoint(&self, host: &str, port: u16) {
        *lock(&self.endpoint) = Some((host.to_string(), port));
    }

    pub(crate) fn endpoint(&self) -> Option<(String, u16)> {
        lock(&self.endpoint).clone()
    }

    /// Sends without waiting for anything, on a short-lived task.
    pub(crate) fn send_detached(self: &Arc<Self>, msg: Message) {
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            let Ok(conn) = shared.connection().await else {
                debug!(command = %msg.command, "no connection, dropping outbound message");
                return;
            };
            if let Err(e) = conn.send(&msg.encode()).await {
                debug!(command = %msg.command, error = %e, "detached send failed");
            }
        });
    }

    // -- Reconnect bookkeeping ---------------------------------------------------

    /// Records `prior` as the state to restore unless an earlier, still
    /// unresolved loss already did. Returns the effective target.
    pub(crate) fn remember_resume_target(&self, prior: ClientState) -> ClientState {
        *lock(&self.resume_target).get_or_insert(prior)
    }

    pub(crate) fn clear_resume_target(&self) {
        *lock(&self.resume_target) = None;
    }

    // -- Tasks -------------------------------------------------------------------

    pub(crate) fn tasks(&self) -> MutexGuard<'_, Tasks> {
        lock(&self.tasks)
    }

    /// Stops router, processor, watcher and heartbeat.
    pub(crate) fn stop_session_tasks(&self) {
        self.tasks().stop_session_tasks();
    }

    /// Stops everything, including a running reconnect coordinator.
    pub(crate) fn stop_all_tasks(&self) {
        let mut tasks = self.tasks();
        tasks.stop_session_tasks();
        if let Some(reconnect) = tasks.reconnect.take() {
            reconnect.abort();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
