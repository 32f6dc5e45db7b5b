//! ConnectionHub - single-owner registry of live connections.
//!
//! The connection map is owned by one control loop. Every operation arrives
//! as a [`HubCommand`] over a channel and is applied in order, so sends to a
//! session are delivered to each of its connections in call order and a
//! register issued before a send is always visible to it.
//!
//! ```text
//! handler / router ──HubHandle──▶ [command channel] ──▶ ConnectionHub::run
//!                                                         │ try_send
//!                                                         ▼
//!                                          per-connection bounded queues
//! ```
//!
//! Slow consumers are evicted: a full outbound queue unregisters the
//! connection instead of blocking the loop.

use std::collections::{HashMap, HashSet};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::domain::foundation::{ConnectionId, SessionId};

use super::connection::{Connection, EnqueueError};
use super::messages::ServerMessage;

/// Operations applied by the hub's control loop.
#[derive(Debug)]
enum HubCommand {
    Register(Connection),
    Unregister(ConnectionId),
    SendToConnection {
        connection_id: ConnectionId,
        message: ServerMessage,
    },
    SendToSession {
        session_id: SessionId,
        message: ServerMessage,
    },
    SendToSessionExcept {
        session_id: SessionId,
        except: ConnectionId,
        message: ServerMessage,
    },
    Broadcast(ServerMessage),
    Count(oneshot::Sender<usize>),
    SessionCount(SessionId, oneshot::Sender<usize>),
    Shutdown,
}

/// Owner of the live connection set. Runs as a spawned task.
#[derive(Debug, Default)]
pub struct ConnectionHub {
    connections: HashMap<ConnectionId, Connection>,
    sessions: HashMap<SessionId, HashSet<ConnectionId>>,
}

/// Cloneable handle for talking to a running hub.
#[derive(Debug, Clone)]
pub struct HubHandle {
    commands: mpsc::UnboundedSender<HubCommand>,
}

impl ConnectionHub {
    /// Spawns the control loop and returns a handle to it.
    pub fn spawn() -> (HubHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(Self::default().run(rx));
        (HubHandle { commands: tx }, task)
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<HubCommand>) {
        tracing::debug!("Connection hub started");
        while let Some(command) = commands.recv().await {
            match command {
                HubCommand::Register(conn) => self.register(conn),
                HubCommand::Unregister(id) => {
                    self.remove(id);
                }
                HubCommand::SendToConnection {
                    connection_id,
                    message,
                } => self.deliver(&[connection_id], message),
                HubCommand::SendToSession {
                    session_id,
                    message,
                } => {
                    let targets = self.session_members(&session_id, None);
                    self.deliver(&targets, message);
                }
                HubCommand::SendToSessionExcept {
                    session_id,
                    except,
                    message,
                } => {
                    let targets = self.session_members(&session_id, Some(except));
                    self.deliver(&targets, message);
                }
                HubCommand::Broadcast(message) => {
                    let targets: Vec<_> = self.connections.keys().copied().collect();
                    self.deliver(&targets, message);
                }
                HubCommand::Count(reply) => {
                    let _ = reply.send(self.connections.len());
                }
                HubCommand::SessionCount(session_id, reply) => {
                    let n = self.sessions.get(&session_id).map_or(0, HashSet::len);
                    let _ = reply.send(n);
                }
                HubCommand::Shutdown => break,
            }
        }
        let remaining = self.connections.len();
        self.connections.clear();
        self.sessions.clear();
        tracing::info!(closed_connections = remaining, "Connection hub stopped");
    }

    fn register(&mut self, conn: Connection) {
        let id = conn.id();
        // A re-registered id must not linger under its old session.
        self.remove(id);
        self.sessions
            .entry(conn.session_id().clone())
            .or_default()
            .insert(id);
        tracing::debug!(connection_id = %id, session_id = %conn.session_id(), "Connection registered");
        self.connections.insert(id, conn);
    }

    fn remove(&mut self, id: ConnectionId) -> bool {
        let Some(conn) = self.connections.remove(&id) else {
            return false;
        };
        if let Some(members) = self.sessions.get_mut(conn.session_id()) {
            members.remove(&id);
            if members.is_empty() {
                self.sessions.remove(conn.session_id());
            }
        }
        tracing::debug!(connection_id = %id, session_id = %conn.session_id(), "Connection unregistered");
        true
    }

    fn session_members(&self, session_id: &SessionId, except: Option<ConnectionId>) -> Vec<ConnectionId> {
        self.sessions
            .get(session_id)
            .map(|members| {
                members
                    .iter()
                    .copied()
                    .filter(|id| Some(*id) != except)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn deliver(&mut self, targets: &[ConnectionId], message: ServerMessage) {
        let mut dead = Vec::new();
        for id in targets {
            let Some(conn) = self.connections.get(id) else {
                continue;
            };
            match conn.try_enqueue(message.clone()) {
                Ok(()) => {}
                Err(EnqueueError::Full) => {
                    tracing::warn!(
                        connection_id = %id,
                        session_id = %conn.session_id(),
                        "Outbound queue full, evicting slow connection"
                    );
                    dead.push(*id);
                }
                Err(EnqueueError::Closed) => dead.push(*id),
            }
        }
        for id in dead {
            self.remove(id);
        }
    }
}

impl HubHandle {
    fn submit(&self, command: HubCommand) {
        if self.commands.send(command).is_err() {
            tracing::debug!("Connection hub is not running, command dropped");
        }
    }

    /// Adds a connection to the live set.
    pub fn register(&self, connection: Connection) {
        self.submit(HubCommand::Register(connection));
    }

    /// Removes a connection and closes its queue. Idempotent.
    pub fn unregister(&self, connection_id: ConnectionId) {
        self.submit(HubCommand::Unregister(connection_id));
    }

    /// Sends to one connection, if still registered.
    pub fn send_to_connection(&self, connection_id: ConnectionId, message: ServerMessage) {
        self.submit(HubCommand::SendToConnection {
            connection_id,
            message,
        });
    }

    /// Sends to every connection of a session. No match is a silent no-op.
    pub fn send_to_session(&self, session_id: &SessionId, message: ServerMessage) {
        self.submit(HubCommand::SendToSession {
            session_id: session_id.clone(),
            message,
        });
    }

    /// Sends to every connection of a session except `except`.
    pub fn send_to_session_except(
        &self,
        session_id: &SessionId,
        except: ConnectionId,
        message: ServerMessage,
    ) {
        self.submit(HubCommand::SendToSessionExcept {
            session_id: session_id.clone(),
            except,
            message,
        });
    }

    /// Sends to every live connection.
    pub fn broadcast(&self, message: ServerMessage) {
        self.submit(HubCommand::Broadcast(message));
    }

    /// Point-in-time number of live connections; 0 once the hub has stopped.
    pub async fn connection_count(&self) -> usize {
        let (tx, rx) = oneshot::channel();
        self.submit(HubCommand::Count(tx));
        rx.await.unwrap_or(0)
    }

    /// Number of live connections for one session.
    pub async fn session_connection_count(&self, session_id: &SessionId) -> usize {
        let (tx, rx) = oneshot::channel();
        self.submit(HubCommand::SessionCount(session_id.clone(), tx));
        rx.await.unwrap_or(0)
    }

    /// Stops the control loop and closes every connection queue.
    pub fn shutdown(&self) {
        self.submit(HubCommand::Shutdown);
    }
}
