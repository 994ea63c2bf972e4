/// Connection registry for the notification relay
///
/// Tracks live WebSocket connections in two maps guarded by one mutex:
///
/// - `users`: user ID -> most recent connection, used for unicast. A second
///   login from the same user silently replaces the entry, so direct events
///   reach only the newest session; the older socket stays open and keeps
///   receiving tenant broadcasts until it disconnects.
/// - `tenants`: tenant ID -> all connections for that tenant, used for
///   multicast. The per-tenant map is removed when its last connection
///   leaves, so the registry does not accumulate empty sets.
///
/// Connections are represented by an unbounded channel sender; the
/// transport task owns the socket and drains the receiver into it. The
/// mutex is held only to look up senders, never across a socket write.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};
use uuid::Uuid;

use super::event::WsEvent;

/// Identifier for one registered connection, unique per registry
type ConnId = u64;

#[derive(Clone)]
struct Connection {
    id: ConnId,
    sender: UnboundedSender<String>,
}

/// Handle returned by [`ConnectionRegistry::connect`]
///
/// The transport task keeps this alive for the duration of the socket and
/// passes it back to [`ConnectionRegistry::disconnect`] when the socket
/// closes.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionHandle {
    id: ConnId,
    user_id: Uuid,
    tenant_id: Uuid,
}

impl ConnectionHandle {
    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }
}

#[derive(Default)]
struct RegistryInner {
    users: HashMap<Uuid, Connection>,
    tenants: HashMap<Uuid, HashMap<ConnId, Connection>>,
}

/// In-process registry of live client connections
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
pub struct ConnectionRegistry {
    inner: Mutex<RegistryInner>,
    next_id: AtomicU64,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryInner::default()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers a connection for an authenticated user
    ///
    /// Returns the handle for later deregistration and the receiver whose
    /// messages the transport task writes to the socket.
    pub fn connect(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
    ) -> (ConnectionHandle, UnboundedReceiver<String>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let connection = Connection { id, sender };

        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        if inner.users.insert(user_id, connection.clone()).is_some() {
            debug!(%user_id, "Replacing existing unicast entry for user");
        }
        inner
            .tenants
            .entry(tenant_id)
            .or_default()
            .insert(id, connection);

        debug!(%user_id, %tenant_id, conn_id = id, "Client connected");

        (
            ConnectionHandle {
                id,
                user_id,
                tenant_id,
            },
            receiver,
        )
    }

    /// Removes a connection when its socket closes
    ///
    /// The unicast entry is removed only if it still points at this
    /// connection; a newer session for the same user is left in place.
    pub fn disconnect(&self, handle: ConnectionHandle) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        if inner
            .users
            .get(&handle.user_id)
            .is_some_and(|c| c.id == handle.id)
        {
            inner.users.remove(&handle.user_id);
        }

        if let Some(connections) = inner.tenants.get_mut(&handle.tenant_id) {
            connections.remove(&handle.id);
            if connections.is_empty() {
                inner.tenants.remove(&handle.tenant_id);
            }
        }

        debug!(
            user_id = %handle.user_id,
            tenant_id = %handle.tenant_id,
            conn_id = handle.id,
            "Client disconnected"
        );
    }

    /// Sends an event to one user's most recent connection
    ///
    /// Returns `true` if the event was queued. Offline users and closed
    /// channels are misses, not errors.
    pub fn emit_to_user(&self, user_id: Uuid, event: &WsEvent) -> bool {
        let sender = {
            let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            inner.users.get(&user_id).map(|c| c.sender.clone())
        };

        match sender {
            Some(sender) => {
                let delivered = sender.send(event.to_json()).is_ok();
                if !delivered {
                    warn!(%user_id, event = event.event, "Unicast to closed connection");
                }
                delivered
            }
            None => false,
        }
    }

    /// Sends an event to every connection in a tenant
    ///
    /// The envelope is serialized once and the string cloned per recipient.
    /// Returns the number of connections the event was queued to.
    pub fn emit_to_tenant(&self, tenant_id: Uuid, event: &WsEvent) -> usize {
        let senders: Vec<UnboundedSender<String>> = {
            let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            match inner.tenants.get(&tenant_id) {
                Some(connections) => connections.values().map(|c| c.sender.clone()).collect(),
                None => return 0,
            }
        };

        let payload = event.to_json();
        senders
            .iter()
            .filter(|sender| sender.send(payload.clone()).is_ok())
            .count()
    }

    /// Number of live connections for a tenant
    pub fn tenant_connection_count(&self, tenant_id: Uuid) -> usize {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.tenants.get(&tenant_id).map_or(0, HashMap::len)
    }

    /// Whether a user currently has a unicast connection
    pub fn is_user_connected(&self, user_id: Uuid) -> bool {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.users.contains_key(&user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::event::EventKind;
    use serde_json::json;

    fn event() -> WsEvent {
        WsEvent::new(EventKind::TaskCreated, json!({"id": 1}))
    }

    #[test]
    fn test_default_registry_is_empty() {
        let registry = ConnectionRegistry::default();
        assert!(!registry.is_user_connected(Uuid::new_v4()));
        assert_eq!(registry.tenant_connection_count(Uuid::new_v4()), 0);
    }

    #[test]
    fn test_unicast_reaches_connected_user() {
        let registry = ConnectionRegistry::new();
        let user_id = Uuid::new_v4();
        let (_handle, mut receiver) = registry.connect(user_id, Uuid::new_v4());

        assert!(registry.emit_to_user(user_id, &event()));

        let frame = receiver.try_recv().unwrap();
        assert!(frame.contains("task:created"));
    }

    #[test]
    fn test_unicast_to_offline_user_is_a_miss() {
        let registry = ConnectionRegistry::new();
        assert!(!registry.emit_to_user(Uuid::new_v4(), &event()));
    }

    #[test]
    fn test_second_session_takes_over_unicast() {
        let registry = ConnectionRegistry::new();
        let user_id = Uuid::new_v4();
        let tenant_id = Uuid::new_v4();

        let (_first, mut first_rx) = registry.connect(user_id, tenant_id);
        let (_second, mut second_rx) = registry.connect(user_id, tenant_id);

        assert!(registry.emit_to_user(user_id, &event()));

        assert!(first_rx.try_recv().is_err());
        assert!(second_rx.try_recv().is_ok());
    }

    #[test]
    fn test_both_sessions_receive_tenant_multicast() {
        let registry = ConnectionRegistry::new();
        let user_id = Uuid::new_v4();
        let tenant_id = Uuid::new_v4();

        let (_first, mut first_rx) = registry.connect(user_id, tenant_id);
        let (_second, mut second_rx) = registry.connect(user_id, tenant_id);

        assert_eq!(registry.emit_to_tenant(tenant_id, &event()), 2);
        assert!(first_rx.try_recv().is_ok());
        assert!(second_rx.try_recv().is_ok());
    }

    #[test]
    fn test_multicast_skips_other_tenants() {
        let registry = ConnectionRegistry::new();
        let tenant_a = Uuid::new_v4();
        let tenant_b = Uuid::new_v4();

        let (_a, mut a_rx) = registry.connect(Uuid::new_v4(), tenant_a);
        let (_b, mut b_rx) = registry.connect(Uuid::new_v4(), tenant_b);

        assert_eq!(registry.emit_to_tenant(tenant_a, &event()), 1);
        assert!(a_rx.try_recv().is_ok());
        assert!(b_rx.try_recv().is_err());
    }

    #[test]
    fn test_disconnect_prunes_empty_tenant_set() {
        let registry = ConnectionRegistry::new();
        let tenant_id = Uuid::new_v4();
        let (handle, _rx) = registry.connect(Uuid::new_v4(), tenant_id);

        assert_eq!(registry.tenant_connection_count(tenant_id), 1);
        registry.disconnect(handle);
        assert_eq!(registry.tenant_connection_count(tenant_id), 0);
        assert_eq!(registry.emit_to_tenant(tenant_id, &event()), 0);
    }

    #[test]
    fn test_stale_disconnect_keeps_newer_session() {
        let registry = ConnectionRegistry::new();
        let user_id = Uuid::new_v4();
        let tenant_id = Uuid::new_v4();

        let (first, _first_rx) = registry.connect(user_id, tenant_id);
        let (_second, mut second_rx) = registry.connect(user_id, tenant_id);

        // First socket closes after being superseded
        registry.disconnect(first);

        assert!(registry.is_user_connected(user_id));
        assert!(registry.emit_to_user(user_id, &event()));
        assert!(second_rx.try_recv().is_ok());
        assert_eq!(registry.tenant_connection_count(tenant_id), 1);
    }
}
