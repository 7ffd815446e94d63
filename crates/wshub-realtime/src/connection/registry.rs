//! Connection registry: live connections indexed by client identifier.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use wshub_core::config::DuplicatePolicy;
use wshub_core::{HubError, HubResult};

use super::handle::{CloseReason, ConnectionHandle, ConnectionId};

/// Thread-safe map of client identifier → connection handle.
///
/// Holds at most one entry per client identifier. All mutations go through
/// the per-shard locks of the underlying map, so each operation is a short
/// critical section.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    entries: DashMap<String, Arc<ConnectionHandle>>,
}

impl ConnectionRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Adds a connection.
    ///
    /// When the client id is taken by a live connection, `Replace` closes
    /// the old handle with [`CloseReason::Replaced`] while holding the entry
    /// lock and stores the new one; `Reject` fails with `DuplicateId`. An
    /// entry whose connection is already closing is replaced under either
    /// policy. Returns the evicted handle, if any.
    pub fn add(
        &self,
        handle: Arc<ConnectionHandle>,
        policy: DuplicatePolicy,
    ) -> HubResult<Option<Arc<ConnectionHandle>>> {
        match self.entries.entry(handle.client_id.clone()) {
            Entry::Vacant(vacant) => {
                vacant.insert(handle);
                Ok(None)
            }
            Entry::Occupied(mut occupied) => {
                let existing = occupied.get();
                if existing.is_alive() && policy == DuplicatePolicy::Reject {
                    return Err(HubError::duplicate_id(format!(
                        "client '{}' is already connected",
                        handle.client_id
                    )));
                }
                existing.close(CloseReason::Replaced);
                Ok(Some(occupied.insert(handle)))
            }
        }
    }

    /// Removes the entry for `client_id`. Removing a missing id is a no-op.
    pub fn remove(&self, client_id: &str) -> Option<Arc<ConnectionHandle>> {
        self.entries.remove(client_id).map(|(_, handle)| handle)
    }

    /// Removes the entry only if it still belongs to `connection_id`.
    pub fn remove_if_current(&self, client_id: &str, connection_id: ConnectionId) -> bool {
        self.entries
            .remove_if(client_id, |_, handle| handle.id == connection_id)
            .is_some()
    }

    /// Gets the connection for a client.
    pub fn get(&self, client_id: &str) -> Option<Arc<ConnectionHandle>> {
        self.entries.get(client_id).map(|entry| entry.value().clone())
    }

    /// Checks whether a client id is registered.
    pub fn contains(&self, client_id: &str) -> bool {
        self.entries.contains_key(client_id)
    }

    /// Returns all (client id, handle) pairs.
    pub fn snapshot(&self) -> Vec<(String, Arc<ConnectionHandle>)> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Returns all registered client ids.
    pub fn client_ids(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Removes and returns every entry.
    pub fn drain(&self) -> Vec<Arc<ConnectionHandle>> {
        self.client_ids()
            .into_iter()
            .filter_map(|client_id| self.remove(&client_id))
            .collect()
    }

    /// Returns the number of registered connections.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
