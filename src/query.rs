//! Keyed cache of remote query results with observer counting.
//!
//! The first observer of a key receives a [`FetchTicket`]; whoever holds it
//! runs the fetch and hands the result back through [`QueryClient::resolve`].
//! Later observers share the cached state. When the last observer leaves the
//! entry is evicted, and a result arriving for it afterwards is discarded.

use crate::fetch::FetchError;
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FetchTicket {
    pub key: &'static str,
    id: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum QueryStatus<T> {
    Loading,
    Error(FetchError),
    Success(T),
}

struct QueryEntry<T> {
    status: QueryStatus<T>,
    observers: usize,
    in_flight: Option<u64>,
}

pub struct QueryClient<T> {
    entries: HashMap<&'static str, QueryEntry<T>>,
    next_id: u64,
}

impl<T> Default for QueryClient<T> {
    fn default() -> Self {
        Self { entries: HashMap::new(), next_id: 0 }
    }
}

impl<T> QueryClient<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer. Returns a ticket only when a fetch must start.
    pub fn subscribe(&mut self, key: &'static str) -> Option<FetchTicket> {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.observers += 1;
            return None;
        }
        self.next_id += 1;
        let id = self.next_id;
        self.entries.insert(
            key,
            QueryEntry { status: QueryStatus::Loading, observers: 1, in_flight: Some(id) },
        );
        log::debug!("query {:?}: fetch #{} started", key, id);
        Some(FetchTicket { key, id })
    }

    pub fn unsubscribe(&mut self, key: &'static str) {
        let Some(entry) = self.entries.get_mut(key) else { return };
        entry.observers = entry.observers.saturating_sub(1);
        if entry.observers == 0 {
            self.entries.remove(key);
            log::debug!("query {:?}: last observer left, entry evicted", key);
        }
    }

    /// Stores a finished fetch. Returns false if the ticket is stale.
    pub fn resolve(&mut self, ticket: FetchTicket, result: Result<T, FetchError>) -> bool {
        match self.entries.get_mut(ticket.key) {
            Some(entry) if entry.in_flight == Some(ticket.id) => {
                entry.in_flight = None;
                entry.status = match result {
                    Ok(data) => QueryStatus::Success(data),
                    Err(e) => QueryStatus::Error(e),
                };
                true
            }
            _ => {
                log::debug!("query {:?}: discarding result of fetch #{}", ticket.key, ticket.id);
                false
            }
        }
    }

    pub fn status(&self, key: &str) -> Option<&QueryStatus<T>> {
        self.entries.get(key).map(|e| &e.status)
    }

    #[cfg(test)]
    pub fn observers(&self, key: &str) -> usize {
        self.entries.get(key).map_or(0, |e| e.observers)
    }
}
