//! Per-key memoization with in-flight request coalescing.
//!
//! The first caller for a key runs the fetch; callers arriving while it is
//! pending wait on a watch channel and receive the same outcome. Successes
//! are kept until [`Coalescer::clear`]; failures are handed to every waiter
//! and then forgotten, so the next call fetches again.

use crate::DataError;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::trace;

type Outcome<V> = Option<Result<Arc<V>, DataError>>;

enum Slot<V> {
    Ready(Arc<V>),
    Pending {
        ticket: u64,
        rx: watch::Receiver<Outcome<V>>,
    },
}

enum Role<V> {
    Leader(u64, watch::Sender<Outcome<V>>),
    Follower(watch::Receiver<Outcome<V>>),
}

pub struct Coalescer<K, V> {
    slots: Mutex<HashMap<K, Slot<V>>>,
    tickets: AtomicU64,
}

impl<K, V> Default for Coalescer<K, V> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            tickets: AtomicU64::new(0),
        }
    }
}

impl<K, V> Coalescer<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, Slot<V>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Memoized value for `key`, running `fetch` at most once across
    /// concurrent callers.
    pub async fn get_or_fetch<F, Fut>(&self, key: K, fetch: F) -> Result<Arc<V>, DataError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, DataError>>,
    {
        let role = {
            let mut slots = self.lock();
            match slots.get(&key) {
                Some(Slot::Ready(value)) => return Ok(Arc::clone(value)),
                Some(Slot::Pending { rx, .. }) => Role::Follower(rx.clone()),
                None => {
                    let ticket = self.tickets.fetch_add(1, Ordering::Relaxed);
                    let (tx, rx) = watch::channel(None);
                    slots.insert(key.clone(), Slot::Pending { ticket, rx });
                    Role::Leader(ticket, tx)
                }
            }
        };

        match role {
            Role::Follower(mut rx) => {
                trace!("joining in-flight fetch");
                let outcome = rx
                    .wait_for(Option::is_some)
                    .await
                    .map(|seen| seen.clone())
                    .ok()
                    .flatten();
                outcome.unwrap_or(Err(DataError::Cancelled))
            }
            Role::Leader(ticket, tx) => {
                let mut guard = PendingGuard {
                    owner: self,
                    key: &key,
                    ticket,
                    armed: true,
                };
                let result = fetch().await.map(Arc::new);
                guard.armed = false;
                {
                    let mut slots = self.lock();
                    let ours = matches!(
                        slots.get(&key),
                        Some(Slot::Pending { ticket: t, .. }) if *t == ticket
                    );
                    if ours {
                        match &result {
                            Ok(value) => {
                                slots.insert(key.clone(), Slot::Ready(Arc::clone(value)));
                            }
                            Err(_) => {
                                slots.remove(&key);
                            }
                        }
                    }
                }
                tx.send_replace(Some(result.clone()));
                result
            }
        }
    }

    /// Drop memoized values. Pending fetches still answer their waiters
    /// but no longer populate the cache.
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn ready_len(&self) -> usize {
        self.lock()
            .values()
            .filter(|s| matches!(s, Slot::Ready(_)))
            .count()
    }

    pub fn pending_len(&self) -> usize {
        self.lock()
            .values()
            .filter(|s| matches!(s, Slot::Pending { .. }))
            .count()
    }
}

/// Removes the pending slot if the leading future is dropped mid-fetch.
struct PendingGuard<'a, K: Eq + Hash + Clone, V> {
    owner: &'a Coalescer<K, V>,
    key: &'a K,
    ticket: u64,
    armed: bool,
}

impl<K: Eq + Hash + Clone, V> Drop for PendingGuard<'_, K, V> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut slots = self.owner.lock();
        if matches!(
            slots.get(self.key),
            Some(Slot::Pending { ticket, .. }) if *ticket == self.ticket
        ) {
            slots.remove(self.key);
        }
    }
}
