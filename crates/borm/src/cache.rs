//! Insert-once, read-many caches.
//!
//! Both the schema cache and the prepared statement cache are filled lazily by whichever
//! caller first needs an entry. Each key owns its own slot lock, so concurrent callers
//! asking for the same key wait for a single build instead of racing to produce duplicates,
//! while callers asking for other keys are not blocked.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Slot<V> = Arc<Mutex<Option<V>>>;

/// A map whose values are built at most once per key.
pub struct OnceMap<K, V> {
    slots: Mutex<HashMap<K, Slot<V>>>,
}

impl<K, V> Default for OnceMap<K, V> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, V> fmt::Debug for OnceMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnceMap")
            .field("len", &lock(&self.slots).len())
            .finish()
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panic inside `init` leaves the slot empty, which is a valid state.
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<K: Eq + Hash, V: Clone> OnceMap<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the value for `key`, running `init` if no value has been stored yet.
    ///
    /// A failed `init` stores nothing; the next caller tries again.
    pub fn get_or_try_init<E>(&self, key: K, init: impl FnOnce() -> Result<V, E>) -> Result<V, E> {
        let slot = lock(&self.slots).entry(key).or_default().clone();

        let mut value = lock(&slot);
        if let Some(v) = value.as_ref() {
            return Ok(v.clone());
        }
        let built = init()?;
        *value = Some(built.clone());
        Ok(built)
    }

    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let slot = lock(&self.slots).get(key)?.clone();
        let value = lock(&slot);
        value.clone()
    }

    /// Number of keys holding a built value.
    pub fn len(&self) -> usize {
        let slots: Vec<_> = lock(&self.slots).values().cloned().collect();
        slots.iter().filter(|s| lock(s).is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Prepared statements keyed by rendered SQL text.
///
/// Lives inside a [`crate::Database`] implementation, so entries last as long as the
/// connection they were prepared on. Shared across threads; never evicted.
pub struct StatementCache<S> {
    statements: OnceMap<String, S>,
}

impl<S> Default for StatementCache<S> {
    fn default() -> Self {
        Self {
            statements: OnceMap::default(),
        }
    }
}

impl<S> fmt::Debug for StatementCache<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatementCache")
            .field("statements", &self.statements)
            .finish()
    }
}

impl<S: Clone> StatementCache<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached statement for `sql`, preparing it on a miss.
    pub fn get_or_prepare<E>(
        &self,
        sql: &str,
        prepare: impl FnOnce(&str) -> Result<S, E>,
    ) -> Result<S, E> {
        if let Some(stmt) = self.statements.get(sql) {
            return Ok(stmt);
        }
        self.statements.get_or_try_init(sql.to_string(), || {
            tracing::debug!(target: "borm::stmt", sql, "preparing statement");
            prepare(sql)
        })
    }

    pub fn contains(&self, sql: &str) -> bool {
        self.statements.get(sql).is_some()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// Shared handle to a statement cache, for adapters that accept an injected one.
pub type SharedStatementCache<S> = Arc<StatementCache<S>>;
