use std::sync::Arc;
use tokio::sync::Mutex;

use crate::{
    error::Result,
    model::{Place, PlaceOrigin, RecentSearchEntry},
    store::Store,
};

/// Most entries the cache keeps.
pub const CAPACITY: usize = 3;

#[derive(Debug)]
struct Inner {
    store: Arc<dyn Store>,
    /// Most recent first. Only changed after the store confirmed the write.
    entries: Mutex<Vec<RecentSearchEntry>>,
}

/// Bounded, deduplicated cache of selected places, backed by a [`Store`].
///
/// Clones share the same cache; the mutex is the single writer for it.
#[derive(Debug, Clone)]
pub struct RecentSearchStore {
    inner: Arc<Inner>,
}

impl RecentSearchStore {
    /// Rehydrate from `store`. A failing store yields an empty cache.
    pub async fn load(store: Arc<dyn Store>) -> Self {
        let listed = match store.list().await {
            Ok(listed) => listed,
            Err(err) => {
                tracing::warn!(error = %err, "recent searches unavailable");
                Vec::new()
            }
        };

        let mut entries: Vec<RecentSearchEntry> = Vec::with_capacity(CAPACITY);
        let mut excess = Vec::new();
        for mut entry in listed.into_iter().rev() {
            if entries.iter().any(|kept| kept.same_place(&entry.place)) {
                continue;
            }
            entry.place.origin = PlaceOrigin::Recent;
            if entries.len() < CAPACITY {
                entries.push(entry);
            } else {
                excess.push(entry);
            }
        }

        for entry in &excess {
            if let Err(err) = store.delete(entry).await {
                tracing::warn!(error = %err, place = %entry.place.city_state(), "failed to evict stale entry");
            }
        }

        tracing::debug!(count = entries.len(), "recent searches loaded");

        Self {
            inner: Arc::new(Inner {
                store,
                entries: Mutex::new(entries),
            }),
        }
    }

    /// Most recent first.
    pub async fn list(&self) -> Vec<RecentSearchEntry> {
        self.inner.entries.lock().await.clone()
    }

    pub async fn most_recent(&self) -> Option<RecentSearchEntry> {
        self.inner.entries.lock().await.first().cloned()
    }

    /// Record `place` as the most recent search.
    ///
    /// An existing entry with the same identity is removed first; otherwise,
    /// at [`CAPACITY`], the oldest entry is evicted before the insert. On a
    /// store failure the cache keeps whatever the store already confirmed.
    pub async fn upsert(&self, place: Place) -> Result<()> {
        let mut entries = self.inner.entries.lock().await;
        let store = &self.inner.store;
        let entry = RecentSearchEntry::new(place);

        if let Some(pos) = entries.iter().position(|e| e.same_place(&entry.place)) {
            store.delete(&entries[pos]).await?;
            entries.remove(pos);
        }

        while entries.len() >= CAPACITY {
            let Some(oldest) = entries.last() else { break };
            store.delete(oldest).await?;
            if let Some(evicted) = entries.pop() {
                tracing::debug!(place = %evicted.place.city_state(), "recent search evicted");
            }
        }

        store.insert(&entry).await?;
        tracing::info!(place = %entry.place.city_state(), "recent search recorded");
        entries.insert(0, entry);

        Ok(())
    }
}
