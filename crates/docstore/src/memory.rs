//! In-process document store.
//!
//! Behaves like the `PostgreSQL` backend (atomic batches, conditional
//! increments, live snapshots) without a database. Tests use the extra
//! knobs to count writes and inject outages.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::{RwLock, broadcast, mpsc};

use crate::DocumentStore;
use crate::document::{Document, Fields};
use crate::error::StoreError;
use crate::subscription::{SUBSCRIPTION_BUFFER, Snapshot, Subscription};
use crate::write::{Write, incremented};

type Collection = BTreeMap<String, (u64, Fields)>;

/// Thread-safe in-memory [`DocumentStore`]. Clones share state.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<MemoryStoreInner>,
}

struct MemoryStoreInner {
    collections: RwLock<HashMap<String, Collection>>,
    changes: broadcast::Sender<String>,
    seq: AtomicU64,
    writes: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(MemoryStoreInner {
                collections: RwLock::new(HashMap::new()),
                changes,
                seq: AtomicU64::new(0),
                writes: AtomicUsize::new(0),
                fail_reads: AtomicBool::new(false),
                fail_writes: AtomicBool::new(false),
            }),
        }
    }

    /// Seed a document under a known identifier, bypassing write counting.
    pub async fn insert(&self, collection: &str, id: &str, fields: Fields) {
        let seq = self.next_seq();
        self.inner
            .collections
            .write()
            .await
            .entry(collection.to_owned())
            .or_default()
            .insert(id.to_owned(), (seq, fields));
        self.notify(collection);
    }

    /// Number of document writes that have succeeded so far.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.inner.writes.load(Ordering::SeqCst)
    }

    /// Make every subsequent read fail with `StoreError::Unavailable`.
    pub fn set_fail_reads(&self, fail: bool) {
        self.inner.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent write fail with `StoreError::Unavailable`.
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of live subscriptions still attached to the store.
    #[must_use]
    pub fn active_watchers(&self) -> usize {
        self.inner.changes.receiver_count()
    }

    fn next_seq(&self) -> u64 {
        self.inner.seq.fetch_add(1, Ordering::SeqCst)
    }

    fn notify(&self, collection: &str) {
        // No receivers is fine.
        let _ = self.inner.changes.send(collection.to_owned());
    }

    fn check_reads(&self) -> Result<(), StoreError> {
        if self.inner.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("reads disabled".to_owned()));
        }
        Ok(())
    }

    fn check_writes(&self) -> Result<(), StoreError> {
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".to_owned()));
        }
        Ok(())
    }

    async fn snapshot(inner: &MemoryStoreInner, collection: &str) -> Snapshot {
        let collections = inner.collections.read().await;
        let Some(docs) = collections.get(collection) else {
            return Vec::new();
        };
        let mut ordered: Vec<_> = docs.iter().collect();
        ordered.sort_by_key(|(_, (seq, _))| *seq);
        ordered
            .into_iter()
            .map(|(id, (_, data))| Document::new(id.clone(), data.clone()))
            .collect()
    }
}

fn apply(
    collections: &mut HashMap<String, Collection>,
    write: Write,
    seq: u64,
) -> Result<(), StoreError> {
    match write {
        Write::Create {
            collection,
            id,
            fields,
        } => {
            let docs = collections.entry(collection.clone()).or_default();
            if docs.contains_key(&id) {
                return Err(StoreError::AlreadyExists { collection, id });
            }
            docs.insert(id, (seq, fields));
        }
        Write::Update {
            collection,
            id,
            fields,
        } => {
            let (_, data) = collections
                .get_mut(&collection)
                .and_then(|docs| docs.get_mut(&id))
                .ok_or_else(|| StoreError::not_found(&collection, &id))?;
            data.extend(fields);
        }
        Write::Increment {
            collection,
            id,
            field,
            delta,
            floor,
        } => {
            let (_, data) = collections
                .get_mut(&collection)
                .and_then(|docs| docs.get_mut(&id))
                .ok_or_else(|| StoreError::not_found(&collection, &id))?;
            let current = Document::new(id.clone(), data.clone()).integer_field(&collection, &field)?;
            let next = incremented(&collection, &id, &field, current, delta, floor)?;
            data.insert(field, next.into());
        }
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        self.check_reads()?;
        Ok(Self::snapshot(&self.inner, collection).await)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.check_reads()?;
        let collections = self.inner.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|(_, data)| Document::new(id, data.clone())))
    }

    async fn create(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        self.apply_all(vec![Write::create(collection, id.clone(), fields)])
            .await?;
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
        self.apply_all(vec![Write::update(collection, id, fields)])
            .await
    }

    async fn apply_all(&self, writes: Vec<Write>) -> Result<(), StoreError> {
        self.check_writes()?;
        if writes.is_empty() {
            return Ok(());
        }

        let mut touched: Vec<String> = writes.iter().map(|w| w.collection().to_owned()).collect();
        touched.sort();
        touched.dedup();
        let count = writes.len();

        {
            let mut collections = self.inner.collections.write().await;
            // Work on a copy so a failing write leaves nothing behind.
            let mut staged = collections.clone();
            for write in writes {
                let seq = self.next_seq();
                apply(&mut staged, write, seq)?;
            }
            *collections = staged;
        }

        self.inner.writes.fetch_add(count, Ordering::SeqCst);
        for collection in &touched {
            self.notify(collection);
        }
        Ok(())
    }

    async fn watch(&self, collection: &str) -> Result<Subscription, StoreError> {
        self.check_reads()?;
        // Subscribe before the first snapshot so no change slips between them.
        let mut changes = self.inner.changes.subscribe();
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let inner = Arc::clone(&self.inner);
        let name = collection.to_owned();

        let task = tokio::spawn(async move {
            let initial = Self::snapshot(&inner, &name).await;
            if tx.send(Ok(initial)).await.is_err() {
                return;
            }
            loop {
                match changes.recv().await {
                    Ok(changed) if changed != name => {}
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {
                        let snapshot = Self::snapshot(&inner, &name).await;
                        if tx.send(Ok(snapshot)).await.is_err() {
                            return;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => return,
                }
            }
        });

        Ok(Subscription::new(collection, rx, task))
    }
}
