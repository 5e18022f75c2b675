//! Cancellable live-update handles.

use futures::Stream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::document::Document;
use crate::error::StoreError;

/// Full contents of a collection at one point in time.
pub type Snapshot = Vec<Document>;

/// Buffered snapshots per subscription before the producer waits.
pub(crate) const SUBSCRIPTION_BUFFER: usize = 16;

/// A standing request for snapshots of one collection.
///
/// The producer task behind the handle is aborted when the handle is
/// dropped or [closed](Subscription::close), so a subscription never
/// outlives its consumer.
pub struct Subscription {
    collection: String,
    receiver: mpsc::Receiver<Result<Snapshot, StoreError>>,
    task: JoinHandle<()>,
}

impl Subscription {
    pub(crate) fn new(
        collection: &str,
        receiver: mpsc::Receiver<Result<Snapshot, StoreError>>,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            collection: collection.to_owned(),
            receiver,
            task,
        }
    }

    /// Wait for the next snapshot. `None` once the producer has stopped.
    pub async fn next(&mut self) -> Option<Result<Snapshot, StoreError>> {
        self.receiver.recv().await
    }

    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Release the subscription.
    pub fn close(self) {
        drop(self);
    }

    /// Adapt into a `Stream` of snapshots.
    pub fn into_stream(self) -> impl Stream<Item = Result<Snapshot, StoreError>> + Send {
        futures::stream::unfold(self, |mut subscription| async move {
            subscription
                .next()
                .await
                .map(|snapshot| (snapshot, subscription))
        })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
        tracing::debug!(collection = %self.collection, "subscription released");
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}
