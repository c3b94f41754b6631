//! Acknowledgment sender.
//!
//! Tells the kitchen server a job has been consumed and records the
//! acknowledgment locally on success. Failures are logged and left for a
//! later cycle: a printed-but-unacknowledged job is acknowledged again the
//! next time the server lists it.

use crate::client::ApiClient;
use crate::job::JobId;
use crate::seen::SeenStore;

#[derive(Clone)]
pub struct AckSender {
    client: ApiClient,
    seen: SeenStore,
}

impl AckSender {
    pub fn new(client: ApiClient, seen: SeenStore) -> Self {
        Self { client, seen }
    }

    /// Acknowledge `id`. Returns whether the server accepted it.
    pub async fn send(&self, base_url: &str, id: &JobId) -> bool {
        match self.client.acknowledge(base_url, id).await {
            Ok(()) => {
                if let Err(e) = self.seen.mark_acknowledged(id) {
                    tracing::warn!(serial = %id, error = %e, "failed to persist acknowledgment");
                }
                tracing::info!(serial = %id, "acknowledged");
                true
            }
            Err(e) => {
                tracing::warn!(serial = %id, error = %e, "acknowledgment failed");
                false
            }
        }
    }
}
