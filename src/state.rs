//! Shared application state.

use crate::domain::events::DomainEvent;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub nats: Option<async_nats::Client>,
}

impl AppState {
    /// Best-effort event publish. Without a configured NATS client this
    /// is a no-op; a publish failure is logged, never surfaced to the
    /// request.
    pub async fn publish(&self, event: DomainEvent) {
        let Some(client) = &self.nats else { return };
        match serde_json::to_vec(&event) {
            Ok(payload) => {
                if let Err(e) = client.publish(event.subject().to_string(), payload.into()).await {
                    tracing::warn!(subject = event.subject(), error = %e, "event publish failed");
                }
            }
            Err(e) => tracing::warn!(error = %e, "event serialization failed"),
        }
    }
}
