use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::ServiceRequestStatus;

/// Events emitted by the services after successful mutations. Consumers are
/// strictly best-effort: a send failure is logged and never fails the
/// operation that produced the event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Vehicle registry events
    VehicleCreated(Uuid),
    VehicleUpdated(Uuid),
    VehicleDeleted(Uuid),

    // Service request workflow events
    ServiceRequestCreated(Uuid),
    MechanicAssigned {
        request_id: Uuid,
        mechanic_id: Uuid,
    },
    ServiceRequestStatusChanged {
        request_id: Uuid,
        old_status: ServiceRequestStatus,
        new_status: ServiceRequestStatus,
    },

    // Billing events
    InvoiceCreated(Uuid),
    InvoiceUpdated(Uuid),
    InvoiceDeleted(Uuid),
    PaymentProcessed {
        invoice_id: Uuid,
        payment_method: String,
    },

    // Service item ledger events
    ServiceItemCreated(Uuid),
    ServiceItemUpdated(Uuid),
    ServiceItemDeleted(Uuid),
    OrphanedItemsPurged {
        count: u64,
    },

    // User events
    UserRegistered(Uuid),
    UserUpdated(Uuid),
    UserDeleted(Uuid),
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event, logging (but swallowing) failures so that domain
    /// operations never fail because the consumer fell behind or shut down.
    pub async fn send(&self, event: Event) {
        if let Err(e) = self.sender.send(event).await {
            warn!("Failed to send event: {}", e);
        }
    }
}

/// Event processing loop. Spawned once at startup; currently a structured
/// log sink, which is where outbound notifications would hang off.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::MechanicAssigned {
                request_id,
                mechanic_id,
            } => {
                info!(%request_id, %mechanic_id, "mechanic assigned");
            }
            Event::ServiceRequestStatusChanged {
                request_id,
                old_status,
                new_status,
            } => {
                info!(%request_id, %old_status, %new_status, "service request status changed");
            }
            Event::PaymentProcessed {
                invoice_id,
                payment_method,
            } => {
                info!(%invoice_id, %payment_method, "payment processed");
            }
            Event::OrphanedItemsPurged { count } => {
                info!(count, "orphaned service items purged");
            }
            other => {
                info!("Received event: {:?}", other);
            }
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_failure_is_swallowed() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        // Must not panic or error even though the receiver is gone.
        let sender = EventSender::new(tx);
        sender.send(Event::VehicleCreated(Uuid::new_v4())).await;
    }

    #[tokio::test]
    async fn events_round_trip_through_channel() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        let id = Uuid::new_v4();

        sender.send(Event::InvoiceCreated(id)).await;

        match rx.recv().await {
            Some(Event::InvoiceCreated(got)) => assert_eq!(got, id),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
