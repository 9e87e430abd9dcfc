//! Bus wiring for the order manager: consumes `execution:<symbol>`
//! and upserts into an [`OrderStore`], one transaction per event.

use std::sync::Arc;

use kestrel_bus::MessageBus;
use kestrel_core::model::OrderEvent;
use kestrel_core::shutdown::ShutdownSignal;
use kestrel_core::topic;
use tracing::{info, warn};

use crate::store::OrderStore;

pub struct OrderManagerService {
    bus: MessageBus,
    symbol: String,
    store: Arc<dyn OrderStore>,
}

impl std::fmt::Debug for OrderManagerService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderManagerService")
            .field("symbol", &self.symbol)
            .finish_non_exhaustive()
    }
}

impl OrderManagerService {
    pub fn new(bus: MessageBus, symbol: String, store: Arc<dyn OrderStore>) -> Self {
        Self { bus, symbol, store }
    }

    pub async fn run(self, shutdown: ShutdownSignal) -> Result<(), kestrel_bus::BusError> {
        let mut executions = self
            .bus
            .subscribe::<OrderEvent>(&topic::execution(&self.symbol))
            .await?;

        loop {
            tokio::select! {
                _ = shutdown.wait() => return Ok(()),
                envelope = executions.recv() => {
                    let Some(envelope) = envelope else { return Ok(()) };
                    let event = envelope.value;
                    match self.store.apply(&event) {
                        Ok(()) => {
                            info!(
                                order_id = event.order_id,
                                exec_type = %event.exec_type,
                                status = %event.status,
                                "order record updated"
                            );
                        }
                        Err(field) => {
                            warn!(
                                order_id = event.order_id,
                                %field,
                                "rejecting execution update with an unrecognised enum value"
                            );
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryOrderStore;

    #[test]
    fn store_is_cheaply_shared_between_the_worker_and_admin_adapter() {
        let store: Arc<dyn OrderStore> = Arc::new(InMemoryOrderStore::new());
        assert_eq!(store.all().len(), 0);
    }
}
