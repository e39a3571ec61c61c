use std::sync::Arc;

use tracing::{error, info};

use common::{BrokerClient, OrderReceipt, OrderRequest};

/// Sends orders and position closes to the broker.
///
/// This is the ONLY component that calls `BrokerClient::submit_order` or
/// `BrokerClient::cancel_position`. Failures are logged and swallowed: the
/// polling loop carries on and retries nothing.
pub struct OrderExecutor {
    client: Arc<dyn BrokerClient>,
}

impl OrderExecutor {
    pub fn new(client: Arc<dyn BrokerClient>) -> Self {
        Self { client }
    }

    /// Submit one order. Returns the receipt when the broker accepted it.
    pub async fn submit(&self, order: &OrderRequest) -> Option<OrderReceipt> {
        info!(
            instrument = %order.instrument,
            side = %order.side,
            volume = order.volume,
            price = order.entry_price,
            stop_loss = ?order.stop_loss,
            take_profit = ?order.take_profit,
            "Executing order"
        );

        match self.client.submit_order(order).await {
            Ok(receipt) => {
                info!(
                    ticket = receipt.ticket,
                    instrument = %receipt.instrument,
                    price = receipt.price,
                    volume = receipt.volume,
                    "Order filled"
                );
                Some(receipt)
            }
            Err(e) => {
                error!(instrument = %order.instrument, order_id = %order.id, error = %e, "Order submission failed");
                None
            }
        }
    }

    /// Close each ticket. Returns the tickets the broker confirmed closed.
    pub async fn close_all(&self, instrument: &str, tickets: &[u64]) -> Vec<u64> {
        let mut closed = Vec::with_capacity(tickets.len());
        for &ticket in tickets {
            match self.client.cancel_position(instrument, ticket).await {
                Ok(()) => {
                    info!(instrument, ticket, "Position closed");
                    closed.push(ticket);
                }
                Err(e) => error!(instrument, ticket, error = %e, "Failed to close position"),
            }
        }
        closed
    }
}
