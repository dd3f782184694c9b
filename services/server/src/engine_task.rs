//! Engine thread
//!
//! The matching engine runs on exactly one dedicated OS thread. Requests
//! arrive through a bounded channel; the loop polls with a short timeout
//! so the cooperative shutdown flag is observed between dequeues, and an
//! in-flight `process` call always completes. The output buffer is
//! allocated once and reused for every message.

use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

use crate::metrics::{inc, Metrics};
use crate::registry::{ClientId, ClientRegistry};
use crate::router::route_output;
use matching_engine::MatchingEngine;
use types::{InputMessage, OutputMessage};

/// Poll interval for the shutdown flag.
const RECV_TIMEOUT: Duration = Duration::from_millis(100);

/// A decoded request tagged with its originating connection.
#[derive(Debug, Clone)]
pub struct EngineRequest {
    pub client_id: ClientId,
    pub message: InputMessage,
}

/// Run the engine loop until shutdown is signalled or every producer is
/// gone. Blocks; call from a dedicated thread.
pub fn run_engine(
    mut engine: MatchingEngine,
    requests: Receiver<EngineRequest>,
    registry: Arc<ClientRegistry>,
    multicast_tx: Option<mpsc::Sender<OutputMessage>>,
    metrics: Arc<Metrics>,
    shutdown: Arc<AtomicBool>,
) {
    info!("engine task started");
    let mut outputs: Vec<OutputMessage> = Vec::with_capacity(64);

    while !shutdown.load(Ordering::Relaxed) {
        match requests.recv_timeout(RECV_TIMEOUT) {
            Ok(request) => process_request(
                &mut engine,
                &request,
                &mut outputs,
                &registry,
                &multicast_tx,
                &metrics,
            ),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    info!("engine task stopped");
}

fn process_request(
    engine: &mut MatchingEngine,
    request: &EngineRequest,
    outputs: &mut Vec<OutputMessage>,
    registry: &ClientRegistry,
    multicast_tx: &Option<mpsc::Sender<OutputMessage>>,
    metrics: &Metrics,
) {
    inc(&metrics.messages_received);

    // Bind the user to its connection for trade routing.
    let user_id = request.message.user_id();
    if user_id != 0 {
        registry.bind_user(request.client_id, user_id);
    }

    match request.message {
        InputMessage::NewOrder(_) => inc(&metrics.orders_received),
        InputMessage::Cancel(_) => inc(&metrics.cancels_received),
        _ => {}
    }

    engine.process(&request.message, outputs);
    inc(&metrics.messages_processed);

    for msg in outputs.iter() {
        if matches!(msg, OutputMessage::Trade { .. }) {
            inc(&metrics.trades_executed);
        }

        let route = route_output(msg, request.client_id, registry);
        for target in route.iter_targets() {
            if registry.send_to_client(target, *msg) {
                inc(&metrics.messages_sent);
            } else {
                inc(&metrics.send_errors);
            }
        }

        if route.multicast {
            if let Some(tx) = multicast_tx {
                if tx.try_send(*msg).is_err() {
                    inc(&metrics.queue_full_drops);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::WireProtocol;
    use std::sync::atomic::Ordering;
    use types::{NewOrder, Side, Symbol};

    fn addr() -> std::net::SocketAddr {
        "127.0.0.1:9999".parse().unwrap()
    }

    fn new_order(user_id: u32, side: Side, price: u32, qty: u32) -> InputMessage {
        InputMessage::NewOrder(NewOrder {
            user_id,
            user_order_id: 1,
            symbol: Symbol::new("IBM"),
            price,
            quantity: qty,
            side,
        })
    }

    #[test]
    fn test_process_request_routes_ack_to_originator() {
        let registry = ClientRegistry::new(16);
        let (client_id, mut rx) = registry.register(addr(), WireProtocol::Csv);
        let metrics = Metrics::default();
        let mut engine = MatchingEngine::new();
        let mut outputs = Vec::new();

        process_request(
            &mut engine,
            &EngineRequest {
                client_id,
                message: new_order(1, Side::Buy, 100, 50),
            },
            &mut outputs,
            &registry,
            &None,
            &metrics,
        );

        assert_eq!(
            rx.try_recv().unwrap(),
            OutputMessage::ack(1, 1, Symbol::new("IBM"))
        );
        assert_eq!(metrics.orders_received.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.messages_processed.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_trade_reaches_counterparty_and_multicast() {
        let registry = ClientRegistry::new(16);
        let (seller_client, mut seller_rx) = registry.register(addr(), WireProtocol::Csv);
        let (buyer_client, mut buyer_rx) = registry.register(addr(), WireProtocol::Csv);
        let metrics = Metrics::default();
        let mut engine = MatchingEngine::new();
        let mut outputs = Vec::new();
        let (mcast_tx, mut mcast_rx) = mpsc::channel(16);

        process_request(
            &mut engine,
            &EngineRequest {
                client_id: seller_client,
                message: new_order(1, Side::Sell, 100, 50),
            },
            &mut outputs,
            &registry,
            &Some(mcast_tx.clone()),
            &metrics,
        );
        process_request(
            &mut engine,
            &EngineRequest {
                client_id: buyer_client,
                message: new_order(2, Side::Buy, 100, 50),
            },
            &mut outputs,
            &registry,
            &Some(mcast_tx),
            &metrics,
        );

        let trade = OutputMessage::trade(Symbol::new("IBM"), 2, 1, 1, 1, 100, 50);

        // Seller: ack for its own order, TOB resting update arrives on
        // multicast only, then the trade as counterparty.
        assert_eq!(
            seller_rx.try_recv().unwrap(),
            OutputMessage::ack(1, 1, Symbol::new("IBM"))
        );
        assert_eq!(seller_rx.try_recv().unwrap(), trade);

        // Buyer: ack then trade.
        assert_eq!(
            buyer_rx.try_recv().unwrap(),
            OutputMessage::ack(2, 1, Symbol::new("IBM"))
        );
        assert_eq!(buyer_rx.try_recv().unwrap(), trade);

        // Multicast saw the resting TOB update, the trade, and the
        // elimination.
        assert!(matches!(
            mcast_rx.try_recv().unwrap(),
            OutputMessage::TopOfBook { .. }
        ));
        assert_eq!(mcast_rx.try_recv().unwrap(), trade);
        assert!(matches!(
            mcast_rx.try_recv().unwrap(),
            OutputMessage::TopOfBook { .. }
        ));

        assert_eq!(metrics.trades_executed.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_engine_thread_shutdown() {
        let registry = Arc::new(ClientRegistry::new(16));
        let metrics = Arc::new(Metrics::default());
        let shutdown = Arc::new(AtomicBool::new(false));
        let (tx, rx) = crossbeam_channel::bounded(16);

        let handle = {
            let registry = registry.clone();
            let metrics = metrics.clone();
            let shutdown = shutdown.clone();
            std::thread::spawn(move || {
                run_engine(MatchingEngine::new(), rx, registry, None, metrics, shutdown)
            })
        };

        shutdown.store(true, Ordering::Relaxed);
        handle.join().unwrap();
        drop(tx);
    }
}
