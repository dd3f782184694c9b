//! Output message routing
//!
//! Decides which clients receive each engine output:
//! acks and cancel acks go to the originating client only; trades go to
//! both counterparties (when identifiable) and to market data; top-of-book
//! updates go to market data only.

use crate::registry::{ClientId, ClientRegistry};
use types::OutputMessage;

/// Routing decision for one output message. At most two unicast targets
/// (buyer and seller of a trade); no allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RouteResult {
    pub targets: [Option<ClientId>; 2],
    pub multicast: bool,
}

impl RouteResult {
    fn unicast(target: ClientId) -> Self {
        Self {
            targets: [Some(target), None],
            multicast: false,
        }
    }

    /// Unicast targets in order, skipping empty slots.
    pub fn iter_targets(&self) -> impl Iterator<Item = ClientId> + '_ {
        self.targets.iter().flatten().copied()
    }
}

/// Route one output message.
pub fn route_output(
    msg: &OutputMessage,
    originating: ClientId,
    registry: &ClientRegistry,
) -> RouteResult {
    match msg {
        OutputMessage::Ack { .. } | OutputMessage::CancelAck { .. } => {
            RouteResult::unicast(originating)
        }
        OutputMessage::Trade {
            buy_user_id,
            sell_user_id,
            ..
        } => {
            let buyer = registry.client_for_user(*buy_user_id);
            // A self-trade notifies the client once.
            let seller = if sell_user_id == buy_user_id {
                None
            } else {
                registry.client_for_user(*sell_user_id)
            };
            // Deduplicate two users sharing one connection.
            let seller = if seller == buyer { None } else { seller };
            RouteResult {
                targets: [buyer, seller],
                multicast: true,
            }
        }
        OutputMessage::TopOfBook { .. } => RouteResult {
            targets: [None, None],
            multicast: true,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::WireProtocol;
    use types::{Side, Symbol};

    fn addr() -> std::net::SocketAddr {
        "127.0.0.1:9999".parse().unwrap()
    }

    fn sym() -> Symbol {
        Symbol::new("IBM")
    }

    #[test]
    fn test_ack_goes_to_originator_only() {
        let registry = ClientRegistry::new(8);
        let result = route_output(&OutputMessage::ack(1, 1, sym()), 5, &registry);
        assert_eq!(result.iter_targets().collect::<Vec<_>>(), vec![5]);
        assert!(!result.multicast);
    }

    #[test]
    fn test_trade_goes_to_both_parties_and_multicast() {
        let registry = ClientRegistry::new(8);
        let (buyer_client, _rx1) = registry.register(addr(), WireProtocol::Csv);
        let (seller_client, _rx2) = registry.register(addr(), WireProtocol::Csv);
        registry.bind_user(buyer_client, 1);
        registry.bind_user(seller_client, 2);

        let trade = OutputMessage::trade(sym(), 1, 1, 2, 1, 100, 50);
        let result = route_output(&trade, buyer_client, &registry);

        assert_eq!(
            result.iter_targets().collect::<Vec<_>>(),
            vec![buyer_client, seller_client]
        );
        assert!(result.multicast);
    }

    #[test]
    fn test_self_trade_notifies_once() {
        let registry = ClientRegistry::new(8);
        let (client, _rx) = registry.register(addr(), WireProtocol::Csv);
        registry.bind_user(client, 9);

        let trade = OutputMessage::trade(sym(), 9, 1, 9, 2, 100, 10);
        let result = route_output(&trade, client, &registry);
        assert_eq!(result.iter_targets().collect::<Vec<_>>(), vec![client]);
        assert!(result.multicast);
    }

    #[test]
    fn test_trade_with_unknown_counterparty() {
        let registry = ClientRegistry::new(8);
        let (buyer_client, _rx) = registry.register(addr(), WireProtocol::Csv);
        registry.bind_user(buyer_client, 1);

        let trade = OutputMessage::trade(sym(), 1, 1, 2, 1, 100, 50);
        let result = route_output(&trade, buyer_client, &registry);
        assert_eq!(result.iter_targets().collect::<Vec<_>>(), vec![buyer_client]);
    }

    #[test]
    fn test_top_of_book_is_multicast_only() {
        let registry = ClientRegistry::new(8);
        let result = route_output(
            &OutputMessage::top_of_book(sym(), Side::Buy, 100, 50),
            3,
            &registry,
        );
        assert_eq!(result.iter_targets().count(), 0);
        assert!(result.multicast);
    }
}
