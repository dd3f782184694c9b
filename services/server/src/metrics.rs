//! Server-wide counters
//!
//! Plain relaxed atomics updated from the engine thread and connection
//! tasks; read once for the shutdown summary.

use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

#[derive(Debug, Default)]
pub struct Metrics {
    // Connections
    pub tcp_connections_total: AtomicU64,
    pub tcp_connections_active: AtomicU64,

    // Messages
    pub messages_received: AtomicU64,
    pub messages_processed: AtomicU64,
    pub messages_sent: AtomicU64,
    pub multicast_messages: AtomicU64,

    // Errors / backpressure
    pub decode_errors: AtomicU64,
    pub send_errors: AtomicU64,
    pub queue_full_drops: AtomicU64,

    // Trading
    pub orders_received: AtomicU64,
    pub cancels_received: AtomicU64,
    pub trades_executed: AtomicU64,
}

/// Increment a counter by one.
pub fn inc(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

/// Decrement a counter by one.
pub fn dec(counter: &AtomicU64) {
    counter.fetch_sub(1, Ordering::Relaxed);
}

impl Metrics {
    /// Log a summary of all counters.
    pub fn log_summary(&self) {
        info!(
            tcp_total = self.tcp_connections_total.load(Ordering::Relaxed),
            tcp_active = self.tcp_connections_active.load(Ordering::Relaxed),
            received = self.messages_received.load(Ordering::Relaxed),
            processed = self.messages_processed.load(Ordering::Relaxed),
            sent = self.messages_sent.load(Ordering::Relaxed),
            multicast = self.multicast_messages.load(Ordering::Relaxed),
            orders = self.orders_received.load(Ordering::Relaxed),
            cancels = self.cancels_received.load(Ordering::Relaxed),
            trades = self.trades_executed.load(Ordering::Relaxed),
            decode_errors = self.decode_errors.load(Ordering::Relaxed),
            send_errors = self.send_errors.load(Ordering::Relaxed),
            queue_drops = self.queue_full_drops.load(Ordering::Relaxed),
            "server metrics summary"
        );
    }
}
