//! Multicast market-data publisher
//!
//! Drains the multicast queue and publishes trades and top-of-book
//! updates as UDP datagrams framed `[seq_num: u64][frame_len: u32]
//! [binary payload]`, all big-endian. The sequence number starts at 1
//! and increments per packet so receivers can detect gaps.

use std::net::SocketAddrV4;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::metrics::{inc, Metrics};
use protocol::binary;
use types::OutputMessage;

/// Run the publisher until the queue closes.
pub async fn run(
    config: ServerConfig,
    mut queue: mpsc::Receiver<OutputMessage>,
    metrics: Arc<Metrics>,
) -> anyhow::Result<()> {
    let socket = bind_socket(&config)?;
    let dest = SocketAddrV4::new(config.multicast_group, config.multicast_port);
    info!(group = %dest, "multicast publisher started");

    let mut seq_num: u64 = 0;
    let mut buf: Vec<u8> = Vec::with_capacity(256);

    while let Some(msg) = queue.recv().await {
        // Only market data leaves the process; acks stay unicast.
        if !matches!(
            msg,
            OutputMessage::Trade { .. } | OutputMessage::TopOfBook { .. }
        ) {
            continue;
        }

        seq_num += 1;
        encode_packet(seq_num, &msg, &mut buf);

        match socket.send_to(&buf, dest).await {
            Ok(_) => inc(&metrics.multicast_messages),
            Err(err) => {
                inc(&metrics.send_errors);
                warn!(%err, "multicast send failed");
            }
        }
    }

    info!("multicast publisher stopped");
    Ok(())
}

/// Encode one `[seq][len][payload]` packet into `buf`.
fn encode_packet(seq_num: u64, msg: &OutputMessage, buf: &mut Vec<u8>) {
    buf.clear();
    buf.extend_from_slice(&seq_num.to_be_bytes());
    buf.extend_from_slice(&0u32.to_be_bytes());
    let start = buf.len();
    binary::encode_output(msg, buf);
    let frame_len = (buf.len() - start) as u32;
    buf[8..12].copy_from_slice(&frame_len.to_be_bytes());
}

/// Bind an unconnected UDP socket with the configured TTL.
fn bind_socket(config: &ServerConfig) -> anyhow::Result<UdpSocket> {
    let socket = std::net::UdpSocket::bind("0.0.0.0:0")?;
    socket.set_multicast_ttl_v4(config.multicast_ttl)?;
    socket.set_nonblocking(true)?;
    Ok(UdpSocket::from_std(socket)?)
}
