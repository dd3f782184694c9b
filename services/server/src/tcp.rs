//! TCP transport
//!
//! Accept loop plus one reader and one writer task per connection. The
//! first byte a client sends selects its codec (CSV lines or
//! length-prefixed binary frames) for the connection's lifetime. Decoded
//! requests are offered to the bounded engine queue; a full queue drops
//! the request and counts it. Decode errors discard the offending frame
//! or line without notifying the client.

use anyhow::Context;
use crossbeam_channel::Sender;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::engine_task::EngineRequest;
use crate::metrics::{dec, inc, Metrics};
use crate::registry::{ClientId, ClientRegistry};
use protocol::wire::MAX_FRAME_SIZE;
use protocol::{binary, csv, detect, WireProtocol};
use types::OutputMessage;

/// Run the TCP accept loop. Never returns under normal operation.
pub async fn run(
    config: ServerConfig,
    registry: Arc<ClientRegistry>,
    engine_tx: Sender<EngineRequest>,
    metrics: Arc<Metrics>,
) -> anyhow::Result<()> {
    let listen_addr = config.tcp_listen_addr();
    let listener = TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("binding TCP listener on {listen_addr}"))?;
    info!(addr = %listen_addr, "TCP server listening");

    loop {
        let (stream, peer) = listener.accept().await.context("accepting connection")?;

        if registry.client_count() >= config.max_tcp_clients {
            warn!(%peer, "connection refused: client limit reached");
            continue;
        }

        inc(&metrics.tcp_connections_total);
        inc(&metrics.tcp_connections_active);

        let registry = registry.clone();
        let engine_tx = engine_tx.clone();
        let metrics = metrics.clone();
        tokio::spawn(async move {
            handle_client(stream, registry, engine_tx, metrics.clone()).await;
            dec(&metrics.tcp_connections_active);
        });
    }
}

/// Serve one connection until it closes or turns unreadable.
async fn handle_client(
    stream: TcpStream,
    registry: Arc<ClientRegistry>,
    engine_tx: Sender<EngineRequest>,
    metrics: Arc<Metrics>,
) {
    let peer = match stream.peer_addr() {
        Ok(addr) => addr,
        Err(err) => {
            debug!(%err, "connection lost before handshake");
            return;
        }
    };

    if let Err(err) = stream.set_nodelay(true) {
        debug!(%peer, %err, "failed to set TCP_NODELAY");
    }

    // The first byte fixes the protocol without consuming it.
    let mut first = [0u8; 1];
    match stream.peek(&mut first).await {
        Ok(0) | Err(_) => return,
        Ok(_) => {}
    }
    let Some(protocol) = detect::detect(first[0]) else {
        warn!(%peer, byte = first[0], "unrecognized protocol, closing");
        return;
    };

    let (client_id, outbound) = registry.register(peer, protocol);
    info!(client_id, %peer, ?protocol, "client connected");

    let (read_half, write_half) = stream.into_split();
    let writer = tokio::spawn(run_writer(write_half, outbound, protocol, metrics.clone()));

    let result = match protocol {
        WireProtocol::Csv => run_csv_reader(read_half, client_id, &engine_tx, &metrics).await,
        WireProtocol::Binary => run_binary_reader(read_half, client_id, &engine_tx, &metrics).await,
    };
    if let Err(err) = result {
        debug!(client_id, %err, "reader stopped");
    }

    registry.unregister(client_id);
    writer.abort();
    info!(client_id, %peer, "client disconnected");
}

/// Line-oriented CSV reader.
async fn run_csv_reader(
    read_half: OwnedReadHalf,
    client_id: ClientId,
    engine_tx: &Sender<EngineRequest>,
    metrics: &Metrics,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(read_half).lines();

    while let Some(line) = lines.next_line().await? {
        match csv::decode_input_line(&line) {
            Ok(Some(message)) => submit(client_id, message, engine_tx, metrics),
            Ok(None) => {} // comment or blank line
            Err(err) => {
                inc(&metrics.decode_errors);
                warn!(client_id, %err, "discarding malformed line");
            }
        }
    }
    Ok(())
}

/// Length-prefixed binary frame reader.
async fn run_binary_reader(
    mut read_half: OwnedReadHalf,
    client_id: ClientId,
    engine_tx: &Sender<EngineRequest>,
    metrics: &Metrics,
) -> anyhow::Result<()> {
    let mut len_bytes = [0u8; 4];
    let mut frame = vec![0u8; MAX_FRAME_SIZE];

    loop {
        if read_half.read_exact(&mut len_bytes).await.is_err() {
            return Ok(()); // clean EOF between frames
        }
        let len = u32::from_be_bytes(len_bytes) as usize;
        if len < 2 || len > MAX_FRAME_SIZE {
            // Frame boundary is lost; nothing to do but drop the client.
            inc(&metrics.decode_errors);
            warn!(client_id, len, "invalid frame length, closing");
            return Ok(());
        }

        read_half.read_exact(&mut frame[..len]).await?;

        match binary::decode_input(&frame[..len]) {
            Ok(message) => submit(client_id, message, engine_tx, metrics),
            Err(err) => {
                // The frame was consumed whole, so the stream stays in
                // sync and the connection survives.
                inc(&metrics.decode_errors);
                warn!(client_id, %err, "discarding malformed frame");
            }
        }
    }
}

/// Offer a decoded request to the engine queue, dropping on overflow.
fn submit(
    client_id: ClientId,
    message: types::InputMessage,
    engine_tx: &Sender<EngineRequest>,
    metrics: &Metrics,
) {
    if engine_tx
        .try_send(EngineRequest { client_id, message })
        .is_err()
    {
        inc(&metrics.queue_full_drops);
    }
}

/// Drain one client's outbound queue, encoding per its protocol.
async fn run_writer(
    mut write_half: OwnedWriteHalf,
    mut outbound: mpsc::Receiver<OutputMessage>,
    protocol: WireProtocol,
    metrics: Arc<Metrics>,
) {
    let mut buf: Vec<u8> = Vec::with_capacity(256);

    while let Some(msg) = outbound.recv().await {
        buf.clear();
        match protocol {
            WireProtocol::Csv => {
                buf.extend_from_slice(csv::encode_output_line(&msg).as_bytes());
                buf.push(b'\n');
            }
            WireProtocol::Binary => {
                buf.extend_from_slice(&0u32.to_be_bytes());
                binary::encode_output(&msg, &mut buf);
                let payload_len = (buf.len() - 4) as u32;
                buf[..4].copy_from_slice(&payload_len.to_be_bytes());
            }
        }

        if write_half.write_all(&buf).await.is_err() {
            inc(&metrics.send_errors);
            break;
        }
    }
}
