// UDP datagram listener: each datagram carries one or more lines

use tokio::net::UdpSocket;

use super::TransportContext;
use crate::telemetry::{TransportKind, TransportPhase};

/// Largest UDP payload over IPv4, so a datagram is never truncated
const MAX_DATAGRAM: usize = 65_507;

/// Bind `addr` (retrying after the backoff) and serve until shutdown
pub async fn serve(addr: String, mut ctx: TransportContext) {
    loop {
        if ctx.is_shutdown() {
            return;
        }
        match UdpSocket::bind(&addr).await {
            Ok(socket) => {
                if serve_socket(socket, ctx.clone()).await {
                    return;
                }
            }
            Err(err) => {
                log::warn!("[Transport] UDP bind {} failed: {}", addr, err);
                ctx.report(TransportKind::Udp, TransportPhase::Failed, err.to_string());
            }
        }
        if !ctx.backoff().await {
            return;
        }
    }
}

/// Receive datagrams until shutdown (`true`) or a socket error (`false`)
pub async fn serve_socket(socket: UdpSocket, mut ctx: TransportContext) -> bool {
    let local = socket
        .local_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_default();
    log::info!("[Transport] UDP listening on {}", local);
    ctx.report(TransportKind::Udp, TransportPhase::Listening, local);

    let mut buf = vec![0u8; MAX_DATAGRAM];
    loop {
        tokio::select! {
            received = socket.recv_from(&mut buf) => match received {
                Ok((len, _peer)) => {
                    let text = String::from_utf8_lossy(&buf[..len]);
                    ctx.adapter.ingest_chunk(&text);
                }
                Err(err) => {
                    log::warn!("[Transport] UDP receive failed: {}", err);
                    ctx.report(TransportKind::Udp, TransportPhase::Failed, err.to_string());
                    return false;
                }
            },
            changed = ctx.shutdown.changed() => {
                if changed.is_err() || ctx.is_shutdown() {
                    log::info!("[Transport] UDP listener stopped");
                    return true;
                }
            }
        }
    }
}
