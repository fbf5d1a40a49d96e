// TCP line listener: one task per peer, newline-delimited lines
//
// Lines are framed on raw bytes and decoded lossily, so a corrupt byte only
// costs the line it sits on. A line longer than MAX_LINE is discarded up to
// its newline and counted as one rejection; the peer stays connected.

use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};

use super::TransportContext;
use crate::error::ParseError;
use crate::ingest::IngestAdapter;
use crate::telemetry::{TransportKind, TransportPhase};

/// Longest accepted line in bytes, newline excluded
pub const MAX_LINE: usize = 1024;

const READ_CHUNK: usize = 4096;

/// Bind `addr` (retrying after the backoff) and serve until shutdown
pub async fn serve(addr: String, mut ctx: TransportContext) {
    loop {
        if ctx.is_shutdown() {
            return;
        }
        match TcpListener::bind(&addr).await {
            Ok(listener) => {
                serve_listener(listener, ctx.clone()).await;
                return;
            }
            Err(err) => {
                log::warn!("[Transport] TCP bind {} failed: {}", addr, err);
                ctx.report(TransportKind::Tcp, TransportPhase::Failed, err.to_string());
                if !ctx.backoff().await {
                    return;
                }
            }
        }
    }
}

/// Accept peers on an already bound listener until shutdown
pub async fn serve_listener(listener: TcpListener, mut ctx: TransportContext) {
    let local = listener
        .local_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_default();
    log::info!("[Transport] TCP listening on {}", local);
    ctx.report(TransportKind::Tcp, TransportPhase::Listening, local);

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    log::info!("[Transport] TCP peer {} connected", peer);
                    ctx.report(TransportKind::Tcp, TransportPhase::PeerConnected, peer.to_string());
                    tokio::spawn(read_lines(stream, peer.to_string(), ctx.clone()));
                }
                Err(err) => {
                    log::warn!("[Transport] TCP accept failed: {}", err);
                    ctx.report(TransportKind::Tcp, TransportPhase::Failed, err.to_string());
                    if !ctx.backoff().await {
                        return;
                    }
                }
            },
            changed = ctx.shutdown.changed() => {
                if changed.is_err() || ctx.is_shutdown() {
                    log::info!("[Transport] TCP listener stopped");
                    return;
                }
            }
        }
    }
}

async fn read_lines(mut stream: TcpStream, peer: String, mut ctx: TransportContext) {
    let mut framer = LineFramer::new(MAX_LINE);
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let read = tokio::select! {
            read = stream.read(&mut buf) => read,
            changed = ctx.shutdown.changed() => {
                if changed.is_err() || ctx.is_shutdown() {
                    return;
                }
                continue;
            }
        };
        match read {
            Ok(0) => {
                framer.finish(&ctx.adapter);
                break;
            }
            Ok(len) => framer.push(&buf[..len], &ctx.adapter),
            Err(err) => {
                log::debug!("[Transport] TCP peer {} read error: {}", peer, err);
                break;
            }
        }
    }
    log::info!("[Transport] TCP peer {} disconnected", peer);
    ctx.report(TransportKind::Tcp, TransportPhase::PeerDisconnected, peer);
}

/// Splits a byte stream into bounded lines for the ingestion adapter
struct LineFramer {
    pending: Vec<u8>,
    limit: usize,
    discarding: bool,
}

impl LineFramer {
    fn new(limit: usize) -> Self {
        Self {
            pending: Vec::with_capacity(128),
            limit,
            discarding: false,
        }
    }

    fn push(&mut self, mut bytes: &[u8], adapter: &IngestAdapter) {
        while let Some(end) = bytes.iter().position(|&byte| byte == b'\n') {
            self.extend(&bytes[..end], adapter);
            self.complete(adapter);
            bytes = &bytes[end + 1..];
        }
        self.extend(bytes, adapter);
    }

    /// Flush an unterminated last line at end of stream
    fn finish(&mut self, adapter: &IngestAdapter) {
        if !self.pending.is_empty() {
            self.complete(adapter);
        }
    }

    fn extend(&mut self, bytes: &[u8], adapter: &IngestAdapter) {
        if self.discarding || bytes.is_empty() {
            return;
        }
        if self.pending.len() + bytes.len() > self.limit {
            log::debug!("[Transport] discarding line longer than {} bytes", self.limit);
            adapter.reject(&ParseError::LineTooLong { limit: self.limit });
            self.pending.clear();
            self.discarding = true;
            return;
        }
        self.pending.extend_from_slice(bytes);
    }

    fn complete(&mut self, adapter: &IngestAdapter) {
        if self.discarding {
            self.discarding = false;
            return;
        }
        adapter.ingest_line(&String::from_utf8_lossy(&self.pending));
        self.pending.clear();
    }
}
