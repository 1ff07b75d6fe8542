use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::decoder::{DecoderStats, Frame, FrameDecoder};

/// Largest possible UDP payload.
const MAX_DATAGRAM: usize = 65_536;

/// Handle to the background receive task. Dropping it stops the task.
pub struct FrameReceiver {
    task: JoinHandle<()>,
    local_addr: SocketAddr,
}

impl Drop for FrameReceiver {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl FrameReceiver {
    /// Address the socket is actually bound to (useful with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

/// Consumer side of the receive pipeline.
///
/// Both channels are single-slot mailboxes: readers always see the newest
/// complete frame and never one that is still being assembled.
#[derive(Clone)]
pub struct FrameStream {
    pub frames: watch::Receiver<Arc<Frame>>,
    pub stats: watch::Receiver<DecoderStats>,
}

/// Binds the UDP socket and starts decoding datagrams in the background.
pub async fn start_receiver(bind: SocketAddr) -> Result<(FrameReceiver, FrameStream)> {
    let socket = UdpSocket::bind(bind)
        .await
        .with_context(|| format!("Failed to bind UDP socket on {}", bind))?;
    let local_addr = socket.local_addr()?;
    info!("Listening for frames on udp://{}", local_addr);

    let (frame_tx, frame_rx) = watch::channel(Arc::new(Frame::default()));
    let (stats_tx, stats_rx) = watch::channel(DecoderStats::default());

    let task = tokio::spawn(receive_loop(socket, frame_tx, stats_tx));

    Ok((
        FrameReceiver { task, local_addr },
        FrameStream {
            frames: frame_rx,
            stats: stats_rx,
        },
    ))
}

async fn receive_loop(
    socket: UdpSocket,
    frame_tx: watch::Sender<Arc<Frame>>,
    stats_tx: watch::Sender<DecoderStats>,
) {
    let mut decoder = FrameDecoder::new();
    let mut buf = vec![0u8; MAX_DATAGRAM];

    loop {
        let len = match socket.recv_from(&mut buf).await {
            Ok((len, _peer)) => len,
            Err(e) => {
                warn!("UDP receive error: {}", e);
                continue;
            }
        };

        if let Some(frame) = decoder.process(&buf[..len]) {
            if frame_tx.send(Arc::new(frame)).is_err() {
                debug!("Frame receiver dropped, stopping network loop");
                break;
            }
        }
        stats_tx.send_replace(decoder.stats());
    }
}
