use anyhow::{Context, Result};
use palette::Srgb;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use super::protocol::{self, EncodeError};
use crate::color;
use crate::fixture::StrandId;
use crate::scene::Scene;

/// Strands lit when the scene has no fixtures.
const FALLBACK_STRANDS: StrandId = 5;
const FALLBACK_STRAND_LENGTH: usize = 120;

/// Hue advance per frame, as a fraction of the color wheel.
const HUE_STEP: f32 = 0.002;

const DEFAULT_FPS: f64 = 100.0;

/// Rotating rainbow across every strand, encoded as wire datagrams.
#[derive(Debug, Clone)]
pub struct PatternGenerator {
    strands: BTreeMap<StrandId, usize>,
    hue: f32,
    step: f32,
}

impl PatternGenerator {
    pub fn new(strands: BTreeMap<StrandId, usize>) -> Self {
        Self {
            strands,
            hue: 0.0,
            step: HUE_STEP,
        }
    }

    /// Sized to the scene's strands, or a fixed layout for an empty scene.
    pub fn for_scene(scene: &Scene) -> Self {
        let lengths = scene.strand_lengths();
        if lengths.is_empty() {
            Self::new(
                (0..FALLBACK_STRANDS)
                    .map(|s| (s, FALLBACK_STRAND_LENGTH))
                    .collect(),
            )
        } else {
            Self::new(lengths)
        }
    }

    pub fn strands(&self) -> &BTreeMap<StrandId, usize> {
        &self.strands
    }

    fn strand_colors(&self, strand: StrandId, len: usize) -> Vec<Srgb<u8>> {
        (0..len)
            .map(|pixel| {
                let pos = pixel as f32 / len as f32;
                let hue = (self.hue + 0.2 * strand as f32 + pos * 0.25).fract();
                color::hue_color(hue * 360.0, 0.5)
            })
            .collect()
    }

    /// Datagrams for the next frame: Begin, one Strand per strand, End.
    pub fn next_frame(&mut self) -> Result<Vec<Vec<u8>>, EncodeError> {
        let mut packets = Vec::with_capacity(self.strands.len() + 2);
        packets.push(protocol::encode_begin());
        for (&strand, &len) in &self.strands {
            packets.push(protocol::encode_strand(strand, &self.strand_colors(strand, len))?);
        }
        packets.push(protocol::encode_end());

        self.hue = (self.hue + self.step).fract();
        Ok(packets)
    }
}

/// Interval between frames. Rates that are not a positive finite number
/// fall back to the default.
fn frame_period(fps: f64) -> Duration {
    let fps = if fps.is_finite() && fps > 0.0 {
        fps.clamp(0.1, 1000.0)
    } else {
        warn!("Invalid pattern rate {}, using {} fps", fps, DEFAULT_FPS);
        DEFAULT_FPS
    };
    Duration::from_secs_f64(1.0 / fps)
}

/// Sends the pattern to `target` until Ctrl-C.
pub async fn run(target: SocketAddr, fps: f64, scene: &Scene) -> Result<()> {
    let socket = UdpSocket::bind("0.0.0.0:0")
        .await
        .context("Failed to bind pattern socket")?;
    let mut generator = PatternGenerator::for_scene(scene);
    info!(
        "Sending test pattern for {} strands to {} at {} fps",
        generator.strands().len(),
        target,
        fps
    );

    let mut interval = tokio::time::interval(frame_period(fps));
    let mut sent: u64 = 0;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                for packet in generator.next_frame()? {
                    socket
                        .send_to(&packet, target)
                        .await
                        .with_context(|| format!("Failed to send to {}", target))?;
                }
                sent += 1;
                if sent % 1000 == 0 {
                    debug!("Sent {} frames", sent);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping test pattern after {} frames", sent);
                break;
            }
        }
    }

    Ok(())
}
