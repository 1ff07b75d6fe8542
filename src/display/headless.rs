use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, trace, warn};

use crate::color;
use crate::config::Config;
use crate::net::{self, Frame};
use crate::scene::Scene;

/// What one frame lit up, measured against the scene layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameSummary {
    pub sequence: u64,
    pub strands: usize,
    pub pixels: usize,
    /// Scene pixels with a non-dark color
    pub lit: usize,
    /// Scene strands the frame carried no data for
    pub missing_strands: usize,
}

pub fn summarize(scene: &Scene, frame: &Frame) -> FrameSummary {
    let lit = scene
        .pixel_colors(frame)
        .into_iter()
        .filter(|&c| !color::is_dark(c))
        .count();
    let missing_strands = scene
        .strand_lengths()
        .keys()
        .filter(|&&s| frame.strand(s).is_none())
        .count();

    FrameSummary {
        sequence: frame.sequence,
        strands: frame.strands().len(),
        pixels: frame.pixel_count(),
        lit,
        missing_strands,
    }
}

/// Receives frames without a UI, logging statistics once per second.
pub async fn run(config: Config, scene: Scene) -> Result<()> {
    let (receiver, mut stream) = net::start_receiver(config.net.bind_addr()).await?;
    let (strands, longest) = scene.matrix_extents();
    info!(
        "Headless on {}: {} strands, longest {} pixels",
        receiver.local_addr(),
        strands,
        longest
    );
    let mut report = tokio::time::interval(Duration::from_secs(1));
    let mut latest: Arc<Frame> = Arc::new(Frame::default());

    loop {
        tokio::select! {
            changed = stream.frames.changed() => {
                if changed.is_err() {
                    warn!("Receiver stopped");
                    break;
                }
                latest = stream.frames.borrow_and_update().clone();
                trace!("Frame {} with {} strands", latest.sequence, latest.strands().len());
            }
            _ = report.tick() => {
                let stats = *stream.stats.borrow();
                info!(
                    "{:.0} pps, {:.1} fps, {} frames, {} malformed, {} out of sequence",
                    stats.packets_per_sec,
                    stats.frames_per_sec,
                    stats.frames_completed,
                    stats.malformed,
                    stats.out_of_sequence
                );
                if latest.sequence > 0 {
                    let summary = summarize(&scene, &latest);
                    info!(
                        "Frame {}: {} strands, {} pixels, {}/{} scene pixels lit",
                        summary.sequence,
                        summary.strands,
                        summary.pixels,
                        summary.lit,
                        scene.pixel_count()
                    );
                    if summary.missing_strands > 0 {
                        warn!("{} scene strands missing from the last frame", summary.missing_strands);
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                break;
            }
        }
    }

    Ok(())
}
