use palette::Srgb;
use std::collections::BTreeMap;
use std::mem;
use std::time::Instant;
use tracing::{debug, trace, warn};

use super::protocol::{self, Command, PacketError, BYTES_PER_PIXEL};
use super::stats::RateMeter;
use crate::fixture::StrandId;

/// One complete color snapshot of every strand that sent data.
///
/// Frames are immutable once emitted; the decoder builds the next one in a
/// fresh buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    /// Count of frames completed by the decoder, starting at 1.
    pub sequence: u64,
    strands: BTreeMap<StrandId, Vec<Srgb<u8>>>,
}

impl Frame {
    pub fn new(sequence: u64, strands: BTreeMap<StrandId, Vec<Srgb<u8>>>) -> Self {
        Self { sequence, strands }
    }

    pub fn strands(&self) -> &BTreeMap<StrandId, Vec<Srgb<u8>>> {
        &self.strands
    }

    pub fn strand(&self, strand: StrandId) -> Option<&[Srgb<u8>]> {
        self.strands.get(&strand).map(Vec::as_slice)
    }

    /// Color at `offset` in a strand's buffer, if the frame carried it.
    pub fn pixel(&self, strand: StrandId, offset: usize) -> Option<Srgb<u8>> {
        self.strands.get(&strand)?.get(offset).copied()
    }

    pub fn pixel_count(&self) -> usize {
        self.strands.values().map(Vec::len).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecoderState {
    #[default]
    Idle,
    InFrame,
}

/// Snapshot of decoder throughput and error counters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DecoderStats {
    pub packets_per_sec: f64,
    pub frames_per_sec: f64,
    pub packets_received: u64,
    pub frames_completed: u64,
    pub malformed: u64,
    pub out_of_sequence: u64,
}

/// Reassembles datagrams into frames.
///
/// The decoder owns the single in-progress frame. A `Begin` always starts
/// over, so a lost `End` stalls only the frame it belonged to.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    state: DecoderState,
    pending: BTreeMap<StrandId, Vec<u8>>,
    packets: RateMeter,
    frames: RateMeter,
    packets_received: u64,
    frames_completed: u64,
    malformed: u64,
    out_of_sequence: u64,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Advances the state machine by one datagram.
    ///
    /// Errors leave the in-progress frame untouched.
    pub fn handle(&mut self, datagram: &[u8]) -> Result<Option<Frame>, PacketError> {
        match protocol::parse(datagram)? {
            Command::Begin => {
                if self.state == DecoderState::InFrame {
                    trace!(
                        "Begin while in frame, dropping {} partial strands",
                        self.pending.len()
                    );
                }
                self.pending.clear();
                self.state = DecoderState::InFrame;
                Ok(None)
            }
            Command::Strand { strand, data } => {
                if self.state != DecoderState::InFrame {
                    return Err(PacketError::OutOfSequence { command: 'S' });
                }
                self.pending.insert(strand, data.to_vec());
                Ok(None)
            }
            Command::End => {
                if self.state != DecoderState::InFrame {
                    return Err(PacketError::OutOfSequence { command: 'E' });
                }
                self.state = DecoderState::Idle;
                self.frames_completed += 1;
                let strands = mem::take(&mut self.pending)
                    .into_iter()
                    .map(|(strand, bytes)| {
                        let colors = bytes
                            .chunks_exact(BYTES_PER_PIXEL)
                            .map(|rgb| Srgb::new(rgb[0], rgb[1], rgb[2]))
                            .collect();
                        (strand, colors)
                    })
                    .collect();
                Ok(Some(Frame::new(self.frames_completed, strands)))
            }
        }
    }

    /// Feeds one datagram, logging and counting anything that is discarded.
    pub fn process(&mut self, datagram: &[u8]) -> Option<Frame> {
        self.process_at(datagram, Instant::now())
    }

    pub fn process_at(&mut self, datagram: &[u8], now: Instant) -> Option<Frame> {
        self.packets_received += 1;
        self.packets.record(now);

        match self.handle(datagram) {
            Ok(Some(frame)) => {
                self.frames.record(now);
                Some(frame)
            }
            Ok(None) => None,
            Err(e) if e.is_malformed() => {
                self.malformed += 1;
                warn!("Malformed packet of length {}: {}", datagram.len(), e);
                None
            }
            Err(e) => {
                self.out_of_sequence += 1;
                debug!("Ignoring packet while {:?}: {}", self.state(), e);
                None
            }
        }
    }

    pub fn stats(&self) -> DecoderStats {
        self.stats_at(Instant::now())
    }

    pub fn stats_at(&self, now: Instant) -> DecoderStats {
        DecoderStats {
            packets_per_sec: self.packets.rate(now),
            frames_per_sec: self.frames.rate(now),
            packets_received: self.packets_received,
            frames_completed: self.frames_completed,
            malformed: self.malformed,
            out_of_sequence: self.out_of_sequence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn feed(decoder: &mut FrameDecoder, packets: &[&[u8]]) -> Vec<Frame> {
        packets.iter().filter_map(|p| decoder.process(p)).collect()
    }

    #[test]
    fn single_pixel_frame() {
        let mut decoder = FrameDecoder::new();
        let frames = feed(&mut decoder, &[&[0x42], &[0x53, 0, 3, 0, 255, 0, 0], &[0x45]]);
        assert_eq!(frames.len(), 1);
        let frame = &frames[0];
        assert_eq!(frame.strands().len(), 1);
        assert_eq!(frame.strand(0), Some(&[Srgb::new(255, 0, 0)][..]));
        assert_eq!(frame.sequence, 1);
        assert_eq!(decoder.state(), DecoderState::Idle);
    }

    #[test]
    fn frame_contains_exactly_supplied_strands() {
        let mut decoder = FrameDecoder::new();
        let s1 = protocol::encode_strand(1, &[Srgb::new(1, 2, 3), Srgb::new(4, 5, 6)]).unwrap();
        let s7 = protocol::encode_strand(7, &[Srgb::new(9, 9, 9); 4]).unwrap();
        let frames = feed(&mut decoder, &[&[0x42], s1.as_slice(), s7.as_slice(), &[0x45]]);
        let frame = &frames[0];
        assert_eq!(frame.strands().keys().copied().collect::<Vec<_>>(), vec![1, 7]);
        assert_eq!(frame.strand(1).map(<[_]>::len), Some(2));
        assert_eq!(frame.strand(7).map(<[_]>::len), Some(4));
        assert_eq!(frame.pixel(1, 1), Some(Srgb::new(4, 5, 6)));
        assert_eq!(frame.pixel_count(), 6);
    }

    #[test]
    fn later_strand_data_replaces_earlier() {
        let mut decoder = FrameDecoder::new();
        let frames = feed(
            &mut decoder,
            &[&[0x42], &[0x53, 0, 3, 0, 1, 1, 1], &[0x53, 0, 3, 0, 2, 2, 2], &[0x45]],
        );
        assert_eq!(frames[0].pixel(0, 0), Some(Srgb::new(2, 2, 2)));
    }

    #[test]
    fn length_mismatch_is_dropped_without_corrupting_frame() {
        let mut decoder = FrameDecoder::new();
        let frames = feed(
            &mut decoder,
            &[
                &[0x42],
                &[0x53, 0, 3, 0, 10, 20, 30],
                &[0x53, 1, 6, 0, 1, 2, 3],
                &[0x45],
            ],
        );
        assert_eq!(frames.len(), 1);
        assert!(frames[0].strand(1).is_none());
        assert_eq!(frames[0].pixel(0, 0), Some(Srgb::new(10, 20, 30)));
        assert_eq!(decoder.stats().malformed, 1);
    }

    #[test]
    fn unknown_command_keeps_frame_in_progress() {
        let mut decoder = FrameDecoder::new();
        decoder.process(&[0x42]);
        decoder.process(&[0x53, 0, 3, 0, 5, 5, 5]);
        assert_eq!(decoder.handle(&[0x21]), Err(PacketError::UnknownCommand(0x21)));
        assert_eq!(decoder.state(), DecoderState::InFrame);
        let frame = decoder.process(&[0x45]).unwrap();
        assert_eq!(frame.pixel(0, 0), Some(Srgb::new(5, 5, 5)));
    }

    #[test]
    fn strand_and_end_outside_frame_are_ignored() {
        let mut decoder = FrameDecoder::new();
        assert_eq!(
            decoder.handle(&[0x53, 0, 3, 0, 1, 2, 3]),
            Err(PacketError::OutOfSequence { command: 'S' })
        );
        assert_eq!(
            decoder.handle(&[0x45]),
            Err(PacketError::OutOfSequence { command: 'E' })
        );
        assert!(decoder.process(&[0x45]).is_none());
        assert_eq!(decoder.state(), DecoderState::Idle);
        assert_eq!(decoder.stats().out_of_sequence, 1);

        // The stray strand must not leak into the next frame.
        let frames = feed(&mut decoder, &[&[0x42], &[0x45]]);
        assert!(frames[0].strands().is_empty());
    }

    #[test]
    fn duplicate_begin_discards_partial_frame() {
        let mut decoder = FrameDecoder::new();
        let frames = feed(
            &mut decoder,
            &[
                &[0x42],
                &[0x53, 3, 3, 0, 1, 1, 1],
                &[0x42],
                &[0x53, 4, 3, 0, 2, 2, 2],
                &[0x45],
            ],
        );
        assert_eq!(frames.len(), 1);
        assert!(frames[0].strand(3).is_none());
        assert!(frames[0].strand(4).is_some());
    }

    #[test]
    fn lost_end_is_recovered_by_next_begin() {
        let mut decoder = FrameDecoder::new();
        let frames = feed(
            &mut decoder,
            &[
                &[0x42],
                &[0x53, 0, 3, 0, 1, 1, 1],
                // End lost on the wire
                &[0x42],
                &[0x53, 0, 3, 0, 9, 9, 9],
                &[0x45],
            ],
        );
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].pixel(0, 0), Some(Srgb::new(9, 9, 9)));
    }

    #[test]
    fn emitted_frames_are_independent() {
        let mut decoder = FrameDecoder::new();
        let first = feed(&mut decoder, &[&[0x42], &[0x53, 0, 3, 0, 1, 1, 1], &[0x45]]);
        let second = feed(&mut decoder, &[&[0x42], &[0x45]]);
        assert_eq!(first[0].pixel(0, 0), Some(Srgb::new(1, 1, 1)));
        assert!(second[0].strands().is_empty());
        assert_eq!(second[0].sequence, 2);
    }

    #[test]
    fn stats_track_packet_and_frame_rates() {
        let mut decoder = FrameDecoder::new();
        let start = Instant::now();
        for i in 0..10u64 {
            let t = start + Duration::from_millis(i * 100);
            decoder.process_at(&[0x42], t);
            decoder.process_at(&[0x45], t + Duration::from_millis(10));
        }
        let stats = decoder.stats_at(start + Duration::from_millis(910));
        assert_eq!(stats.packets_received, 20);
        assert_eq!(stats.frames_completed, 10);
        assert!((stats.frames_per_sec - 10.0).abs() < 1e-6);
        assert!(stats.packets_per_sec > stats.frames_per_sec);
    }
}
