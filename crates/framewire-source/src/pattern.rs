//! Synthetic frames for tests, demos and the CLI.

use std::fmt;
use std::str::FromStr;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use bytes::Bytes;
use framewire_image::{DataLayout, ImageMetadata, ImageView};
use tracing::{debug, info};

use crate::error::{FrameError, Result};
use crate::handoff::{HandoffProducer, Publish};
use crate::source::FrameSource;

const CHECKER_CELL: usize = 8;

/// What a synthetic frame looks like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    /// Bytes count up from the frame number, wrapping at 256.
    Ramp,
    /// 8x8 black and white squares that shift one cell per frame.
    Checker,
    /// Every byte has the same value.
    Solid(u8),
}

impl Pattern {
    /// Fill `buf` with frame number `sequence` of this pattern.
    pub fn fill(self, sequence: u64, metadata: &ImageMetadata, buf: &mut [u8]) {
        match self {
            Pattern::Ramp => {
                for (i, byte) in buf.iter_mut().enumerate() {
                    *byte = sequence.wrapping_add(i as u64) as u8;
                }
            }
            Pattern::Solid(value) => buf.fill(value),
            Pattern::Checker => {
                let width = metadata.width().max(1) as usize;
                let pixels = metadata.pixel_count().max(1);
                let element = metadata.element_type().size().max(1);
                let pixel_bytes = element * metadata.channel_count().max(1);
                let shift = sequence as usize;
                for (i, byte) in buf.iter_mut().enumerate() {
                    let pixel = match metadata.layout() {
                        DataLayout::Interleaved => i / pixel_bytes,
                        _ => (i / element) % pixels,
                    };
                    let (x, y) = (pixel % width, pixel / width);
                    let cell = x / CHECKER_CELL + y / CHECKER_CELL + shift;
                    *byte = if cell % 2 == 0 { 0 } else { 0xFF };
                }
            }
        }
    }

    /// Render a fresh frame.
    pub fn render(self, sequence: u64, metadata: &ImageMetadata) -> Vec<u8> {
        let mut buf = vec![0u8; metadata.size_bytes()];
        self.fill(sequence, metadata, &mut buf);
        buf
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Ramp => f.write_str("ramp"),
            Pattern::Checker => f.write_str("checker"),
            Pattern::Solid(value) => write!(f, "solid:{value}"),
        }
    }
}

impl FromStr for Pattern {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "ramp" => Ok(Pattern::Ramp),
            "checker" => Ok(Pattern::Checker),
            "solid" => Ok(Pattern::Solid(0x80)),
            other => other
                .strip_prefix("solid:")
                .and_then(|value| value.parse().ok())
                .map(Pattern::Solid)
                .ok_or_else(|| FrameError::InvalidParameter(format!("unknown pattern {other:?}"))),
        }
    }
}

/// An in-memory [`FrameSource`] that renders frames on demand.
#[derive(Debug, Clone)]
pub struct PatternSource {
    metadata: ImageMetadata,
    pattern: Pattern,
    produced: u64,
    limit: Option<u64>,
    buf: Vec<u8>,
    has_frame: bool,
}

impl PatternSource {
    pub fn new(metadata: ImageMetadata, pattern: Pattern) -> Self {
        Self {
            metadata,
            pattern,
            produced: 0,
            limit: None,
            buf: Vec::new(),
            has_frame: false,
        }
    }

    /// Stop with [`FrameError::EndOfStream`] after `frames` frames.
    pub fn with_limit(mut self, frames: u64) -> Self {
        self.limit = Some(frames);
        self
    }

    /// Frames produced since creation or the last `reset`.
    pub fn produced(&self) -> u64 {
        self.produced
    }
}

impl FrameSource for PatternSource {
    fn metadata(&mut self) -> Result<ImageMetadata> {
        Ok(self.metadata.clone())
    }

    fn next_frame(&mut self) -> Result<()> {
        self.has_frame = false;
        if self.limit.is_some_and(|limit| self.produced >= limit) {
            return Err(FrameError::EndOfStream);
        }
        self.buf.resize(self.metadata.size_bytes(), 0);
        self.pattern.fill(self.produced, &self.metadata, &mut self.buf);
        self.produced += 1;
        self.has_frame = true;
        Ok(())
    }

    fn frame(&self) -> Result<ImageView<'_>> {
        if !self.has_frame {
            return Err(FrameError::NoFrame);
        }
        Ok(ImageView::new(self.metadata.clone(), &self.buf))
    }

    fn execute(&mut self, action: &str) -> Result<()> {
        match action {
            "reset" => {
                debug!(produced = self.produced, "pattern source reset");
                self.produced = 0;
                self.has_frame = false;
                Ok(())
            }
            other => Err(FrameError::UnsupportedAction(other.to_string())),
        }
    }
}

/// Drives a [`HandoffProducer`] from a thread of its own, the way a camera
/// callback would.
///
/// Configured from a pipeline description of the form
/// `<pattern> [fps=N] [frames=N]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternProducer {
    pub pattern: Pattern,
    pub metadata: ImageMetadata,
    /// Frames per second; `None` answers every request immediately.
    pub fps: Option<f64>,
    /// End the stream after this many delivered frames.
    pub frames: Option<u64>,
}

impl PatternProducer {
    pub fn new(pattern: Pattern, metadata: ImageMetadata) -> Self {
        Self {
            pattern,
            metadata,
            fps: None,
            frames: None,
        }
    }

    /// Parse a pipeline description.
    pub fn from_description(description: &str, metadata: ImageMetadata) -> Result<Self> {
        let mut words = description.split_whitespace();
        let pattern = words
            .next()
            .ok_or_else(|| FrameError::InvalidParameter("empty pipeline description".into()))?
            .parse()?;
        let mut producer = Self::new(pattern, metadata);
        for word in words {
            let invalid = || FrameError::InvalidParameter(format!("bad pipeline option {word:?}"));
            let (key, value) = word.split_once('=').ok_or_else(invalid)?;
            match key {
                "fps" => {
                    let fps: f64 = value.parse().map_err(|_| invalid())?;
                    if !(fps.is_finite() && fps > 0.0) {
                        return Err(invalid());
                    }
                    producer.fps = Some(fps);
                }
                "frames" => producer.frames = Some(value.parse().map_err(|_| invalid())?),
                _ => return Err(invalid()),
            }
        }
        Ok(producer)
    }

    /// Run until the consumer goes away or the frame limit is reached.
    pub fn run(self, producer: HandoffProducer) {
        let interval = self.fps.map(|fps| Duration::from_secs_f64(1.0 / fps));
        let mut next_due = Instant::now();
        let mut sequence = 0u64;
        let mut delivered = 0u64;

        info!(pattern = %self.pattern, metadata = %self.metadata, "pattern producer started");
        while let Some(ticket) = producer.wait_for_request() {
            if let Some(interval) = interval {
                let now = Instant::now();
                if next_due > now {
                    thread::sleep(next_due - now);
                }
                next_due = next_due.max(now) + interval;
            }

            let data = Bytes::from(self.pattern.render(sequence, &self.metadata));
            sequence += 1;
            match producer.publish(ticket, self.metadata.clone(), data) {
                Publish::Delivered => delivered += 1,
                Publish::Discarded => {}
                Publish::Closed => break,
            }
            if self.frames.is_some_and(|limit| delivered >= limit) {
                producer.end_of_stream();
                break;
            }
        }
        info!(delivered, "pattern producer stopped");
    }

    pub fn spawn(self, producer: HandoffProducer) -> JoinHandle<()> {
        thread::spawn(move || self.run(producer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handoff_source::HandoffSource;
    use framewire_image::{ColorSpace, ElementType};

    fn rgb_planar(width: u32, height: u32) -> ImageMetadata {
        ImageMetadata::new(width, height, ColorSpace::Rgb, DataLayout::Planar, ElementType::Uint8)
    }

    #[test]
    fn consecutive_frames_differ() {
        let mut source = PatternSource::new(rgb_planar(8, 8), Pattern::Ramp);
        source.next_frame().unwrap();
        let first = source.frame().unwrap().data().to_vec();
        source.next_frame().unwrap();
        let second = source.frame().unwrap().data().to_vec();

        assert_eq!(first.len(), 8 * 8 * 3);
        assert_ne!(first, second);
        assert_eq!(second[0], 1);
    }

    #[test]
    fn reset_restarts_the_counter() {
        let mut source = PatternSource::new(rgb_planar(2, 2), Pattern::Ramp);
        source.next_frame().unwrap();
        let first = source.frame().unwrap().data().to_vec();
        source.next_frame().unwrap();

        source.execute("reset").unwrap();
        assert_eq!(source.frame().unwrap_err(), FrameError::NoFrame);
        source.next_frame().unwrap();
        assert_eq!(source.frame().unwrap().data(), &first[..]);
    }

    #[test]
    fn unknown_action_is_unsupported() {
        let mut source = PatternSource::new(rgb_planar(2, 2), Pattern::Checker);
        assert_eq!(
            source.execute("self-destruct").unwrap_err(),
            FrameError::UnsupportedAction("self-destruct".into())
        );
    }

    #[test]
    fn limit_ends_the_stream() {
        let mut source = PatternSource::new(rgb_planar(2, 2), Pattern::Solid(3)).with_limit(2);
        source.next_frame().unwrap();
        source.next_frame().unwrap();
        assert_eq!(source.next_frame().unwrap_err(), FrameError::EndOfStream);
        assert_eq!(source.frame().unwrap_err(), FrameError::NoFrame);
    }

    #[test]
    fn checker_alternates_cells() {
        let metadata = ImageMetadata::new(16, 1, ColorSpace::Grayscale, DataLayout::Planar, ElementType::Uint8);
        let frame = Pattern::Checker.render(0, &metadata);
        assert_eq!(&frame[..8], &[0; 8]);
        assert_eq!(&frame[8..], &[0xFF; 8]);
        let shifted = Pattern::Checker.render(1, &metadata);
        assert_eq!(shifted[0], 0xFF);
    }

    #[test]
    fn parses_patterns_and_descriptions() {
        assert_eq!("solid:7".parse::<Pattern>().unwrap(), Pattern::Solid(7));
        assert!("plaid".parse::<Pattern>().is_err());

        let producer = PatternProducer::from_description("checker fps=30 frames=4", rgb_planar(4, 4)).unwrap();
        assert_eq!(producer.pattern, Pattern::Checker);
        assert_eq!(producer.fps, Some(30.0));
        assert_eq!(producer.frames, Some(4));

        for bad in ["", "ramp fps=0", "ramp speed=3", "ramp frames"] {
            assert!(
                PatternProducer::from_description(bad, rgb_planar(1, 1)).is_err(),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn producer_feeds_handoff_source() {
        let metadata = rgb_planar(4, 4);
        let (mut source, producer) = HandoffSource::new(metadata.clone(), Duration::from_secs(5));
        let worker = PatternProducer::from_description("ramp frames=3", metadata)
            .unwrap()
            .spawn(producer);

        let mut firsts = Vec::new();
        loop {
            match source.next_frame() {
                Ok(()) => firsts.push(source.frame().unwrap().data()[0]),
                Err(FrameError::EndOfStream) => break,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        worker.join().unwrap();
        assert_eq!(firsts, vec![0, 1, 2]);
    }
}
