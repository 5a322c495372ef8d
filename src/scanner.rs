//! Sliding-window region scanner.
//!
//! Each channel (face, phone, talking) slides a fixed window over the frame
//! in raster order, scores it, and keeps windows whose score exceeds the
//! channel threshold until the channel's candidate cap is reached. The face
//! channel also drops windows whose top-left corner lies close to an already
//! accepted one. This greedy suppression depends on scan order and is kept
//! as is.

use crate::config::{ChannelConfig, ScannerConfig};
use crate::frame::{Frame, Region};
use crate::model::{BehaviorKind, BoundingBox, DetectedBehavior, DetectedFace};
use crate::scoring::{ChannelScorer, FaceScorer, PhoneScorer, TalkingScorer};
use log::debug;
use rand::{Rng, RngCore};

/// Which behavior channels to scan in addition to faces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSelection {
    pub mobile: bool,
    pub talking: bool,
}

impl ChannelSelection {
    /// Scan every channel
    #[must_use]
    pub fn all() -> Self {
        Self { mobile: true, talking: true }
    }

    /// Faces only
    #[must_use]
    pub fn faces_only() -> Self {
        Self { mobile: false, talking: false }
    }
}

/// Candidates found in one frame, each list in scan order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanResult {
    pub faces: Vec<DetectedFace>,
    pub phones: Vec<DetectedBehavior>,
    pub talking: Vec<DetectedBehavior>,
}

impl ScanResult {
    /// Phone and talking candidates in that order
    pub fn behaviors(&self) -> impl Iterator<Item = &DetectedBehavior> {
        self.phones.iter().chain(self.talking.iter())
    }
}

/// A window that cleared its channel threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub window: Region,
    pub score: f64,
}

/// Region scanner over the three detection channels
pub struct RegionScanner {
    config: ScannerConfig,
}

impl RegionScanner {
    /// Create a scanner
    #[must_use]
    pub fn new(config: ScannerConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Window positions for `channel` over a `width` x `height` frame, row by row.
    /// Positions run over `0..width - window_width` and `0..height - window_height`
    /// (exclusive), so frames no larger than the window yield nothing.
    pub fn windows(width: u32, height: u32, channel: &ChannelConfig) -> impl Iterator<Item = Region> {
        let max_x = width.saturating_sub(channel.window_width);
        let max_y = height.saturating_sub(channel.window_height);
        let stride = channel.stride.max(1) as usize;
        let (w, h) = (channel.window_width, channel.window_height);

        (0..max_y)
            .step_by(stride)
            .flat_map(move |y| (0..max_x).step_by(stride).map(move |x| Region::new(x, y, w, h)))
    }

    /// Scan one channel and return accepted windows in scan order
    #[must_use]
    pub fn scan_channel(frame: &Frame, channel: &ChannelConfig, scorer: &dyn ChannelScorer) -> Vec<Candidate> {
        let mut accepted: Vec<Candidate> = Vec::new();
        let radius = channel.suppression_radius;

        for window in Self::windows(frame.width(), frame.height(), channel) {
            if accepted.len() >= channel.max_candidates {
                break;
            }

            if radius > 0 && accepted.iter().any(|c| near(c.window, window, radius)) {
                continue;
            }

            let score = scorer.score(frame, window);
            if score > channel.threshold {
                accepted.push(Candidate { window, score });
            }
        }

        debug!("{}: {} candidates", scorer.name(), accepted.len());
        accepted
    }

    /// Scan a frame on the face channel and the selected behavior channels.
    ///
    /// Face boxes get `rng`-drawn jitter on top of the configured base size.
    pub fn scan(&self, frame: &Frame, channels: ChannelSelection, rng: &mut dyn RngCore) -> ScanResult {
        let faces = Self::scan_channel(frame, &self.config.face, &FaceScorer)
            .into_iter()
            .map(|c| DetectedFace {
                bbox: BoundingBox {
                    x: f64::from(c.window.x),
                    y: f64::from(c.window.y),
                    width: self.config.face_box_width + rng.gen::<f64>() * self.config.face_box_jitter,
                    height: self.config.face_box_height + rng.gen::<f64>() * self.config.face_box_jitter,
                },
                window: c.window,
                score: c.score,
                confidence: c.score * 100.0,
                identity: None,
            })
            .collect();

        let phones = if channels.mobile {
            behaviors(frame, &self.config.phone, &PhoneScorer, BehaviorKind::Mobile)
        } else {
            Vec::new()
        };

        let talking = if channels.talking {
            behaviors(frame, &self.config.talking, &TalkingScorer, BehaviorKind::Talking)
        } else {
            Vec::new()
        };

        ScanResult { faces, phones, talking }
    }
}

fn behaviors(
    frame: &Frame,
    channel: &ChannelConfig,
    scorer: &dyn ChannelScorer,
    kind: BehaviorKind,
) -> Vec<DetectedBehavior> {
    RegionScanner::scan_channel(frame, channel, scorer)
        .into_iter()
        .map(|c| DetectedBehavior {
            kind,
            bbox: c.window.into(),
            score: c.score,
            confidence: c.score * 100.0,
            identity: None,
        })
        .collect()
}

/// Top-left corners closer than `radius` on both axes
fn near(a: Region, b: Region, radius: u32) -> bool {
    a.x.abs_diff(b.x) < radius && a.y.abs_diff(b.y) < radius
}
