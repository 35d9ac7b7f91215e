//! Aspect ratio classification.

use std::fmt::{Display, Formatter, Result as FmtResult};

const LANDSCAPE_RATIO: f64 = 16.0 / 9.0;
const PORTRAIT_RATIO: f64 = 9.0 / 16.0;

/// Absolute tolerance around each target ratio (closed interval).
pub const ASPECT_TOLERANCE: f64 = 0.03;

// Keeps ratios that sit on the interval edge inside it despite float rounding.
const EDGE_SLACK: f64 = 1e-9;

/// Coarse aspect ratio bucket, used only to pick a storage path prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AspectClass {
    /// 16:9-like
    Landscape,
    /// 9:16-like
    Portrait,
    Other,
}

impl AspectClass {
    /// Storage folder for this class.
    pub fn folder(&self) -> &'static str {
        match self {
            AspectClass::Landscape => "landscape",
            AspectClass::Portrait => "portrait",
            AspectClass::Other => "other",
        }
    }
}

impl Display for AspectClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.folder())
    }
}

/// Classify a width/height pair. A zero height is `Other`.
pub fn classify(width: u32, height: u32) -> AspectClass {
    if height == 0 {
        return AspectClass::Other;
    }
    classify_ratio(f64::from(width) / f64::from(height))
}

/// Classify a precomputed width/height ratio.
pub fn classify_ratio(ratio: f64) -> AspectClass {
    let within = |target: f64| (ratio - target).abs() <= ASPECT_TOLERANCE + EDGE_SLACK;

    if within(LANDSCAPE_RATIO) {
        AspectClass::Landscape
    } else if within(PORTRAIT_RATIO) {
        AspectClass::Portrait
    } else {
        AspectClass::Other
    }
}
