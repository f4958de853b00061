//! Score → color mapping.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which color scale to render with.
///
/// Preview runs use fewer satellites, so their scale has coarser, higher
/// thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    #[default]
    Full,
    Preview,
}

impl RenderMode {
    pub fn scale(self) -> ColorScale {
        match self {
            RenderMode::Full => ColorScale::FULL,
            RenderMode::Preview => ColorScale::PREVIEW,
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderMode::Full => write!(f, "full"),
            RenderMode::Preview => write!(f, "preview"),
        }
    }
}

impl FromStr for RenderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "full" => Ok(RenderMode::Full),
            "preview" => Ok(RenderMode::Preview),
            other => Err(format!("unknown render mode '{}'", other)),
        }
    }
}

/// Descending `(threshold, color)` steps with a fallback.
///
/// The first step whose threshold is `<=` the score wins. Scores below every
/// threshold, and NaN, get the fallback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorScale {
    steps: &'static [(f64, &'static str)],
    fallback: &'static str,
}

impl ColorScale {
    /// Weighted coverage, full constellation.
    pub const FULL: ColorScale = ColorScale {
        steps: &[
            (3.8, "#800000"),
            (3.2, "red"),
            (2.4, "orange"),
            (1.6, "yellow"),
            (0.8, "green"),
        ],
        fallback: "blue",
    };

    /// Weighted coverage, satellite-limited preview.
    pub const PREVIEW: ColorScale = ColorScale {
        steps: &[
            (5.0, "#800000"),
            (4.0, "red"),
            (3.0, "orange"),
            (2.0, "yellow"),
            (1.0, "green"),
        ],
        fallback: "blue",
    };

    /// Stability score in `(0, 1]`.
    pub const STABILITY: ColorScale = ColorScale {
        steps: &[
            (0.95, "#004d00"),
            (0.85, "green"),
            (0.70, "yellowgreen"),
            (0.50, "gold"),
            (0.30, "orange"),
        ],
        fallback: "red",
    };

    pub fn color_for(&self, score: f64) -> &'static str {
        self.steps
            .iter()
            .find(|(threshold, _)| score >= *threshold)
            .map_or(self.fallback, |&(_, color)| color)
    }

    pub fn steps(&self) -> &'static [(f64, &'static str)] {
        self.steps
    }

    pub fn fallback(&self) -> &'static str {
        self.fallback
    }
}

/// Color for a stability score.
pub fn stability_color(score: f64) -> &'static str {
    ColorScale::STABILITY.color_for(score)
}
