//! Handles and styles shared by backends

use serde::{Deserialize, Serialize};

/// Handle of an axis (coordinate system) created by a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AxisId(pub(crate) usize);

/// Handle of a drawable series created by a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtistId(pub(crate) usize);

/// Handle of a reference line or span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReferenceId(pub(crate) usize);

impl AxisId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl ArtistId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl ReferenceId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// How a series is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mark {
    /// Straight segments between points
    Line,
    /// Value held until the next point
    Step,
    /// Markers only
    Scatter,
}

impl std::fmt::Display for Mark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Mark::Line => "line",
            Mark::Step => "step",
            Mark::Scatter => "scatter",
        };
        write!(f, "{}", s)
    }
}

/// Appearance of a series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistStyle {
    pub mark: Mark,
    /// CSS color
    pub color: String,
    /// Legend label
    pub label: String,
    /// Line width, or marker radius for scatter marks
    pub width: f64,
}

impl ArtistStyle {
    pub fn new(mark: Mark, color: impl Into<String>, label: impl Into<String>) -> Self {
        let width = match mark {
            Mark::Scatter => 2.0,
            Mark::Line | Mark::Step => 1.5,
        };
        Self {
            mark,
            color: color.into(),
            label: label.into(),
            width,
        }
    }
}

/// A reference line or shaded band in data coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Reference {
    VLine { x: f64 },
    HLine { y: f64 },
    VSpan { x0: f64, x1: f64 },
    HSpan { y0: f64, y1: f64 },
}

impl Reference {
    pub fn is_span(&self) -> bool {
        matches!(self, Reference::VSpan { .. } | Reference::HSpan { .. })
    }
}

/// Appearance of a reference line or band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceStyle {
    pub color: String,
    pub alpha: f64,
    /// Line width; 0 draws a band without edge
    pub width: f64,
}

impl ReferenceStyle {
    /// Black, opaque
    pub fn line() -> Self {
        Self {
            color: "black".to_string(),
            alpha: 1.0,
            width: 1.0,
        }
    }

    /// Light gray, translucent, no edge
    pub fn span() -> Self {
        Self {
            color: "lightgray".to_string(),
            alpha: 0.6,
            width: 0.0,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_width(mut self, width: f64) -> Self {
        self.width = width;
        self
    }
}
