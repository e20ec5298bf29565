use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ComposeError {
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Font error: {0}")]
    Font(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Unknown template: {0}")]
    UnknownTemplate(String),
    #[error("Unknown region type '{kind}' for region '{region}'")]
    UnknownRegionType { kind: String, region: String },
    #[error("Unknown page transform: {0}")]
    UnknownTransform(String),
    #[error("Invalid page transform: {0}")]
    InvalidTransform(String),
    #[error("Invalid contents for region '{region}': {reason}")]
    InvalidLocation { region: String, reason: String },
    #[error("Filler template '{0}' added no page, so the page restriction can never be met")]
    FillerStalled(String),
    #[error("Page limit of {0} exceeded")]
    PageLimitExceeded(usize),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, ComposeError>;

/// Whether a 1-based page position is odd or even.
///
/// Odd positions are right-hand (recto) pages in a bound book, even positions
/// are left-hand (verso) pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    Odd,
    Even,
}

impl Parity {
    /// Parity of a 1-based page position
    pub fn of(position: usize) -> Self {
        if position % 2 == 1 {
            Parity::Odd
        } else {
            Parity::Even
        }
    }

    pub fn matches(self, position: usize) -> bool {
        Parity::of(position) == self
    }
}

/// Axis-aligned rectangle in PDF points, origin at the lower-left corner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    /// X position (left edge)
    pub x: f32,
    /// Y position (bottom edge)
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge x coordinate
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Top edge y coordinate
    pub fn top(&self) -> f32 {
        self.y + self.height
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    pub fn center_y(&self) -> f32 {
        self.y + self.height / 2.0
    }
}
