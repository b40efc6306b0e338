//! Load-time error types
//!
//! Only content loading can fail. Runtime simulation absorbs invariant
//! violations as no-ops instead of surfacing errors.

use thiserror::Error;

/// Crate result type
pub type Result<T> = std::result::Result<T, LoadError>;

/// Errors raised while loading levels, stat tables or settings
#[derive(Debug, Error)]
pub enum LoadError {
    /// Level image contains no player spawn cell
    #[error("level has no player spawn cell")]
    MissingPlayerSpawn,

    /// Pixel color does not map to any cell classification
    #[error("unrecognized tile color {color:?} at ({x}, {y})")]
    UnrecognizedColor { color: [u8; 4], x: usize, y: usize },

    /// Pixel buffer does not match the declared dimensions
    #[error("level is {width}x{height} but has {len} pixels")]
    PixelCountMismatch {
        width: usize,
        height: usize,
        len: usize,
    },

    /// ASCII level contains a character with no cell meaning
    #[error("unrecognized level glyph {glyph:?} at ({x}, {y})")]
    UnrecognizedGlyph { glyph: char, x: usize, y: usize },

    /// ASCII level rows differ in length
    #[error("level row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// Level has zero width or height
    #[error("level has no cells")]
    EmptyLevel,

    /// Stat table parsed but failed validation
    #[error("malformed stat table: {0}")]
    MalformedStats(String),

    /// JSON parse failure
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// File I/O failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl LoadError {
    pub fn stats(msg: impl Into<String>) -> Self {
        LoadError::MalformedStats(msg.into())
    }
}
