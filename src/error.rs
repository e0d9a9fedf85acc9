use thiserror::Error;

use crate::sprite::TilePos;

/// Errors raised by the image model, quantizer, codec and history.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("quantization depth {0} is outside 1..=256")]
    InvalidDepth(u16),

    #[error("image dimensions {width}x{height} are invalid")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("buffer holds {actual} bytes, expected {expected}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    #[error("pixel ({x}, {y}) is outside a {width}x{height} image")]
    PixelOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },

    #[error("palette index {0} is outside 0..=255")]
    PaletteIndexOutOfRange(usize),

    #[error("sprite color index {0} does not fit in 4 bits")]
    SpriteIndexOutOfRange(u8),

    #[error("palette row {0} is outside 0..=15")]
    PaletteRowOutOfRange(u8),

    #[error("copying {rows} palette rows from row {src_row} to row {dst_row} runs past entry 255")]
    PaletteRangeOverflow { src_row: u8, dst_row: u8, rows: u8 },

    #[error("sprite at tile {pos} overlaps an existing sprite")]
    SpriteOverlap { pos: TilePos },

    #[error("sprite at tile {pos} does not fit on the 32x32 tile sheet")]
    SpriteOutOfBounds { pos: TilePos },

    #[error("no sprite with index {0}")]
    NoSuchSprite(usize),

    #[error("{height}x{width} is not a legal sprite size")]
    InvalidSpriteSize { height: u32, width: u32 },

    #[error("malformed palette file: {0}")]
    MalformedPaletteFile(String),

    #[error("unsupported image mode {0}")]
    UnsupportedMode(u8),

    #[error("snapshot holds {found} data, expected {expected}")]
    SnapshotMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("nothing to undo")]
    NothingToUndo,

    #[error("nothing to redo")]
    NothingToRedo,
}

pub type Result<T> = std::result::Result<T, Error>;
