//! Converts true-color images into GBA mode 3 / mode 4 bitmaps and 4bpp
//! sprite sheets, and renders them as C source and header text.

pub mod color;
pub mod document;
pub mod error;
pub mod export;
pub mod image;
pub mod import;
pub mod message;
pub mod palette;
pub mod persist;
pub mod quantize;
pub mod sprite;
pub mod state;
pub mod undo;
pub mod update;
