use crate::color::Color;
use crate::document::Mode;
use crate::image::{PixelCoord, RasterImage};
use crate::palette::{BankIdx, Palette, PaletteIdx};
use crate::sprite::{ColorIdx, SpriteSize, TilePos};

#[derive(Debug, Clone)]
pub enum Message {
    NewImage {
        file_name: String,
        width: PixelCoord,
        height: PixelCoord,
        mode: Mode,
    },
    NewSpriteSheet(String),
    OpenImage(RasterImage),
    SetPixel {
        x: PixelCoord,
        y: PixelCoord,
        color: Color,
    },
    SetIndex {
        x: PixelCoord,
        y: PixelCoord,
        index: PaletteIdx,
    },
    SetPaintIndex(PaletteIdx),
    Quantize(u16),
    SetPaletteColor {
        index: PaletteIdx,
        color: Color,
    },
    LoadPalette(Palette),
    MergePalette {
        incoming: Palette,
        src_row: BankIdx,
        dst_row: BankIdx,
        rows: u8,
    },
    AddSprite {
        position: TilePos,
        size: SpriteSize,
    },
    RemoveSprite(usize),
    SetSpritePixel {
        sprite: usize,
        x: PixelCoord,
        y: PixelCoord,
        value: ColorIdx,
    },
    SetSpritePaletteRow {
        sprite: usize,
        row: BankIdx,
    },
    Undo,
    Redo,
}
