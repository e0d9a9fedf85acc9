use std::fmt::Display;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::error::{Error, Result};
use crate::image::{Dimensions, PixelCoord, RasterImage};
use crate::palette::{BankIdx, SharedPalette, BANK_COUNT};

pub const TILE_SIZE: u32 = 8;
pub const SHEET_TILES: u32 = 32;
pub const SHEET_PIXELS: u32 = SHEET_TILES * TILE_SIZE;

pub type ColorIdx = u8; // Index into a 16-color palette bank (0-15)
pub type TileCoord = u8;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TilePos {
    pub x: TileCoord,
    pub y: TileCoord,
}

impl TilePos {
    pub fn new(x: TileCoord, y: TileCoord) -> Self {
        TilePos { x, y }
    }
}

impl Display for TilePos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// The legal OBJ sizes, named height by width.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpriteSize {
    S8x8,
    S16x16,
    S32x32,
    S64x64,
    S8x16,
    S8x32,
    S16x8,
    S16x32,
    S32x8,
    S32x64,
    S64x32,
}

impl SpriteSize {
    pub const ALL: [SpriteSize; 11] = [
        SpriteSize::S8x8,
        SpriteSize::S16x16,
        SpriteSize::S32x32,
        SpriteSize::S64x64,
        SpriteSize::S8x16,
        SpriteSize::S8x32,
        SpriteSize::S16x8,
        SpriteSize::S16x32,
        SpriteSize::S32x8,
        SpriteSize::S32x64,
        SpriteSize::S64x32,
    ];

    /// (height, width) in pixels.
    pub fn hw(self) -> (u32, u32) {
        match self {
            SpriteSize::S8x8 => (8, 8),
            SpriteSize::S16x16 => (16, 16),
            SpriteSize::S32x32 => (32, 32),
            SpriteSize::S64x64 => (64, 64),
            SpriteSize::S8x16 => (8, 16),
            SpriteSize::S8x32 => (8, 32),
            SpriteSize::S16x8 => (16, 8),
            SpriteSize::S16x32 => (16, 32),
            SpriteSize::S32x8 => (32, 8),
            SpriteSize::S32x64 => (32, 64),
            SpriteSize::S64x32 => (64, 32),
        }
    }

    pub fn from_hw(height: u32, width: u32) -> Result<Self> {
        SpriteSize::ALL
            .into_iter()
            .find(|s| s.hw() == (height, width))
            .ok_or(Error::InvalidSpriteSize { height, width })
    }

    pub fn height(self) -> u32 {
        self.hw().0
    }

    pub fn width(self) -> u32 {
        self.hw().1
    }

    pub fn tiles_high(self) -> u32 {
        self.height() / TILE_SIZE
    }

    pub fn tiles_wide(self) -> u32 {
        self.width() / TILE_SIZE
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sprite {
    pub position: TilePos,
    pub size: SpriteSize,
    pixels: Vec<ColorIdx>,
    palette_row: BankIdx,
}

impl Sprite {
    pub fn new(position: TilePos, size: SpriteSize, palette_row: BankIdx) -> Result<Self> {
        check_row(palette_row)?;
        Ok(Sprite {
            position,
            size,
            pixels: vec![0; (size.height() * size.width()) as usize],
            palette_row,
        })
    }

    pub fn pixels(&self) -> &[ColorIdx] {
        &self.pixels
    }

    pub fn palette_row(&self) -> BankIdx {
        self.palette_row
    }

    pub fn set_palette_row(&mut self, row: BankIdx) -> Result<()> {
        check_row(row)?;
        self.palette_row = row;
        Ok(())
    }

    fn offset(&self, x: PixelCoord, y: PixelCoord) -> Result<usize> {
        let (height, width) = self.size.hw();
        if x >= width || y >= height {
            return Err(Error::PixelOutOfBounds { x, y, width, height });
        }
        Ok((y * width + x) as usize)
    }

    pub fn pixel(&self, x: PixelCoord, y: PixelCoord) -> Result<ColorIdx> {
        Ok(self.pixels[self.offset(x, y)?])
    }

    pub fn set_pixel(&mut self, x: PixelCoord, y: PixelCoord, value: ColorIdx) -> Result<()> {
        if value > 15 {
            return Err(Error::SpriteIndexOutOfRange(value));
        }
        let i = self.offset(x, y)?;
        self.pixels[i] = value;
        Ok(())
    }

    /// Checks the invariants of a sprite that did not come through `new`,
    /// e.g. one read back from a snapshot.
    pub fn validate(&self) -> Result<()> {
        check_row(self.palette_row)?;
        let expected = (self.size.height() * self.size.width()) as usize;
        if self.pixels.len() != expected {
            return Err(Error::BufferSizeMismatch {
                expected,
                actual: self.pixels.len(),
            });
        }
        if let Some(&bad) = self.pixels.iter().find(|&&p| p > 15) {
            return Err(Error::SpriteIndexOutOfRange(bad));
        }
        Ok(())
    }

    /// Tiles covered by the sprite, row by row.
    fn tiles(&self) -> impl Iterator<Item = (u32, u32)> {
        let x0 = self.position.x as u32;
        let y0 = self.position.y as u32;
        let (w, h) = (self.size.tiles_wide(), self.size.tiles_high());
        (y0..y0 + h).flat_map(move |y| (x0..x0 + w).map(move |x| (x, y)))
    }
}

fn check_row(row: BankIdx) -> Result<()> {
    if row as usize >= BANK_COUNT {
        return Err(Error::PaletteRowOutOfRange(row));
    }
    Ok(())
}

#[derive(Clone, Debug)]
pub struct SpriteSheet {
    pub file_name: String,
    palette: SharedPalette,
    sprites: Vec<Sprite>,
    // Index into `sprites` for each of the 32x32 tiles.
    occupancy: Vec<Option<usize>>,
}

impl SpriteSheet {
    pub fn new(file_name: &str, palette: SharedPalette) -> Self {
        SpriteSheet {
            file_name: file_name.to_string(),
            palette,
            sprites: vec![],
            occupancy: vec![None; (SHEET_TILES * SHEET_TILES) as usize],
        }
    }

    pub fn dimensions() -> Dimensions {
        Dimensions {
            width: SHEET_PIXELS,
            height: SHEET_PIXELS,
        }
    }

    pub fn palette(&self) -> &SharedPalette {
        &self.palette
    }

    pub fn bind_palette(&mut self, palette: SharedPalette) {
        self.palette = palette;
    }

    pub fn sprites(&self) -> &[Sprite] {
        &self.sprites
    }

    pub fn sprite(&self, index: usize) -> Result<&Sprite> {
        self.sprites.get(index).ok_or(Error::NoSuchSprite(index))
    }

    fn sprite_mut(&mut self, index: usize) -> Result<&mut Sprite> {
        self.sprites.get_mut(index).ok_or(Error::NoSuchSprite(index))
    }

    /// Index of the sprite occupying tile `(tx, ty)`, if any.
    pub fn sprite_at_tile(&self, tx: u32, ty: u32) -> Option<usize> {
        if tx >= SHEET_TILES || ty >= SHEET_TILES {
            return None;
        }
        self.occupancy[(ty * SHEET_TILES + tx) as usize]
    }

    fn check_placement(&self, sprite: &Sprite) -> Result<()> {
        let pos = sprite.position;
        if pos.x as u32 + sprite.size.tiles_wide() > SHEET_TILES
            || pos.y as u32 + sprite.size.tiles_high() > SHEET_TILES
        {
            return Err(Error::SpriteOutOfBounds { pos });
        }
        if sprite.tiles().any(|(x, y)| self.sprite_at_tile(x, y).is_some()) {
            return Err(Error::SpriteOverlap { pos });
        }
        Ok(())
    }

    fn mark(&mut self, sprite: &Sprite, value: Option<usize>) {
        for (x, y) in sprite.tiles() {
            self.occupancy[(y * SHEET_TILES + x) as usize] = value;
        }
    }

    /// Places a blank sprite bound to palette row 0. Nothing changes if the
    /// sprite would overlap another or leave the sheet.
    pub fn add_sprite(&mut self, position: TilePos, size: SpriteSize) -> Result<usize> {
        self.insert(Sprite::new(position, size, 0)?)
    }

    pub fn insert(&mut self, sprite: Sprite) -> Result<usize> {
        if let Err(e) = self.check_placement(&sprite) {
            warn!("Rejected sprite placement: {}", e);
            return Err(e);
        }
        let idx = self.sprites.len();
        self.mark(&sprite, Some(idx));
        self.sprites.push(sprite);
        Ok(idx)
    }

    pub fn remove_sprite(&mut self, index: usize) -> Result<Sprite> {
        if index >= self.sprites.len() {
            return Err(Error::NoSuchSprite(index));
        }
        let sprite = self.sprites.remove(index);
        self.mark(&sprite, None);
        for cell in self.occupancy.iter_mut() {
            if let Some(i) = cell {
                if *i > index {
                    *i -= 1;
                }
            }
        }
        Ok(sprite)
    }

    pub fn set_sprite_pixel(&mut self, index: usize, x: PixelCoord, y: PixelCoord, value: ColorIdx) -> Result<()> {
        self.sprite_mut(index)?.set_pixel(x, y, value)
    }

    pub fn set_sprite_palette_row(&mut self, index: usize, row: BankIdx) -> Result<()> {
        self.sprite_mut(index)?.set_palette_row(row)
    }

    /// Replaces all sprites at once. On any invalid or overlapping sprite the
    /// sheet keeps its previous contents.
    pub fn replace_sprites(&mut self, sprites: Vec<Sprite>) -> Result<()> {
        let mut sheet = SpriteSheet::new(&self.file_name, self.palette.clone());
        for sprite in sprites {
            sprite.validate()?;
            sheet.insert(sprite)?;
        }
        self.sprites = sheet.sprites;
        self.occupancy = sheet.occupancy;
        Ok(())
    }

    /// Color at a sheet pixel; tiles without a sprite read as opaque black.
    pub fn color_at(&self, x: PixelCoord, y: PixelCoord) -> Result<Color> {
        Self::dimensions().offset(x, y)?;
        let Some(idx) = self.sprite_at_tile(x / TILE_SIZE, y / TILE_SIZE) else {
            return Ok(Color::BLACK);
        };
        let sprite = &self.sprites[idx];
        let local_x = x - TILE_SIZE * sprite.position.x as u32;
        let local_y = y - TILE_SIZE * sprite.position.y as u32;
        let c = sprite.pixel(local_x, local_y)?;
        self.palette.bank_color(sprite.palette_row, c)
    }

    pub fn render(&self) -> Result<RasterImage> {
        let mut out = RasterImage::new(&self.file_name, Self::dimensions());
        for sprite in &self.sprites {
            let x0 = sprite.position.x as u32 * TILE_SIZE;
            let y0 = sprite.position.y as u32 * TILE_SIZE;
            let bank = self.palette.bank(sprite.palette_row)?;
            for y in 0..sprite.size.height() {
                for x in 0..sprite.size.width() {
                    let c = bank[sprite.pixel(x, y)? as usize];
                    out.set_pixel(x0 + x, y0 + y, c)?;
                }
            }
        }
        Ok(out)
    }
}
