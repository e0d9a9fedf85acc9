use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::error::{Error, Result};

pub const PALETTE_SIZE: usize = 256;
pub const BANK_SIZE: usize = 16;
pub const BANK_COUNT: usize = 16;

pub type PaletteIdx = u8; // Index into the full palette (0-255)
pub type BankIdx = u8; // Palette row (0-15)

/// Palettes are shared between every image and sprite bound to them. Edits
/// build a new palette and swap the handle; nothing mutates a shared
/// palette in place.
pub type SharedPalette = Rc<Palette>;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Color>", into = "Vec<Color>")]
pub struct Palette {
    colors: Vec<Color>,
}

impl Default for Palette {
    fn default() -> Self {
        Palette {
            colors: vec![Color::BLACK; PALETTE_SIZE],
        }
    }
}

impl TryFrom<Vec<Color>> for Palette {
    type Error = Error;

    fn try_from(colors: Vec<Color>) -> Result<Self> {
        if colors.len() != PALETTE_SIZE {
            return Err(Error::BufferSizeMismatch {
                expected: PALETTE_SIZE,
                actual: colors.len(),
            });
        }
        Ok(Palette { colors })
    }
}

impl From<Palette> for Vec<Color> {
    fn from(pal: Palette) -> Self {
        pal.colors
    }
}

pub fn row_of(index: PaletteIdx) -> BankIdx {
    index / BANK_SIZE as u8
}

pub fn col_of(index: PaletteIdx) -> u8 {
    index % BANK_SIZE as u8
}

impl Palette {
    /// Builds a palette from up to 256 leading colors; the rest stay black.
    pub fn from_colors(colors: &[Color]) -> Self {
        let mut pal = Palette::default();
        for (slot, &c) in pal.colors.iter_mut().zip(colors) {
            *slot = c;
        }
        pal
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    pub fn color_at(&self, index: PaletteIdx) -> Color {
        self.colors[index as usize]
    }

    /// Lookup by an unchecked index, e.g. one read back from a file.
    pub fn get(&self, index: usize) -> Result<Color> {
        self.colors
            .get(index)
            .copied()
            .ok_or(Error::PaletteIndexOutOfRange(index))
    }

    pub fn bank(&self, row: BankIdx) -> Result<&[Color]> {
        if row as usize >= BANK_COUNT {
            return Err(Error::PaletteRowOutOfRange(row));
        }
        let start = row as usize * BANK_SIZE;
        Ok(&self.colors[start..start + BANK_SIZE])
    }

    /// Color `col` of bank `row`, as seen by a 4bpp sprite bound to that bank.
    pub fn bank_color(&self, row: BankIdx, col: u8) -> Result<Color> {
        if col as usize >= BANK_SIZE {
            return Err(Error::SpriteIndexOutOfRange(col));
        }
        Ok(self.bank(row)?[col as usize])
    }

    pub fn with_color(&self, index: PaletteIdx, color: Color) -> Palette {
        let mut pal = self.clone();
        pal.colors[index as usize] = color;
        pal
    }

    /// Copies `rows` banks of `incoming` starting at `src_row` over this
    /// palette's banks starting at `dst_row`, returning the merged palette.
    pub fn merged(&self, incoming: &Palette, src_row: BankIdx, dst_row: BankIdx, rows: u8) -> Result<Palette> {
        let overflow = Error::PaletteRangeOverflow {
            src_row,
            dst_row,
            rows,
        };
        if src_row as usize + rows as usize > BANK_COUNT || dst_row as usize + rows as usize > BANK_COUNT {
            return Err(overflow);
        }
        let n = rows as usize * BANK_SIZE;
        let src = src_row as usize * BANK_SIZE;
        let dst = dst_row as usize * BANK_SIZE;
        let mut pal = self.clone();
        pal.colors[dst..dst + n].copy_from_slice(&incoming.colors[src..src + n]);
        Ok(pal)
    }

    /// Number of distinct colors other than opaque black.
    pub fn distinct_non_black(&self) -> usize {
        let mut seen: hashbrown::HashSet<Color> = hashbrown::HashSet::new();
        self.colors
            .iter()
            .filter(|&&c| c != Color::BLACK)
            .filter(|&&c| seen.insert(c))
            .count()
    }
}
