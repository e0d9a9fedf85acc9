//! Text encodings of images and palettes: packed C arrays with a matching
//! header, and the portable `0x00RRGGBB` palette file.
use itertools::Itertools;

use crate::color::Color;
use crate::error::{Error, Result};
use crate::image::{IndexedImage, RasterImage};
use crate::palette::{Palette, PALETTE_SIZE};
use crate::sprite::{SpriteSheet, TILE_SIZE};

const VALUES_PER_LINE: usize = 8;
const VALUES_PER_BLOCK: usize = 64;
const PALETTE_FILE_COLUMNS: usize = 4;
const PALETTE_ENTRY_LEN: usize = 10;

/// A paired source body and header for one image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Generated {
    pub name: String,
    pub source: String,
    pub header: String,
    /// Set when the requested output could not be produced as asked.
    pub warning: Option<String>,
}

/// C identifier derived from a file name with its extension stripped.
pub fn identifier(file_name: &str) -> String {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    let stem = match base.rfind('.') {
        Some(i) if i > 0 => &base[..i],
        _ => base,
    };
    let mut name: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    name
}

/// Renders words as `0xHHHH`, comma separated, eight per line. With
/// `blocks` set, every 64 values are followed by a blank line.
pub fn hex_words(words: &[u16], blocks: bool) -> String {
    let mut out = String::new();
    for (i, w) in words.iter().enumerate() {
        out.push_str(&format!("0x{:04X}", w));
        let n = i + 1;
        if n < words.len() {
            out.push(',');
        }
        if n % VALUES_PER_LINE == 0 || n == words.len() {
            out.push('\n');
        }
        if blocks && n % VALUES_PER_BLOCK == 0 && n < words.len() {
            out.push('\n');
        }
    }
    out
}

/// Mode 3 pixel words: 5-bit BGR per pixel, alpha dropped.
pub fn pack_direct(image: &RasterImage) -> Vec<u16> {
    image.pixels().map(Color::to_bgr555).collect()
}

/// Mode 4 pixel words: two indices per word, the first in the high byte.
/// An odd trailing index is paired with 0.
pub fn pack_indexed(indices: &[u8]) -> Vec<u16> {
    indices
        .chunks(2)
        .map(|pair| {
            let hi = pair[0] as u16;
            let lo = pair.get(1).copied().unwrap_or(0) as u16;
            (hi << 8) | lo
        })
        .collect()
}

pub fn pack_palette(palette: &Palette) -> Vec<u16> {
    palette.colors().iter().map(|c| c.to_bgr555()).collect()
}

/// 4bpp tile data for every sprite, in sheet order. Each sprite's tiles are
/// laid out row by row; within a word the leftmost pixel is the low nibble.
/// Returns the words and each sprite's starting tile number.
pub fn pack_sprite_tiles(sheet: &SpriteSheet) -> Result<(Vec<u16>, Vec<usize>)> {
    let mut words = vec![];
    let mut offsets = vec![];
    let mut tile = 0;
    for sprite in sheet.sprites() {
        offsets.push(tile);
        for ty in 0..sprite.size.tiles_high() {
            for tx in 0..sprite.size.tiles_wide() {
                for y in 0..TILE_SIZE {
                    for x in (0..TILE_SIZE).step_by(4) {
                        let mut w = 0u16;
                        for i in 0..4 {
                            let p = sprite.pixel(tx * TILE_SIZE + x + i, ty * TILE_SIZE + y)?;
                            w |= (p as u16 & 0xF) << (4 * i);
                        }
                        words.push(w);
                    }
                }
                tile += 1;
            }
        }
    }
    Ok((words, offsets))
}

fn array(decl: &str, words: &[u16], blocks: bool) -> String {
    format!(
        "const unsigned short {}[{}] __attribute__((aligned(4))) =\n{{\n{}}};\n",
        decl,
        words.len(),
        hex_words(words, blocks)
    )
}

fn banner(name: &str, what: &str) -> String {
    format!("//\n// {} ({})\n//\n\n", name, what)
}

fn guard(name: &str, body: &str) -> String {
    let g = format!("{}_H", name.to_uppercase());
    format!("#ifndef {g}\n#define {g}\n\n{body}\n#endif // {g}\n")
}

fn palette_defines(name: &str) -> (String, String) {
    (
        format!("#define {}PalLen {}\n", name, PALETTE_SIZE * 2),
        format!("extern const unsigned short {}Pal[{}];\n", name, PALETTE_SIZE),
    )
}

pub fn direct_color(image: &RasterImage) -> Generated {
    let name = identifier(&image.file_name);
    let words = pack_direct(image);
    let what = format!("{}x{} mode 3 bitmap", image.width(), image.height());
    let source = banner(&name, &what) + &array(&format!("{}Bitmap", name), &words, true);
    let header = guard(
        &name,
        &format!(
            "#define {n}BitmapLen {}\n#define {n}Width {}\n#define {n}Height {}\n\n\
             extern const unsigned short {n}Bitmap[{}];\n",
            words.len() * 2,
            image.width(),
            image.height(),
            words.len(),
            n = name
        ),
    );
    Generated {
        name,
        source,
        header,
        warning: None,
    }
}

pub fn paletted(image: &IndexedImage) -> Generated {
    let name = identifier(&image.file_name);
    let words = pack_indexed(image.indices());
    let pal = pack_palette(image.palette());
    let what = format!("{}x{} mode 4 bitmap", image.width(), image.height());
    let source = banner(&name, &what)
        + &array(&format!("{}Bitmap", name), &words, false)
        + "\n"
        + &array(&format!("{}Pal", name), &pal, true);
    let (pal_define, pal_extern) = palette_defines(&name);
    let header = guard(
        &name,
        &format!(
            "#define {n}BitmapLen {}\n#define {n}Width {}\n#define {n}Height {}\n{}\n\
             extern const unsigned short {n}Bitmap[{}];\n{}",
            words.len() * 2,
            image.width(),
            image.height(),
            pal_define,
            words.len(),
            pal_extern,
            n = name
        ),
    );
    Generated {
        name,
        source,
        header,
        warning: None,
    }
}

pub fn sprite_sheet(sheet: &SpriteSheet) -> Result<Generated> {
    let name = identifier(&sheet.file_name);
    let (words, offsets) = pack_sprite_tiles(sheet)?;
    let pal = pack_palette(sheet.palette());
    let what = format!("{} sprites, 4bpp", sheet.sprites().len());
    let source = banner(&name, &what)
        + &array(&format!("{}Tiles", name), &words, true)
        + "\n"
        + &array(&format!("{}Pal", name), &pal, true);
    let sprite_defines: String = offsets
        .iter()
        .enumerate()
        .map(|(i, tile)| format!("#define {}Sprite{}Tile {}\n", name, i, tile))
        .collect();
    let (pal_define, pal_extern) = palette_defines(&name);
    let header = guard(
        &name,
        &format!(
            "#define {n}TilesLen {}\n#define {n}SpriteCount {}\n{}{}\n\
             extern const unsigned short {n}Tiles[{}];\n{}",
            words.len() * 2,
            offsets.len(),
            sprite_defines,
            pal_define,
            words.len(),
            pal_extern,
            n = name
        ),
    );
    Ok(Generated {
        name,
        source,
        header,
        warning: None,
    })
}

/// Palette as `0x00RRGGBB` entries, four per line, tab separated.
pub fn palette_file(palette: &Palette) -> String {
    palette
        .colors()
        .chunks(PALETTE_FILE_COLUMNS)
        .map(|row| row.iter().map(|c| format!("0x{:08X}", c.to_xrgb())).join("\t") + "\n")
        .collect()
}

/// Parses a palette file. Whitespace between entries is ignored; entries
/// beyond those present are left opaque black.
pub fn parse_palette_file(text: &str) -> Result<Palette> {
    let compact: String = text.split_whitespace().collect();
    if !compact.starts_with("0x00") {
        return Err(Error::MalformedPaletteFile("missing 0x00 prefix".to_string()));
    }
    if !compact.is_ascii() || compact.len() % PALETTE_ENTRY_LEN != 0 {
        return Err(Error::MalformedPaletteFile(format!(
            "length {} is not a whole number of entries",
            compact.len()
        )));
    }
    let count = compact.len() / PALETTE_ENTRY_LEN;
    if count > PALETTE_SIZE {
        return Err(Error::MalformedPaletteFile(format!(
            "{} entries, at most {} allowed",
            count, PALETTE_SIZE
        )));
    }
    let mut colors = Vec::with_capacity(count);
    for (i, entry) in compact.as_bytes().chunks(PALETTE_ENTRY_LEN).enumerate() {
        // Checked ASCII above, so every chunk is valid UTF-8.
        let entry = std::str::from_utf8(entry).map_err(|e| Error::MalformedPaletteFile(e.to_string()))?;
        let digits = entry
            .strip_prefix("0x00")
            .ok_or_else(|| Error::MalformedPaletteFile(format!("entry {} ({}) lacks 0x00 prefix", i, entry)))?;
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::MalformedPaletteFile(format!("entry {} ({}) is not hex", i, entry)));
        }
        let value = u32::from_str_radix(digits, 16)
            .map_err(|_| Error::MalformedPaletteFile(format!("entry {} ({}) is not hex", i, entry)))?;
        colors.push(Color::from_xrgb(value));
    }
    Ok(Palette::from_colors(&colors))
}
