use std::fmt::Display;

use serde::{Deserialize, Serialize};

pub type ColorValue = u8; // 8-bit channel value (0-255)
pub type Color5 = u8; // Hardware channel value (0-31)
pub type ColorRGB = (ColorValue, ColorValue, ColorValue);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: ColorValue,
    pub g: ColorValue,
    pub b: ColorValue,
    pub a: ColorValue,
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    pub const fn rgb(r: ColorValue, g: ColorValue, b: ColorValue) -> Self {
        Color { r, g, b, a: 255 }
    }

    pub const fn rgba(r: ColorValue, g: ColorValue, b: ColorValue, a: ColorValue) -> Self {
        Color { r, g, b, a }
    }

    pub fn from_rgb(rgb: ColorRGB) -> Self {
        Color::rgb(rgb.0, rgb.1, rgb.2)
    }

    pub fn to_rgb(self) -> ColorRGB {
        (self.r, self.g, self.b)
    }

    /// Packs the color as a GBA hardware word: `0b0bbbbbgggggrrrrr`.
    /// Alpha is dropped.
    pub fn to_bgr555(self) -> u16 {
        let r = to_5bit(self.r) as u16;
        let g = to_5bit(self.g) as u16;
        let b = to_5bit(self.b) as u16;
        (b << 10) | (g << 5) | r
    }

    /// Expands a hardware word back to an opaque 8-bit color. Bit 15 is ignored.
    pub fn from_bgr555(word: u16) -> Self {
        let r = (word & 31) as Color5;
        let g = ((word >> 5) & 31) as Color5;
        let b = ((word >> 10) & 31) as Color5;
        Color::rgb(from_5bit(r), from_5bit(g), from_5bit(b))
    }

    /// `0x00RRGGBB`, the portable palette-file form.
    pub fn to_xrgb(self) -> u32 {
        (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }

    pub fn from_xrgb(value: u32) -> Self {
        Color::rgb((value >> 16) as u8, (value >> 8) as u8, value as u8)
    }

    /// Squared Euclidean distance in RGB space, alpha ignored.
    pub fn distance_sq(self, other: Color) -> u32 {
        rgb_distance_sq(self.to_rgb(), other.to_rgb())
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)?;
        if self.a != 255 {
            write!(f, "{:02X}", self.a)?;
        }
        Ok(())
    }
}

/// `floor(c * 32 / 256)`.
pub fn to_5bit(c: ColorValue) -> Color5 {
    c >> 3
}

/// `(v + 1) * 8 - 1`. Not an exact inverse of `to_5bit`.
pub fn from_5bit(v: Color5) -> ColorValue {
    let v = v.min(31) as u16;
    ((v + 1) * 8 - 1) as ColorValue
}

pub fn rgb_distance_sq(a: ColorRGB, b: ColorRGB) -> u32 {
    let dr = a.0 as i32 - b.0 as i32;
    let dg = a.1 as i32 - b.1 as i32;
    let db = a.2 as i32 - b.2 as i32;
    (dr * dr + dg * dg + db * db) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_conversion() {
        assert_eq!(to_5bit(0), 0);
        assert_eq!(to_5bit(7), 0);
        assert_eq!(to_5bit(8), 1);
        assert_eq!(to_5bit(255), 31);
        assert_eq!(from_5bit(0), 7);
        assert_eq!(from_5bit(31), 255);
    }

    #[test]
    fn test_pack_layout() {
        assert_eq!(Color::rgb(255, 0, 0).to_bgr555(), 0x001F);
        assert_eq!(Color::rgb(0, 255, 0).to_bgr555(), 0x03E0);
        assert_eq!(Color::rgb(0, 0, 255).to_bgr555(), 0x7C00);
        assert_eq!(Color::rgba(255, 255, 255, 0).to_bgr555(), 0x7FFF);
    }

    #[test]
    fn test_pack_is_idempotent_on_5bit_values() {
        for r in (0..=255u16).step_by(3) {
            for g in (0..=255u16).step_by(17) {
                for b in [0u16, 1, 8, 127, 128, 200, 255] {
                    let c = Color::rgb(r as u8, g as u8, b as u8);
                    let packed = c.to_bgr555();
                    assert_eq!(Color::from_bgr555(packed).to_bgr555(), packed);
                }
            }
        }
    }

    #[test]
    fn test_unpack_ignores_high_bit() {
        assert_eq!(Color::from_bgr555(0x8000 | 0x001F), Color::rgb(255, 7, 7));
    }

    #[test]
    fn test_xrgb() {
        let c = Color::rgb(0x12, 0xAB, 0xEF);
        assert_eq!(c.to_xrgb(), 0x0012ABEF);
        assert_eq!(Color::from_xrgb(0x0012ABEF), c);
    }
}
