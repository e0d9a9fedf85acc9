use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::error::{Error, Result};
use crate::palette::{PaletteIdx, SharedPalette};

pub type PixelCoord = u32;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDimensions")]
pub struct Dimensions {
    pub width: PixelCoord,
    pub height: PixelCoord,
}

#[derive(Deserialize)]
struct RawDimensions {
    width: PixelCoord,
    height: PixelCoord,
}

impl TryFrom<RawDimensions> for Dimensions {
    type Error = Error;

    fn try_from(raw: RawDimensions) -> Result<Self> {
        Dimensions::new(raw.width, raw.height)
    }
}

impl Dimensions {
    pub fn new(width: PixelCoord, height: PixelCoord) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimensions { width, height });
        }
        Ok(Dimensions { width, height })
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Row-major offset of `(x, y)`, or an error if it falls outside.
    pub fn offset(&self, x: PixelCoord, y: PixelCoord) -> Result<usize> {
        if x >= self.width || y >= self.height {
            return Err(Error::PixelOutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        Ok(y as usize * self.width as usize + x as usize)
    }
}

fn check_len(dims: Dimensions, per_pixel: usize, actual: usize) -> Result<()> {
    let expected = (dims.width as usize)
        .checked_mul(dims.height as usize)
        .and_then(|n| n.checked_mul(per_pixel))
        .ok_or(Error::InvalidDimensions {
            width: dims.width,
            height: dims.height,
        })?;
    if expected != actual {
        return Err(Error::BufferSizeMismatch { expected, actual });
    }
    Ok(())
}

/// Direct-color (mode 3) bitmap: one RGBA quadruple per pixel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterImage {
    pub file_name: String,
    dims: Dimensions,
    data: Vec<u8>,
}

impl RasterImage {
    /// Blank opaque-black image.
    pub fn new(file_name: &str, dims: Dimensions) -> Self {
        let data = [0, 0, 0, 255].repeat(dims.pixel_count());
        RasterImage {
            file_name: file_name.to_string(),
            dims,
            data,
        }
    }

    pub fn from_rgba(file_name: &str, dims: Dimensions, data: Vec<u8>) -> Result<Self> {
        check_len(dims, 4, data.len())?;
        Ok(RasterImage {
            file_name: file_name.to_string(),
            dims,
            data,
        })
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dims
    }

    pub fn width(&self) -> PixelCoord {
        self.dims.width
    }

    pub fn height(&self) -> PixelCoord {
        self.dims.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn pixel(&self, x: PixelCoord, y: PixelCoord) -> Result<Color> {
        let i = self.dims.offset(x, y)? * 4;
        let p = &self.data[i..i + 4];
        Ok(Color::rgba(p[0], p[1], p[2], p[3]))
    }

    pub fn set_pixel(&mut self, x: PixelCoord, y: PixelCoord, color: Color) -> Result<()> {
        let i = self.dims.offset(x, y)? * 4;
        self.data[i..i + 4].copy_from_slice(&[color.r, color.g, color.b, color.a]);
        Ok(())
    }

    /// Pixels in row-major order (y outer, x inner).
    pub fn pixels(&self) -> impl Iterator<Item = Color> + '_ {
        self.data
            .chunks_exact(4)
            .map(|p| Color::rgba(p[0], p[1], p[2], p[3]))
    }

    /// Replaces dimensions and buffer together, as on snapshot restore.
    pub fn replace(&mut self, dims: Dimensions, data: Vec<u8>) -> Result<()> {
        check_len(dims, 4, data.len())?;
        self.dims = dims;
        self.data = data;
        Ok(())
    }
}

/// Paletted (mode 4) bitmap: one palette index per pixel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexedImage {
    pub file_name: String,
    dims: Dimensions,
    indices: Vec<PaletteIdx>,
    palette: SharedPalette,
    paint_index: PaletteIdx,
}

impl IndexedImage {
    pub fn new(file_name: &str, dims: Dimensions, palette: SharedPalette) -> Self {
        IndexedImage {
            file_name: file_name.to_string(),
            dims,
            indices: vec![0; dims.pixel_count()],
            palette,
            paint_index: 0,
        }
    }

    pub fn from_indices(
        file_name: &str,
        dims: Dimensions,
        indices: Vec<PaletteIdx>,
        palette: SharedPalette,
    ) -> Result<Self> {
        check_len(dims, 1, indices.len())?;
        Ok(IndexedImage {
            file_name: file_name.to_string(),
            dims,
            indices,
            palette,
            paint_index: 0,
        })
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dims
    }

    pub fn width(&self) -> PixelCoord {
        self.dims.width
    }

    pub fn height(&self) -> PixelCoord {
        self.dims.height
    }

    pub fn indices(&self) -> &[PaletteIdx] {
        &self.indices
    }

    pub fn palette(&self) -> &SharedPalette {
        &self.palette
    }

    /// Rebinds the image to a replacement palette.
    pub fn bind_palette(&mut self, palette: SharedPalette) {
        self.palette = palette;
    }

    pub fn paint_index(&self) -> PaletteIdx {
        self.paint_index
    }

    pub fn set_paint_index(&mut self, index: PaletteIdx) {
        self.paint_index = index;
    }

    pub fn index_at(&self, x: PixelCoord, y: PixelCoord) -> Result<PaletteIdx> {
        Ok(self.indices[self.dims.offset(x, y)?])
    }

    pub fn set_index(&mut self, x: PixelCoord, y: PixelCoord, index: PaletteIdx) -> Result<()> {
        let i = self.dims.offset(x, y)?;
        self.indices[i] = index;
        Ok(())
    }

    pub fn color_at(&self, x: PixelCoord, y: PixelCoord) -> Result<Color> {
        Ok(self.palette.color_at(self.index_at(x, y)?))
    }

    pub fn replace(&mut self, dims: Dimensions, indices: Vec<PaletteIdx>) -> Result<()> {
        check_len(dims, 1, indices.len())?;
        self.dims = dims;
        self.indices = indices;
        Ok(())
    }

    /// Resolves every index through the palette.
    pub fn to_raster(&self) -> RasterImage {
        let data = self
            .indices
            .iter()
            .flat_map(|&i| {
                let c = self.palette.color_at(i);
                [c.r, c.g, c.b, c.a]
            })
            .collect();
        RasterImage {
            file_name: self.file_name.clone(),
            dims: self.dims,
            data,
        }
    }
}
