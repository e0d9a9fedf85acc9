use std::{fs, io::Cursor, path::Path};

use anyhow::{ensure, Context, Result};
use log::info;

use crate::image::{Dimensions, RasterImage};

/// Decodes PNG bytes to an RGBA image. Palette, grayscale and 16-bit files
/// are normalised to 8-bit RGBA.
pub fn decode_png(file_name: &str, bytes: &[u8]) -> Result<RasterImage> {
    let mut decoder = png::Decoder::new(Cursor::new(bytes));
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder.read_info().context("invalid PNG header")?;
    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buf).context("invalid PNG data")?;
    ensure!(
        info.bit_depth == png::BitDepth::Eight,
        "unexpected bit depth {:?} after normalisation",
        info.bit_depth
    );
    let data = &buf[..info.buffer_size()];

    let rgba: Vec<u8> = match info.color_type {
        png::ColorType::Rgba => data.to_vec(),
        png::ColorType::Rgb => data
            .chunks_exact(3)
            .flat_map(|p| [p[0], p[1], p[2], 255])
            .collect(),
        png::ColorType::GrayscaleAlpha => data
            .chunks_exact(2)
            .flat_map(|p| [p[0], p[0], p[0], p[1]])
            .collect(),
        png::ColorType::Grayscale => data.iter().flat_map(|&g| [g, g, g, 255]).collect(),
        png::ColorType::Indexed => anyhow::bail!("indexed PNG was not expanded"),
    };
    let dims = Dimensions::new(info.width, info.height)?;
    Ok(RasterImage::from_rgba(file_name, dims, rgba)?)
}

pub fn encode_png(image: &RasterImage) -> Result<Vec<u8>> {
    let mut out = vec![];
    {
        let mut encoder = png::Encoder::new(&mut out, image.width(), image.height());
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(image.data())?;
        writer.finish()?;
    }
    Ok(out)
}

pub fn load_png(path: &Path) -> Result<RasterImage> {
    info!("Importing {}", path.display());
    let bytes = fs::read(path).with_context(|| format!("Unable to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    decode_png(&file_name, &bytes).with_context(|| format!("Unable to decode {}", path.display()))
}

pub fn save_png(path: &Path, image: &RasterImage) -> Result<()> {
    info!("Saving {}", path.display());
    fs::write(path, encode_png(image)?)?;
    Ok(())
}
