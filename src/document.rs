use log::warn;
use serde::{Deserialize, Serialize};
use serde_repr::Serialize_repr;

use crate::error::{Error, Result};
use crate::export::{self, Generated};
use crate::image::{IndexedImage, RasterImage};
use crate::palette::SharedPalette;
use crate::sprite::SpriteSheet;
use crate::undo::{ImageData, SnapshotRecord};

/// GBA bitmap video mode, stored as its number.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize_repr, Deserialize)]
#[serde(try_from = "u8")]
#[repr(u8)]
pub enum Mode {
    #[default]
    Bitmap3 = 3,
    Bitmap4 = 4,
}

impl TryFrom<u8> for Mode {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            3 => Ok(Mode::Bitmap3),
            4 => Ok(Mode::Bitmap4),
            _ => Err(Error::UnsupportedMode(value)),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditorMode {
    #[default]
    Bitmap,
    Sprite,
}

/// Produces the composite surface a viewer would display.
pub trait Render {
    fn render(&self) -> Result<RasterImage>;
}

pub trait Export {
    fn export(&self, mode: Mode) -> Result<Generated>;
}

pub trait Snapshot {
    fn snapshot(&self) -> SnapshotRecord;

    /// Replaces the image's buffer and dimensions from `record`. The image is
    /// unchanged if the record does not fit it.
    fn restore(&mut self, record: &SnapshotRecord) -> Result<()>;
}

fn kind_name(data: &ImageData) -> &'static str {
    match data {
        ImageData::Pixels(_) => "pixel",
        ImageData::Indices { .. } => "index",
        ImageData::Sprites(_) => "sprite",
    }
}

fn mismatch(expected: &'static str, data: &ImageData) -> Error {
    Error::SnapshotMismatch {
        expected,
        found: kind_name(data),
    }
}

impl Render for RasterImage {
    fn render(&self) -> Result<RasterImage> {
        Ok(self.clone())
    }
}

impl Export for RasterImage {
    fn export(&self, mode: Mode) -> Result<Generated> {
        let mut out = export::direct_color(self);
        if mode == Mode::Bitmap4 {
            let msg = format!("{} has no palette; exported as mode 3", self.file_name);
            warn!("{}", msg);
            out.warning = Some(msg);
        }
        Ok(out)
    }
}

impl Snapshot for RasterImage {
    fn snapshot(&self) -> SnapshotRecord {
        SnapshotRecord {
            file_name: self.file_name.clone(),
            dimensions: self.dimensions(),
            data: ImageData::Pixels(self.data().to_vec()),
        }
    }

    fn restore(&mut self, record: &SnapshotRecord) -> Result<()> {
        let ImageData::Pixels(data) = &record.data else {
            return Err(mismatch("pixel", &record.data));
        };
        self.replace(record.dimensions, data.clone())?;
        self.file_name = record.file_name.clone();
        Ok(())
    }
}

impl Render for IndexedImage {
    fn render(&self) -> Result<RasterImage> {
        Ok(self.to_raster())
    }
}

impl Export for IndexedImage {
    fn export(&self, mode: Mode) -> Result<Generated> {
        Ok(match mode {
            Mode::Bitmap3 => export::direct_color(&self.to_raster()),
            Mode::Bitmap4 => export::paletted(self),
        })
    }
}

impl Snapshot for IndexedImage {
    fn snapshot(&self) -> SnapshotRecord {
        SnapshotRecord {
            file_name: self.file_name.clone(),
            dimensions: self.dimensions(),
            data: ImageData::Indices {
                indices: self.indices().to_vec(),
                paint_index: self.paint_index(),
            },
        }
    }

    fn restore(&mut self, record: &SnapshotRecord) -> Result<()> {
        let ImageData::Indices { indices, paint_index } = &record.data else {
            return Err(mismatch("index", &record.data));
        };
        self.replace(record.dimensions, indices.clone())?;
        self.set_paint_index(*paint_index);
        self.file_name = record.file_name.clone();
        Ok(())
    }
}

impl Render for SpriteSheet {
    fn render(&self) -> Result<RasterImage> {
        SpriteSheet::render(self)
    }
}

impl Export for SpriteSheet {
    // Sprites always export as 4bpp tiles, whatever the bitmap mode.
    fn export(&self, _mode: Mode) -> Result<Generated> {
        export::sprite_sheet(self)
    }
}

impl Snapshot for SpriteSheet {
    fn snapshot(&self) -> SnapshotRecord {
        SnapshotRecord {
            file_name: self.file_name.clone(),
            dimensions: SpriteSheet::dimensions(),
            data: ImageData::Sprites(self.sprites().to_vec()),
        }
    }

    fn restore(&mut self, record: &SnapshotRecord) -> Result<()> {
        let ImageData::Sprites(sprites) = &record.data else {
            return Err(mismatch("sprite", &record.data));
        };
        self.replace_sprites(sprites.clone())?;
        self.file_name = record.file_name.clone();
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub enum Document {
    DirectColor(RasterImage),
    Paletted(IndexedImage),
    Sprites(SpriteSheet),
}

impl Document {
    /// Rebuilds a document of whatever kind `record` holds. `palette` is
    /// bound to paletted images and sprite sheets.
    pub fn from_snapshot(record: &SnapshotRecord, palette: SharedPalette) -> Result<Document> {
        let name = &record.file_name;
        let dims = record.dimensions;
        Ok(match &record.data {
            ImageData::Pixels(data) => {
                Document::DirectColor(RasterImage::from_rgba(name, dims, data.clone())?)
            }
            ImageData::Indices {
                indices,
                paint_index,
            } => {
                let mut img = IndexedImage::from_indices(name, dims, indices.clone(), palette)?;
                img.set_paint_index(*paint_index);
                Document::Paletted(img)
            }
            ImageData::Sprites(_) => {
                let mut sheet = SpriteSheet::new(name, palette);
                sheet.restore(record)?;
                Document::Sprites(sheet)
            }
        })
    }

    /// Rebuilds a stored document, checking that the stored modes agree with
    /// the kind of data in `record`.
    pub fn from_record(
        record: &SnapshotRecord,
        mode: Mode,
        editor_mode: EditorMode,
        palette: SharedPalette,
    ) -> Result<Document> {
        let expected = match (editor_mode, mode) {
            (EditorMode::Sprite, _) => "sprite",
            (EditorMode::Bitmap, Mode::Bitmap3) => "pixel",
            (EditorMode::Bitmap, Mode::Bitmap4) => "index",
        };
        if kind_name(&record.data) != expected {
            return Err(mismatch(expected, &record.data));
        }
        Document::from_snapshot(record, palette)
    }

    pub fn file_name(&self) -> &str {
        match self {
            Document::DirectColor(img) => &img.file_name,
            Document::Paletted(img) => &img.file_name,
            Document::Sprites(sheet) => &sheet.file_name,
        }
    }

    pub fn mode(&self) -> Mode {
        match self {
            Document::DirectColor(_) => Mode::Bitmap3,
            Document::Paletted(_) | Document::Sprites(_) => Mode::Bitmap4,
        }
    }

    pub fn editor_mode(&self) -> EditorMode {
        match self {
            Document::Sprites(_) => EditorMode::Sprite,
            _ => EditorMode::Bitmap,
        }
    }

    pub fn palette(&self) -> Option<&SharedPalette> {
        match self {
            Document::DirectColor(_) => None,
            Document::Paletted(img) => Some(img.palette()),
            Document::Sprites(sheet) => Some(sheet.palette()),
        }
    }

    pub fn bind_palette(&mut self, palette: SharedPalette) {
        match self {
            Document::DirectColor(_) => {}
            Document::Paletted(img) => img.bind_palette(palette),
            Document::Sprites(sheet) => sheet.bind_palette(palette),
        }
    }
}

impl Render for Document {
    fn render(&self) -> Result<RasterImage> {
        match self {
            Document::DirectColor(img) => img.render(),
            Document::Paletted(img) => img.render(),
            Document::Sprites(sheet) => Render::render(sheet),
        }
    }
}

impl Export for Document {
    fn export(&self, mode: Mode) -> Result<Generated> {
        match self {
            Document::DirectColor(img) => img.export(mode),
            Document::Paletted(img) => img.export(mode),
            Document::Sprites(sheet) => sheet.export(mode),
        }
    }
}

impl Snapshot for Document {
    fn snapshot(&self) -> SnapshotRecord {
        match self {
            Document::DirectColor(img) => img.snapshot(),
            Document::Paletted(img) => img.snapshot(),
            Document::Sprites(sheet) => sheet.snapshot(),
        }
    }

    fn restore(&mut self, record: &SnapshotRecord) -> Result<()> {
        match self {
            Document::DirectColor(img) => img.restore(record),
            Document::Paletted(img) => img.restore(record),
            Document::Sprites(sheet) => sheet.restore(record),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::color::Color;
    use crate::image::Dimensions;
    use crate::palette::Palette;
    use crate::sprite::{SpriteSize, TilePos};

    #[test]
    fn test_mode_from_number() {
        assert_eq!(Mode::try_from(3), Ok(Mode::Bitmap3));
        assert_eq!(Mode::try_from(4), Ok(Mode::Bitmap4));
        assert_eq!(Mode::try_from(5), Err(Error::UnsupportedMode(5)));
    }

    #[test]
    fn test_mode4_without_palette_falls_back() {
        let img = RasterImage::new("bg.png", Dimensions::new(2, 2).unwrap());
        let out = img.export(Mode::Bitmap4).unwrap();
        assert!(out.warning.is_some());
        assert!(!out.header.contains("bgPal"));
        assert_eq!(out, {
            let mut direct = img.export(Mode::Bitmap3).unwrap();
            direct.warning = out.warning.clone();
            direct
        });
    }

    #[test]
    fn test_raster_snapshot_restore() {
        let mut img = RasterImage::new("a.png", Dimensions::new(2, 1).unwrap());
        let before = img.snapshot();
        img.set_pixel(0, 0, Color::rgb(1, 2, 3)).unwrap();
        img.restore(&before).unwrap();
        assert_eq!(img.pixel(0, 0).unwrap(), Color::BLACK);
    }

    #[test]
    fn test_restore_rejects_other_kind() {
        let dims = Dimensions::new(2, 1).unwrap();
        let mut img = RasterImage::new("a.png", dims);
        let indexed = IndexedImage::new("b.png", dims, Rc::new(Palette::default()));
        assert_eq!(
            img.restore(&indexed.snapshot()),
            Err(Error::SnapshotMismatch {
                expected: "pixel",
                found: "index"
            })
        );
        assert_eq!(img.file_name, "a.png");
    }

    #[test]
    fn test_indexed_snapshot_keeps_paint_index() {
        let dims = Dimensions::new(2, 2).unwrap();
        let mut img = IndexedImage::new("b.png", dims, Rc::new(Palette::default()));
        img.set_paint_index(9);
        let rec = img.snapshot();
        img.set_paint_index(1);
        img.set_index(0, 0, 4).unwrap();
        img.restore(&rec).unwrap();
        assert_eq!(img.paint_index(), 9);
        assert_eq!(img.index_at(0, 0).unwrap(), 0);
    }

    #[test]
    fn test_document_from_record() {
        let pal = Rc::new(Palette::default());
        let mut sheet = SpriteSheet::new("obj.png", pal.clone());
        sheet.add_sprite(TilePos::new(3, 3), SpriteSize::S16x16).unwrap();
        let doc = Document::from_record(&sheet.snapshot(), Mode::Bitmap4, EditorMode::Sprite, pal.clone()).unwrap();
        assert_eq!(doc.editor_mode(), EditorMode::Sprite);
        let Document::Sprites(restored) = &doc else {
            panic!("expected sprite sheet");
        };
        assert_eq!(restored.sprite_at_tile(4, 4), Some(0));

        let raster = RasterImage::new("a.png", Dimensions::new(1, 1).unwrap());
        assert!(Document::from_record(&raster.snapshot(), Mode::Bitmap4, EditorMode::Bitmap, pal).is_err());
    }

    #[test]
    fn test_from_snapshot_checks_buffer_first() {
        let pal = Rc::new(Palette::default());
        let record = SnapshotRecord {
            file_name: "big.png".to_string(),
            dimensions: Dimensions::new(u32::MAX, u32::MAX).unwrap(),
            data: ImageData::Pixels(vec![]),
        };
        assert!(Document::from_snapshot(&record, pal.clone()).is_err());

        let record = SnapshotRecord {
            file_name: "short.png".to_string(),
            dimensions: Dimensions::new(2, 2).unwrap(),
            data: ImageData::Indices {
                indices: vec![1, 2, 3],
                paint_index: 0,
            },
        };
        assert_eq!(
            Document::from_snapshot(&record, pal).unwrap_err(),
            Error::BufferSizeMismatch { expected: 4, actual: 3 }
        );
    }
}
