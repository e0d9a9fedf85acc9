use anyhow::{bail, Result};
use log::info;

use crate::{
    document::{Document, Mode, Render, Snapshot},
    error::Error,
    image::{Dimensions, IndexedImage, RasterImage},
    message::Message,
    quantize::quantize,
    sprite::SpriteSheet,
    state::EditorState,
    undo::SnapshotRecord,
};

/// What the caller should redraw after a message has been applied.
#[derive(Debug)]
pub enum Refresh {
    None,
    Composite(RasterImage),
}

fn raster_mut(state: &mut EditorState) -> Result<&mut RasterImage> {
    match state.document_mut()? {
        Document::DirectColor(img) => Ok(img),
        _ => bail!("The open image is not a direct-color bitmap."),
    }
}

fn indexed_mut(state: &mut EditorState) -> Result<&mut IndexedImage> {
    match state.document_mut()? {
        Document::Paletted(img) => Ok(img),
        _ => bail!("The open image is not a paletted bitmap."),
    }
}

fn sprite_sheet_mut(state: &mut EditorState) -> Result<&mut SpriteSheet> {
    match state.document_mut()? {
        Document::Sprites(sheet) => Ok(sheet),
        _ => bail!("The open image is not a sprite sheet."),
    }
}

fn push_snapshot(state: &mut EditorState) -> Result<()> {
    let record = state.document()?.snapshot();
    state.history.push(record);
    Ok(())
}

// A record of a different kind (e.g. the image before quantization) replaces
// the open document outright.
fn restore(state: &mut EditorState, record: &SnapshotRecord) -> Result<()> {
    if let Some(doc) = &mut state.document {
        match doc.restore(record) {
            Err(Error::SnapshotMismatch { .. }) => {}
            result => return Ok(result?),
        }
    }
    state.document = Some(Document::from_snapshot(record, state.palette.clone())?);
    Ok(())
}

pub fn update(state: &mut EditorState, message: Message) -> Result<Refresh> {
    let redraw = match message {
        Message::NewImage {
            file_name,
            width,
            height,
            mode,
        } => {
            let dims = Dimensions::new(width, height)?;
            let doc = match mode {
                Mode::Bitmap3 => Document::DirectColor(RasterImage::new(&file_name, dims)),
                Mode::Bitmap4 => {
                    Document::Paletted(IndexedImage::new(&file_name, dims, state.palette.clone()))
                }
            };
            state.open_document(doc);
            true
        }
        Message::NewSpriteSheet(file_name) => {
            let sheet = SpriteSheet::new(&file_name, state.palette.clone());
            state.open_document(Document::Sprites(sheet));
            true
        }
        Message::OpenImage(img) => {
            info!("Opened {} ({}x{})", img.file_name, img.width(), img.height());
            state.open_document(Document::DirectColor(img));
            true
        }
        Message::SetPixel { x, y, color } => {
            raster_mut(state)?.set_pixel(x, y, color)?;
            push_snapshot(state)?;
            true
        }
        Message::SetIndex { x, y, index } => {
            indexed_mut(state)?.set_index(x, y, index)?;
            push_snapshot(state)?;
            true
        }
        Message::SetPaintIndex(index) => {
            // Selection only; the next edit's snapshot records it.
            indexed_mut(state)?.set_paint_index(index);
            false
        }
        Message::Quantize(depth) => {
            let Document::DirectColor(img) = state.document()? else {
                bail!("Only direct-color images can be quantized.");
            };
            let q = quantize(img, depth)?;
            info!(
                "Quantized {} to {} colors in {} iterations",
                img.file_name, q.colors_used, q.iterations
            );
            state.palette = q.palette;
            state.document = Some(Document::Paletted(q.image));
            push_snapshot(state)?;
            true
        }
        Message::SetPaletteColor { index, color } => {
            let pal = state.palette.with_color(index, color);
            state.set_palette(pal);
            true
        }
        Message::LoadPalette(pal) => {
            state.set_palette(pal);
            true
        }
        Message::MergePalette {
            incoming,
            src_row,
            dst_row,
            rows,
        } => {
            let pal = state.palette.merged(&incoming, src_row, dst_row, rows)?;
            state.set_palette(pal);
            true
        }
        Message::AddSprite { position, size } => {
            sprite_sheet_mut(state)?.add_sprite(position, size)?;
            push_snapshot(state)?;
            true
        }
        Message::RemoveSprite(idx) => {
            sprite_sheet_mut(state)?.remove_sprite(idx)?;
            push_snapshot(state)?;
            true
        }
        Message::SetSpritePixel { sprite, x, y, value } => {
            sprite_sheet_mut(state)?.set_sprite_pixel(sprite, x, y, value)?;
            push_snapshot(state)?;
            true
        }
        Message::SetSpritePaletteRow { sprite, row } => {
            sprite_sheet_mut(state)?.set_sprite_palette_row(sprite, row)?;
            push_snapshot(state)?;
            true
        }
        // The pointer only moves once the record is applied.
        Message::Undo => {
            let record = state.history.peek_undo()?.clone();
            restore(state, &record)?;
            state.history.undo()?;
            true
        }
        Message::Redo => {
            let record = state.history.peek_redo()?.clone();
            restore(state, &record)?;
            state.history.redo()?;
            true
        }
    };

    match &state.document {
        Some(doc) if redraw => Ok(Refresh::Composite(doc.render()?)),
        _ => Ok(Refresh::None),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::rc::Rc;

    use super::*;
    use crate::color::Color;
    use crate::palette::Palette;
    use crate::sprite::{SpriteSize, TilePos};
    use crate::state::GlobalConfig;

    fn state() -> EditorState {
        EditorState::new(PathBuf::from("config.json"), GlobalConfig::default())
    }

    fn new_image(state: &mut EditorState, mode: Mode) {
        update(
            state,
            Message::NewImage {
                file_name: "canvas.png".to_string(),
                width: 4,
                height: 4,
                mode,
            },
        )
        .unwrap();
    }

    fn first_pixel(state: &EditorState) -> Color {
        match state.document.as_ref().unwrap() {
            Document::DirectColor(img) => img.pixel(0, 0).unwrap(),
            _ => panic!("expected direct-color image"),
        }
    }

    #[test]
    fn test_draw_undo_redo() {
        let mut state = state();
        new_image(&mut state, Mode::Bitmap3);
        let red = Color::rgb(255, 0, 0);
        let refresh = update(&mut state, Message::SetPixel { x: 0, y: 0, color: red }).unwrap();
        let Refresh::Composite(surface) = refresh else {
            panic!("expected a redraw");
        };
        assert_eq!(surface.pixel(0, 0).unwrap(), red);

        update(&mut state, Message::Undo).unwrap();
        assert_eq!(first_pixel(&state), Color::BLACK);
        assert!(update(&mut state, Message::Undo).is_err());
        update(&mut state, Message::Redo).unwrap();
        assert_eq!(first_pixel(&state), red);
        assert!(update(&mut state, Message::Redo).is_err());
    }

    #[test]
    fn test_out_of_range_pixel_leaves_history() {
        let mut state = state();
        new_image(&mut state, Mode::Bitmap3);
        let result = update(
            &mut state,
            Message::SetPixel {
                x: 4,
                y: 0,
                color: Color::BLACK,
            },
        );
        assert!(result.is_err());
        assert_eq!(state.history.len(), 1);
    }

    #[test]
    fn test_quantize_then_undo() {
        let mut state = state();
        new_image(&mut state, Mode::Bitmap3);
        update(
            &mut state,
            Message::SetPixel {
                x: 1,
                y: 1,
                color: Color::rgb(0, 0, 200),
            },
        )
        .unwrap();
        update(&mut state, Message::Quantize(2)).unwrap();
        assert!(matches!(state.document, Some(Document::Paletted(_))));
        assert_eq!(state.palette.color_at(1), Color::rgb(0, 0, 200));

        update(&mut state, Message::Undo).unwrap();
        assert!(matches!(state.document, Some(Document::DirectColor(_))));
        update(&mut state, Message::Redo).unwrap();
        let Some(Document::Paletted(img)) = &state.document else {
            panic!("expected paletted image");
        };
        assert_eq!(img.index_at(1, 1).unwrap(), 1);
        assert!(Rc::ptr_eq(img.palette(), &state.palette));
    }

    #[test]
    fn test_palette_edits_swap_handle() {
        let mut state = state();
        new_image(&mut state, Mode::Bitmap4);
        let before = state.palette.clone();
        update(
            &mut state,
            Message::SetPaletteColor {
                index: 0,
                color: Color::rgb(1, 2, 3),
            },
        )
        .unwrap();
        assert_eq!(before.color_at(0), Color::BLACK);
        let Some(Document::Paletted(img)) = &state.document else {
            panic!("expected paletted image");
        };
        assert_eq!(img.color_at(0, 0).unwrap(), Color::rgb(1, 2, 3));

        let merge = Message::MergePalette {
            incoming: Palette::default(),
            src_row: 0,
            dst_row: 10,
            rows: 7,
        };
        assert!(update(&mut state, merge).is_err());
        assert_eq!(state.palette.color_at(0), Color::rgb(1, 2, 3));
    }

    #[test]
    fn test_sprite_overlap_through_update() {
        let mut state = state();
        update(&mut state, Message::NewSpriteSheet("obj.png".to_string())).unwrap();
        let add = |x, y, size| Message::AddSprite {
            position: TilePos::new(x, y),
            size,
        };
        update(&mut state, add(0, 0, SpriteSize::S32x32)).unwrap();
        assert!(update(&mut state, add(3, 3, SpriteSize::S8x8)).is_err());
        assert_eq!(state.history.len(), 2);
        update(&mut state, add(4, 0, SpriteSize::S8x8)).unwrap();
        update(&mut state, Message::RemoveSprite(0)).unwrap();
        update(&mut state, Message::Undo).unwrap();
        let Some(Document::Sprites(sheet)) = &state.document else {
            panic!("expected sprite sheet");
        };
        assert_eq!(sheet.sprites().len(), 2);
        assert_eq!(sheet.sprite_at_tile(3, 3), Some(0));
    }

    #[test]
    fn test_message_needs_matching_document() {
        let mut state = state();
        assert!(update(&mut state, Message::SetPaintIndex(3)).is_err());
        new_image(&mut state, Mode::Bitmap3);
        assert!(update(&mut state, Message::SetPaintIndex(3)).is_err());
        assert!(update(&mut state, Message::RemoveSprite(0)).is_err());
    }

    #[test]
    fn test_failed_undo_keeps_pointer() {
        let mut state = state();
        new_image(&mut state, Mode::Bitmap3);
        state.history.clear();
        state.history.push(SnapshotRecord {
            file_name: "canvas.png".to_string(),
            dimensions: Dimensions::new(4, 4).unwrap(),
            data: crate::undo::ImageData::Pixels(vec![0; 3]),
        });
        state.history.push(state.document.as_ref().unwrap().snapshot());
        assert_eq!(state.history.pointer(), Some(1));

        assert!(update(&mut state, Message::Undo).is_err());
        assert_eq!(state.history.pointer(), Some(1));
        assert_eq!(first_pixel(&state), Color::BLACK);
        assert!(update(&mut state, Message::Redo).is_err());
    }
}
