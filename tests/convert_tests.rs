use gba_bitmap_studio::{
    color::Color,
    document::{Document, Export, Mode, Render},
    export,
    image::{Dimensions, RasterImage},
    import,
    quantize::quantize,
};

fn stripes() -> RasterImage {
    let dims = Dimensions::new(8, 2).unwrap();
    let mut img = RasterImage::new("stripes.png", dims);
    let colors = [
        Color::rgb(255, 0, 0),
        Color::rgb(250, 4, 4),
        Color::rgb(0, 0, 255),
        Color::rgb(4, 4, 250),
    ];
    for y in 0..2 {
        for x in 0..8 {
            img.set_pixel(x, y, colors[(x / 2) as usize]).unwrap();
        }
    }
    img
}

#[test]
fn test_png_to_mode4_source() {
    let bytes = import::encode_png(&stripes()).unwrap();
    let raster = import::decode_png("stripes.png", &bytes).unwrap();
    let q = quantize(&raster, 2).unwrap();
    assert_eq!(q.colors_used, 2);

    let doc = Document::Paletted(q.image);
    let out = doc.export(Mode::Bitmap4).unwrap();
    assert_eq!(out.name, "stripes");
    assert!(out.warning.is_none());
    assert!(out.header.contains("#define stripesBitmapLen 16\n"));
    assert!(out.header.contains("#define stripesWidth 8\n"));
    assert!(out.header.contains("#define stripesHeight 2\n"));

    // Near-identical reds and blues collapse to one slot each.
    let surface = doc.render().unwrap();
    assert_eq!(surface.pixel(0, 0).unwrap(), surface.pixel(3, 1).unwrap());
    assert_eq!(surface.pixel(4, 0).unwrap(), surface.pixel(7, 1).unwrap());
    assert_ne!(surface.pixel(0, 0).unwrap(), surface.pixel(4, 0).unwrap());

    let words = export::pack_indexed(doc_indices(&doc));
    assert_eq!(words.len(), 8);
    assert_eq!(words[0] >> 8, words[0] & 0xFF);
}

fn doc_indices(doc: &Document) -> &[u8] {
    match doc {
        Document::Paletted(img) => img.indices(),
        _ => panic!("expected paletted image"),
    }
}

#[test]
fn test_mode3_source_from_png() {
    let bytes = import::encode_png(&stripes()).unwrap();
    let raster = import::decode_png("stripes.png", &bytes).unwrap();
    let out = Document::DirectColor(raster).export(Mode::Bitmap3).unwrap();
    assert!(out.source.starts_with("//\n// stripes (8x2 mode 3 bitmap)\n//\n"));
    assert!(out.source.contains("stripesBitmap[16]"));
    assert!(out.source.contains("0x001F,0x001F,0x001F,0x001F,0x7C00,0x7C00,0x7C00,0x7C00,\n"));
    assert!(out.header.contains("#define stripesBitmapLen 32\n"));
}

#[test]
fn test_paletted_export_as_mode3() {
    let q = quantize(&stripes(), 4).unwrap();
    let out = q.image.export(Mode::Bitmap3).unwrap();
    assert!(out.header.contains("stripesBitmap[16]"));
    assert!(!out.header.contains("Pal"));
}
