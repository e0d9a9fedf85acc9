//! Palette reduction by k-means clustering in RGB space.
//!
//! Initial centroids are chosen by binary-searching the largest minimum
//! spacing `d` for which a greedy scan of the image's unique colors still
//! yields `k` picks.
use std::rc::Rc;

use hashbrown::HashMap;
use itertools::Itertools;
use log::debug;

use crate::color::{rgb_distance_sq, Color, ColorRGB};
use crate::error::{Error, Result};
use crate::image::{IndexedImage, RasterImage};
use crate::palette::{Palette, SharedPalette, PALETTE_SIZE};

pub const MAX_ITERATIONS: usize = 1000;

// Rounded-up diagonal of the 8-bit RGB cube.
const MAX_DISTANCE: u32 = 442;

pub struct Quantized {
    pub palette: SharedPalette,
    pub image: IndexedImage,
    /// Number of leading palette slots in use.
    pub colors_used: usize,
    pub iterations: usize,
}

/// Reduces `image` to at most `depth` colors. The source image is untouched.
pub fn quantize(image: &RasterImage, depth: u16) -> Result<Quantized> {
    if depth < 1 || depth as usize > PALETTE_SIZE {
        return Err(Error::InvalidDepth(depth));
    }

    let pixels: Vec<ColorRGB> = image.pixels().map(Color::to_rgb).collect();
    let unique: Vec<ColorRGB> = pixels.iter().copied().unique().collect();
    // Dimensions are never zero, so there is always at least one color.
    let k = (depth as usize).min(unique.len());

    let seeds = select_centroids(&unique, k);
    let (centroids, assignment, iterations) = kmeans(&unique, seeds);
    debug!(
        "Quantized {}: {} unique colors, k = {}, {} iterations",
        image.file_name,
        unique.len(),
        k,
        iterations
    );

    // Order clusters by member count, largest first; empty clusters get no slot.
    let mut counts = vec![0usize; centroids.len()];
    for &c in &assignment {
        counts[c] += 1;
    }
    let order: Vec<usize> = (0..centroids.len())
        .filter(|&c| counts[c] > 0)
        .sorted_by(|&a, &b| counts[b].cmp(&counts[a]).then(a.cmp(&b)))
        .collect();
    let mut slot_of = vec![0u8; centroids.len()];
    for (slot, &c) in order.iter().enumerate() {
        slot_of[c] = slot as u8;
    }
    let palette_colors: Vec<Color> = order.iter().map(|&c| Color::from_rgb(centroids[c])).collect();
    let palette = Rc::new(Palette::from_colors(&palette_colors));

    let lookup: HashMap<ColorRGB, u8> = unique
        .iter()
        .zip(&assignment)
        .map(|(&rgb, &c)| (rgb, slot_of[c]))
        .collect();
    let indices: Vec<u8> = pixels.iter().map(|rgb| lookup[rgb]).collect();
    let indexed = IndexedImage::from_indices(&image.file_name, image.dimensions(), indices, palette.clone())?;

    Ok(Quantized {
        palette,
        image: indexed,
        colors_used: order.len(),
        iterations,
    })
}

/// Greedy scan: keep the first color, then every color at least `min_dist`
/// away from the previously kept one.
fn greedy_pick(unique: &[ColorRGB], min_dist: u32) -> Vec<ColorRGB> {
    let threshold = min_dist * min_dist;
    let mut picks = vec![unique[0]];
    for &c in &unique[1..] {
        if rgb_distance_sq(c, picks[picks.len() - 1]) >= threshold {
            picks.push(c);
        }
    }
    picks
}

/// Picks `k` starting centroids from the unique colors.
pub(crate) fn select_centroids(unique: &[ColorRGB], k: usize) -> Vec<ColorRGB> {
    if k == 1 || k == unique.len() {
        return unique[..k].to_vec();
    }
    // d = 0 always keeps every color, so the search is never empty.
    let (mut lo, mut hi) = (0, MAX_DISTANCE);
    while lo < hi {
        let mid = (lo + hi + 1) / 2;
        if greedy_pick(unique, mid).len() >= k {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    let mut picks = greedy_pick(unique, lo);
    picks.truncate(k);
    picks
}

fn nearest(c: ColorRGB, centroids: &[ColorRGB]) -> usize {
    let mut best = 0;
    let mut best_dist = u32::MAX;
    for (i, &centroid) in centroids.iter().enumerate() {
        let d = rgb_distance_sq(c, centroid);
        // Ties go to the later centroid.
        if d <= best_dist {
            best = i;
            best_dist = d;
        }
    }
    best
}

fn kmeans(points: &[ColorRGB], mut centroids: Vec<ColorRGB>) -> (Vec<ColorRGB>, Vec<usize>, usize) {
    let mut assignment = vec![0; points.len()];
    let mut iterations = 0;
    while iterations < MAX_ITERATIONS {
        iterations += 1;
        for (a, &p) in assignment.iter_mut().zip(points) {
            *a = nearest(p, &centroids);
        }

        let mut sums = vec![(0u64, 0u64, 0u64, 0u64); centroids.len()];
        for (&c, &p) in assignment.iter().zip(points) {
            let s = &mut sums[c];
            s.0 += p.0 as u64;
            s.1 += p.1 as u64;
            s.2 += p.2 as u64;
            s.3 += 1;
        }

        let mut changed = false;
        for (centroid, &(r, g, b, n)) in centroids.iter_mut().zip(&sums) {
            if n == 0 {
                continue;
            }
            let mean = (channel_mean(r, n), channel_mean(g, n), channel_mean(b, n));
            if mean != *centroid {
                *centroid = mean;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    (centroids, assignment, iterations)
}

fn channel_mean(sum: u64, n: u64) -> u8 {
    (sum as f64 / n as f64).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Dimensions;

    fn raster(width: u32, height: u32, colors: &[Color]) -> RasterImage {
        let data = colors.iter().flat_map(|c| [c.r, c.g, c.b, c.a]).collect();
        RasterImage::from_rgba("test.png", Dimensions::new(width, height).unwrap(), data).unwrap()
    }

    fn gradient() -> RasterImage {
        let colors: Vec<Color> = (0..64u32)
            .map(|i| Color::rgb((i * 4) as u8, (255 - i * 3) as u8, ((i * 37) % 256) as u8))
            .collect();
        raster(8, 8, &colors)
    }

    #[test]
    fn test_invalid_depth() {
        let img = gradient();
        assert!(matches!(quantize(&img, 0), Err(Error::InvalidDepth(0))));
        assert!(matches!(quantize(&img, 257), Err(Error::InvalidDepth(257))));
    }

    #[test]
    fn test_red_green_blue_at_depth_two() {
        let img = raster(
            2,
            2,
            &[
                Color::rgb(255, 0, 0),
                Color::rgb(255, 0, 0),
                Color::rgb(0, 255, 0),
                Color::rgb(0, 0, 255),
            ],
        );
        let q = quantize(&img, 2).unwrap();
        assert_eq!(q.colors_used, 2);
        assert_eq!(q.palette.distinct_non_black(), 2);
        let idx = q.image.indices();
        assert_eq!(idx[0], idx[1]);
        assert_ne!(idx[0], idx[2]);
        assert_eq!(idx[2], idx[3]);
        assert_eq!(q.palette.color_at(idx[0]), Color::rgb(255, 0, 0));
        assert_eq!(q.palette.color_at(idx[2]), Color::rgb(0, 128, 128));
    }

    #[test]
    fn test_palette_invariants_across_depths() {
        let img = gradient();
        let unique = img.pixels().map(Color::to_rgb).unique().count();
        for depth in [1u16, 2, 3, 7, 16, 63, 64, 65, 256] {
            let q = quantize(&img, depth).unwrap();
            let bound = (depth as usize).min(unique);
            assert_eq!(q.palette.colors().len(), 256);
            assert!(q.palette.distinct_non_black() <= bound);
            assert!(q.colors_used <= bound);
            assert!(q.image.indices().iter().all(|&i| (i as usize) < q.colors_used));
            assert_eq!(q.image.indices().len(), 64);
        }
    }

    #[test]
    fn test_exact_when_depth_covers_all_colors() {
        let img = gradient();
        let q = quantize(&img, 256).unwrap();
        let rendered = q.image.to_raster();
        assert_eq!(rendered.data(), img.data());
    }

    #[test]
    fn test_single_color() {
        let img = raster(2, 1, &[Color::rgb(9, 9, 9), Color::rgba(9, 9, 9, 0)]);
        let q = quantize(&img, 16).unwrap();
        assert_eq!(q.colors_used, 1);
        assert_eq!(q.palette.color_at(0), Color::rgb(9, 9, 9));
        assert_eq!(q.image.indices(), &[0, 0]);
    }

    #[test]
    fn test_centroid_seeds_are_spread() {
        let unique = vec![(0, 0, 0), (1, 1, 1), (2, 2, 2), (255, 255, 255)];
        assert_eq!(select_centroids(&unique, 2), vec![(0, 0, 0), (255, 255, 255)]);
        assert_eq!(select_centroids(&unique, 1), vec![(0, 0, 0)]);
        assert_eq!(select_centroids(&unique, 4), unique);
    }

    #[test]
    fn test_deterministic() {
        let img = gradient();
        let a = quantize(&img, 12).unwrap();
        let b = quantize(&img, 12).unwrap();
        assert_eq!(a.palette, b.palette);
        assert_eq!(a.image.indices(), b.image.indices());
    }
}
