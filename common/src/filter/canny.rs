//! Canny edge detection on an already-smoothed image.
//!
//! Gradients come from the 3×3 Sobel pair with replicated borders and are
//! combined as `|gx| + |gy|`. No smoothing is applied here, so callers blur
//! first if they need to. Non-maximum suppression quantises the gradient
//! direction into four sectors; hysteresis grows 8-connected chains from
//! pixels above `high` through pixels above `low`.

use image::{GrayImage, Luma};
use rayon::prelude::*;

use super::kernel::{Border, Plane};

/// tan(22.5°)
const TAN_22_5: f32 = 0.414_213_57;
/// tan(67.5°)
const TAN_67_5: f32 = 2.414_213_6;

const NOT_EDGE: u8 = 0;
const WEAK: u8 = 1;
const STRONG: u8 = 2;

/// `(gx, gy)` of the 3×3 Sobel operator.
pub fn sobel3(image: &GrayImage) -> (Plane, Plane) {
    let plane = Plane::from_gray(image, 1.0);
    let gx = plane.correlate_separable(&[-1.0, 0.0, 1.0], &[1.0, 2.0, 1.0], Border::Replicate);
    let gy = plane.correlate_separable(&[1.0, 2.0, 1.0], &[-1.0, 0.0, 1.0], Border::Replicate);
    (gx, gy)
}

/// Edge map with 255 on edges and 0 elsewhere. Magnitudes must exceed a
/// threshold strictly to count.
pub fn canny(image: &GrayImage, low: f32, high: f32) -> GrayImage {
    let (width, height) = image.dimensions();
    let (w, h) = (width as usize, height as usize);
    if w == 0 || h == 0 {
        return GrayImage::new(width, height);
    }

    let (gx, gy) = sobel3(image);
    let magnitude = gx.zip_with(&gy, |a, b| a.abs() + b.abs());
    let mag = |x: isize, y: isize| -> f32 {
        if x < 0 || y < 0 || x >= w as isize || y >= h as isize {
            0.0
        } else {
            magnitude.data[y as usize * w + x as usize]
        }
    };

    let mut class = vec![NOT_EDGE; w * h];
    class.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        let y = y as isize;
        for (x, out) in row.iter_mut().enumerate() {
            let idx = y as usize * w + x;
            let x = x as isize;
            let m = magnitude.data[idx];
            if m <= low {
                continue;
            }
            let (dx, dy) = (gx.data[idx], gy.data[idx]);
            let (ax, ay) = (dx.abs(), dy.abs());
            let is_max = if ay < ax * TAN_22_5 {
                m > mag(x - 1, y) && m >= mag(x + 1, y)
            } else if ay > ax * TAN_67_5 {
                m > mag(x, y - 1) && m >= mag(x, y + 1)
            } else {
                let s = if (dx < 0.0) != (dy < 0.0) { -1 } else { 1 };
                m > mag(x - s, y - 1) && m > mag(x + s, y + 1)
            };
            if is_max {
                *out = if m > high { STRONG } else { WEAK };
            }
        }
    });

    let mut edges = GrayImage::new(width, height);
    let mut stack: Vec<(usize, usize)> = Vec::new();
    for start in 0..class.len() {
        if class[start] != STRONG || edges.as_raw()[start] != 0 {
            continue;
        }
        stack.push((start % w, start / w));
        edges.put_pixel((start % w) as u32, (start / w) as u32, Luma([255]));
        while let Some((x, y)) = stack.pop() {
            for ny in y.saturating_sub(1)..=(y + 1).min(h - 1) {
                for nx in x.saturating_sub(1)..=(x + 1).min(w - 1) {
                    let n = ny * w + nx;
                    if class[n] != NOT_EDGE && edges.as_raw()[n] == 0 {
                        edges.put_pixel(nx as u32, ny as u32, Luma([255]));
                        stack.push((nx, ny));
                    }
                }
            }
        }
    }
    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::kernel::gaussian_blur;

    fn vertical_step(left: u8, right: u8) -> GrayImage {
        GrayImage::from_fn(40, 30, |x, _| Luma([if x < 20 { left } else { right }]))
    }

    fn edge_columns(edges: &GrayImage, y: u32) -> Vec<u32> {
        (0..edges.width())
            .filter(|&x| edges.get_pixel(x, y)[0] == 255)
            .collect()
    }

    #[test]
    fn flat_image_has_no_edges() {
        let edges = canny(&GrayImage::from_pixel(20, 20, Luma([90])), 50.0, 150.0);
        assert!(edges.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn hard_step_gives_a_one_pixel_line() {
        let edges = canny(&vertical_step(30, 100), 50.0, 150.0);
        for y in 0..30 {
            assert_eq!(edge_columns(&edges, y), vec![19], "row {y}");
        }
    }

    #[test]
    fn blurred_mid_contrast_step_is_still_found() {
        // a 70-level step after the 5x5 binomial blur peaks at 4 * 44 = 176
        let blurred = gaussian_blur(&vertical_step(30, 100), 5, 0.0, 0.0);
        let edges = canny(&blurred, 50.0, 150.0);
        for y in 0..30 {
            assert_eq!(edge_columns(&edges, y).len(), 1, "row {y}");
        }
    }

    #[test]
    fn faint_step_without_strong_pixels_is_ignored() {
        let blurred = gaussian_blur(&vertical_step(30, 50), 5, 0.0, 0.0);
        assert!(canny(&blurred, 50.0, 150.0).pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn weak_pixels_join_only_when_connected_to_strong_ones() {
        // strong step on the top half, weaker step on the bottom half
        let img = GrayImage::from_fn(40, 40, |x, y| {
            let right = if y < 20 { 130 } else { 55 };
            Luma([if x < 20 { 10 } else { right }])
        });
        let edges = canny(&img, 100.0, 300.0);
        // strong half: 4 * 120 = 480; weak half: 4 * 45 = 180, chained from above
        assert_eq!(edge_columns(&edges, 5), vec![19]);
        assert_eq!(edge_columns(&edges, 35), vec![19]);

        let weak_only = GrayImage::from_fn(40, 40, |x, _| Luma([if x < 20 { 10 } else { 55 }]));
        assert!(canny(&weak_only, 100.0, 300.0).pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn empty_image() {
        assert_eq!(canny(&GrayImage::new(0, 0), 50.0, 150.0).dimensions(), (0, 0));
    }
}
