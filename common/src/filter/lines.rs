//! Straight-segment detection with a progressive probabilistic Hough
//! transform, and the edge filter built on it.
//!
//! Edge pixels are visited in a shuffled order. Each visit votes for every
//! line through the pixel. As soon as one accumulator bin reaches the vote
//! threshold, the corresponding line is followed in both directions through
//! the edge mask, bridging gaps of up to `max_line_gap` pixels. Pixels swept
//! by that walk are removed from the mask; when the walk yields a segment of
//! at least `min_line_length`, their votes are withdrawn too, so one physical
//! line is reported once.

use image::{GrayImage, Luma};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::f32::consts::PI;
use tracing::debug;

use super::canny::canny;
use super::draw::draw_thick_segment;
use super::morphology::{clean_edges, dilate3, erode3, invert};
use super::traits::EdgeFilter;

/// Fixed-point precision used while stepping along a candidate line.
const SHIFT: u32 = 16;

/// Seed for the visiting order, so repeated runs give identical output.
const VISIT_SEED: u64 = 0xFFFF_FFFF_FFFF_FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub start: (i32, i32),
    pub end: (i32, i32),
}

#[derive(Debug, Clone, Copy)]
pub struct HoughParams {
    /// Distance resolution of the accumulator, in pixels.
    pub rho: f32,
    /// Angle resolution of the accumulator, in radians.
    pub theta: f32,
    pub threshold: u32,
    pub min_line_length: u32,
    pub max_line_gap: u32,
    pub max_lines: usize,
}

impl Default for HoughParams {
    fn default() -> Self {
        Self {
            rho: 1.0,
            theta: PI / 180.0,
            threshold: 50,
            min_line_length: 50,
            max_line_gap: 10,
            max_lines: usize::MAX,
        }
    }
}

pub fn probabilistic_hough(edges: &GrayImage, params: &HoughParams) -> Vec<Segment> {
    let (width, height) = edges.dimensions();
    let (w, h) = (width as i32, height as i32);
    if w == 0 || h == 0 {
        return Vec::new();
    }

    let irho = 1.0 / params.rho;
    let num_angle = ((PI / params.theta).round() as usize).max(1);
    let num_rho = (((w + h) * 2 + 1) as f32 / params.rho).round() as usize;
    let rho_offset = (num_rho as i32 - 1) / 2;
    let trig: Vec<(f32, f32)> = (0..num_angle)
        .map(|n| {
            let angle = n as f32 * params.theta;
            (angle.cos() * irho, angle.sin() * irho)
        })
        .collect();
    let bin = |x: i32, y: i32, n: usize| -> usize {
        let (c, s) = trig[n];
        n * num_rho + ((x as f32 * c + y as f32 * s).round() as i32 + rho_offset) as usize
    };

    let mut accum = vec![0i32; num_angle * num_rho];
    let mut mask = vec![false; width as usize * height as usize];
    let mut points = Vec::new();
    for (x, y, p) in edges.enumerate_pixels() {
        if p[0] != 0 {
            mask[y as usize * w as usize + x as usize] = true;
            points.push((x as i32, y as i32));
        }
    }
    let mut rng = StdRng::seed_from_u64(VISIT_SEED);
    points.shuffle(&mut rng);

    let threshold = params.threshold as i32;
    let gap_limit = params.max_line_gap as i32;
    let min_length = params.min_line_length as i32;
    let mut segments = Vec::new();

    for &(x, y) in &points {
        if !mask[y as usize * w as usize + x as usize] {
            continue;
        }

        let mut max_val = threshold - 1;
        let mut max_n = 0;
        for n in 0..num_angle {
            let cell = &mut accum[bin(x, y, n)];
            *cell += 1;
            if *cell > max_val {
                max_val = *cell;
                max_n = n;
            }
        }
        if max_val < threshold {
            continue;
        }

        // Step one pixel along the major axis and a fixed-point fraction
        // along the minor one. i64 keeps the shifted coordinate in range on
        // wide images.
        let (cos_n, sin_n) = trig[max_n];
        let (a, b) = (-sin_n, cos_n);
        let (mut x0, mut y0) = (x as i64, y as i64);
        let x_major = a.abs() > b.abs();
        let (dx0, dy0): (i64, i64) = if x_major {
            y0 = (y0 << SHIFT) + (1 << (SHIFT - 1));
            (
                if a > 0.0 { 1 } else { -1 },
                (b as f64 * (1i64 << SHIFT) as f64 / a.abs() as f64).round() as i64,
            )
        } else {
            x0 = (x0 << SHIFT) + (1 << (SHIFT - 1));
            (
                (a as f64 * (1i64 << SHIFT) as f64 / b.abs() as f64).round() as i64,
                if b > 0.0 { 1 } else { -1 },
            )
        };
        let pixel = |px: i64, py: i64| -> (i32, i32) {
            if x_major {
                (px as i32, (py >> SHIFT) as i32)
            } else {
                ((px >> SHIFT) as i32, py as i32)
            }
        };
        let direction = |k: usize| if k == 0 { (dx0, dy0) } else { (-dx0, -dy0) };

        let mut line_end = [(x, y); 2];
        for (k, end) in line_end.iter_mut().enumerate() {
            let (dx, dy) = direction(k);
            let (mut px, mut py) = (x0, y0);
            let mut gap = 0;
            loop {
                let (j, i) = pixel(px, py);
                if j < 0 || j >= w || i < 0 || i >= h {
                    break;
                }
                if mask[i as usize * w as usize + j as usize] {
                    gap = 0;
                    *end = (j, i);
                } else {
                    gap += 1;
                    if gap > gap_limit {
                        break;
                    }
                }
                px += dx;
                py += dy;
            }
        }

        let good_line = (line_end[1].0 - line_end[0].0).abs() >= min_length
            || (line_end[1].1 - line_end[0].1).abs() >= min_length;

        for (k, &end) in line_end.iter().enumerate() {
            let (dx, dy) = direction(k);
            let (mut px, mut py) = (x0, y0);
            loop {
                let (j, i) = pixel(px, py);
                let idx = i as usize * w as usize + j as usize;
                if mask[idx] {
                    if good_line {
                        for n in 0..num_angle {
                            accum[bin(j, i, n)] -= 1;
                        }
                    }
                    mask[idx] = false;
                }
                if (j, i) == end {
                    break;
                }
                px += dx;
                py += dy;
            }
        }

        if good_line {
            segments.push(Segment {
                start: line_end[0],
                end: line_end[1],
            });
            if segments.len() >= params.max_lines {
                break;
            }
        }
    }

    debug!(
        edge_pixels = points.len(),
        segments = segments.len(),
        "probabilistic hough complete"
    );
    segments
}

/// Rasterise detected straight segments, joined and cleaned, dark on light.
pub struct ConnectedLinesFilter {
    pub canny_low: f32,
    pub canny_high: f32,
    pub hough: HoughParams,
    pub thickness: u32,
}

impl Default for ConnectedLinesFilter {
    fn default() -> Self {
        Self {
            canny_low: 50.0,
            canny_high: 150.0,
            hough: HoughParams::default(),
            thickness: 2,
        }
    }
}

impl EdgeFilter for ConnectedLinesFilter {
    fn apply(&self, image: &GrayImage) -> GrayImage {
        let edges = canny(image, self.canny_low, self.canny_high);
        let mut canvas = GrayImage::new(image.width(), image.height());
        for segment in probabilistic_hough(&edges, &self.hough) {
            draw_thick_segment(
                &mut canvas,
                segment.start,
                segment.end,
                self.thickness,
                Luma([255]),
            );
        }
        let joined = erode3(&dilate3(&canvas));
        invert(&clean_edges(&joined))
    }

    fn name(&self) -> &str {
        "Connected lines"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canvas_with_line(width: u32, height: u32, start: (i32, i32), end: (i32, i32)) -> GrayImage {
        let mut canvas = GrayImage::new(width, height);
        draw_thick_segment(&mut canvas, start, end, 1, Luma([255]));
        canvas
    }

    fn span(segment: &Segment) -> i32 {
        (segment.end.0 - segment.start.0)
            .abs()
            .max((segment.end.1 - segment.start.1).abs())
    }

    #[test]
    fn finds_a_horizontal_line() {
        let edges = canvas_with_line(120, 40, (10, 20), (109, 20));
        let segments = probabilistic_hough(&edges, &HoughParams::default());
        assert_eq!(segments.len(), 1);
        let s = segments[0];
        assert_eq!(s.start.1, 20);
        assert_eq!(s.end.1, 20);
        assert_eq!(span(&s), 99);
    }

    #[test]
    fn finds_a_diagonal_line() {
        let edges = canvas_with_line(100, 100, (5, 5), (90, 90));
        let segments = probabilistic_hough(&edges, &HoughParams::default());
        assert!(!segments.is_empty());
        assert!(segments.iter().any(|s| span(s) >= 80));
    }

    #[test]
    fn ignores_short_segments() {
        let edges = canvas_with_line(120, 40, (10, 20), (40, 20));
        assert!(probabilistic_hough(&edges, &HoughParams::default()).is_empty());
    }

    #[test]
    fn bridges_small_gaps() {
        let mut edges = canvas_with_line(140, 30, (5, 15), (60, 15));
        draw_thick_segment(&mut edges, (66, 15), (130, 15), 1, Luma([255]));
        let segments = probabilistic_hough(&edges, &HoughParams::default());
        assert_eq!(segments.len(), 1);
        assert_eq!(span(&segments[0]), 125);
    }

    #[test]
    fn vertical_line_far_from_the_origin() {
        // x << 16 no longer fits in an i32 here
        let edges = canvas_with_line(33_000, 120, (32_900, 5), (32_900, 105));
        let segments = probabilistic_hough(&edges, &HoughParams::default());
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start.0, 32_900);
        assert_eq!(segments[0].end.0, 32_900);
        assert_eq!(span(&segments[0]), 100);
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(probabilistic_hough(&GrayImage::new(0, 0), &HoughParams::default()).is_empty());
        assert!(probabilistic_hough(&GrayImage::new(30, 30), &HoughParams::default()).is_empty());
    }

    #[test]
    fn connected_lines_on_blank_image_is_white() {
        let out = ConnectedLinesFilter::default().apply(&GrayImage::from_pixel(64, 48, Luma([80])));
        assert_eq!(out.dimensions(), (64, 48));
        assert!(out.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn connected_lines_marks_a_long_boundary() {
        let img = GrayImage::from_fn(120, 80, |_, y| Luma([if y < 40 { 30 } else { 220 }]));
        let out = ConnectedLinesFilter::default().apply(&img);
        assert_eq!(out.dimensions(), (120, 80));
        assert!(out.pixels().any(|p| p[0] == 0));
        assert_eq!(out.get_pixel(60, 5)[0], 255);
    }
}
