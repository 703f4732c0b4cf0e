use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::point::Point;
use tracing::debug;

use super::canny::canny;
use super::draw::draw_closed_outline;
use super::kernel::gaussian_blur;
use super::morphology::dilate3;
use crate::config::PipelineConfig;

#[derive(Debug, Clone, Copy)]
pub struct ContourMaskParams {
    pub canny_low: f32,
    pub canny_high: f32,
    /// Contours enclosing this area or less are dropped.
    pub min_area: f64,
    pub thickness: u32,
}

impl Default for ContourMaskParams {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

impl From<&PipelineConfig> for ContourMaskParams {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            canny_low: config.canny_low,
            canny_high: config.canny_high,
            min_area: config.min_contour_area,
            thickness: 2,
        }
    }
}

/// Shoelace area of the polygon through `points`.
pub fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice = 0i64;
    let mut prev = points[points.len() - 1];
    for &p in points {
        twice += prev.x as i64 * p.y as i64 - p.x as i64 * prev.y as i64;
        prev = p;
    }
    twice.abs() as f64 / 2.0
}

/// Outermost borders only: holes and anything nested inside another
/// component are skipped.
pub fn external_contours(binary: &GrayImage) -> Vec<Contour<i32>> {
    find_contours::<i32>(binary)
        .into_iter()
        .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
        .collect()
}

/// Blur, detect edges, thicken them, then draw the outline of every large
/// external contour in black on a white canvas of the input's size.
pub fn contour_mask(gray: &GrayImage, params: &ContourMaskParams) -> GrayImage {
    let blurred = gaussian_blur(gray, 5, 0.0, 0.0);
    let edges = dilate3(&canny(&blurred, params.canny_low, params.canny_high));
    let contours = external_contours(&edges);

    let mut mask = GrayImage::from_pixel(gray.width(), gray.height(), Luma([255]));
    let mut kept = 0usize;
    for contour in &contours {
        if polygon_area(&contour.points) > params.min_area {
            draw_closed_outline(&mut mask, &contour.points, params.thickness, Luma([0]));
            kept += 1;
        }
    }
    debug!(found = contours.len(), kept, "contour mask drawn");
    mask
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_rect(width: u32, height: u32, x0: u32, y0: u32, x1: u32, y1: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            let inside = (x0..x1).contains(&x) && (y0..y1).contains(&y);
            Luma([if inside { 255 } else { 0 }])
        })
    }

    #[test]
    fn shoelace_area_of_a_rectangle() {
        let pts = [
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(10, 5),
            Point::new(0, 5),
        ];
        assert_eq!(polygon_area(&pts), 50.0);
        assert_eq!(polygon_area(&pts[..2]), 0.0);
    }

    #[test]
    fn external_contours_skip_holes_and_nested_shapes() {
        // ring with a dot inside its hole
        let mut img = filled_rect(40, 40, 5, 5, 35, 35);
        for y in 10..30 {
            for x in 10..30 {
                img.put_pixel(x, y, Luma([0]));
            }
        }
        img.put_pixel(20, 20, Luma([255]));
        let contours = external_contours(&img);
        assert_eq!(contours.len(), 1);
        assert_eq!(polygon_area(&contours[0].points), 29.0 * 29.0);
    }

    #[test]
    fn blank_image_gives_white_mask() {
        let gray = GrayImage::new(50, 30);
        let mask = contour_mask(&gray, &ContourMaskParams::default());
        assert_eq!(mask.dimensions(), (50, 30));
        assert!(mask.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn mid_contrast_rectangle_is_outlined() {
        let gray = GrayImage::from_fn(200, 150, |x, y| {
            let inside = (50..150).contains(&x) && (40..110).contains(&y);
            Luma([if inside { 100 } else { 30 }])
        });
        let mask = contour_mask(&gray, &ContourMaskParams::default());
        assert_eq!(mask.get_pixel(100, 75)[0], 255);
        for (x, y) in [(49, 75), (150, 75), (100, 39), (100, 110)] {
            let near = (x - 2..=x + 2)
                .any(|xx| (y - 2..=y + 2).any(|yy| mask.get_pixel(xx, yy)[0] == 0));
            assert!(near, "no outline near ({x}, {y})");
        }
    }

    #[test]
    fn large_shape_is_outlined_small_one_is_not() {
        let mut gray = filled_rect(120, 80, 20, 20, 70, 60);
        for y in 30..32 {
            for x in 95..97 {
                gray.put_pixel(x, y, Luma([255]));
            }
        }
        let mask = contour_mask(&gray, &ContourMaskParams::default());
        assert!(mask.pixels().any(|p| p[0] == 0));
        // the 2x2 speck has a tiny contour and leaves its area untouched
        for y in 24..40 {
            for x in 88..105 {
                assert_eq!(mask.get_pixel(x, y)[0], 255, "({x}, {y})");
            }
        }
        // interior of the large rectangle is not filled
        assert_eq!(mask.get_pixel(45, 40)[0], 255);
    }
}
