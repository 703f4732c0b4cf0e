use image::{GrayImage, Luma};
use imageproc::drawing::draw_line_segment_mut;
use imageproc::point::Point;

/// Draw a segment `thickness` pixels wide by stamping shifted copies of the
/// one-pixel line around it. Even widths put the extra pixel above and to
/// the left. Parts outside the canvas are clipped.
pub fn draw_thick_segment(
    canvas: &mut GrayImage,
    start: (i32, i32),
    end: (i32, i32),
    thickness: u32,
    color: Luma<u8>,
) {
    let thickness = thickness.max(1) as i32;
    let offsets = -(thickness / 2)..thickness - thickness / 2;
    for dy in offsets.clone() {
        for dx in offsets.clone() {
            draw_line_segment_mut(
                canvas,
                ((start.0 + dx) as f32, (start.1 + dy) as f32),
                ((end.0 + dx) as f32, (end.1 + dy) as f32),
                color,
            );
        }
    }
}

/// Draw the closed outline through `points`.
pub fn draw_closed_outline(
    canvas: &mut GrayImage,
    points: &[Point<i32>],
    thickness: u32,
    color: Luma<u8>,
) {
    let Some(last) = points.last() else {
        return;
    };
    let mut prev = (last.x, last.y);
    for p in points {
        draw_thick_segment(canvas, prev, (p.x, p.y), thickness, color);
        prev = (p.x, p.y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thick_segment_is_two_rows_tall() {
        let mut canvas = GrayImage::new(10, 6);
        draw_thick_segment(&mut canvas, (1, 2), (8, 2), 2, Luma([255]));
        for x in 1..=8 {
            assert_eq!(canvas.get_pixel(x, 1)[0], 255);
            assert_eq!(canvas.get_pixel(x, 2)[0], 255);
        }
        assert_eq!(canvas.get_pixel(4, 0)[0], 0);
        assert_eq!(canvas.get_pixel(4, 3)[0], 0);
    }

    #[test]
    fn odd_thickness_is_centred_on_the_line() {
        let mut canvas = GrayImage::new(12, 9);
        draw_thick_segment(&mut canvas, (4, 1), (4, 7), 3, Luma([255]));
        let lit: Vec<u32> = (0..12).filter(|&x| canvas.get_pixel(x, 4)[0] == 255).collect();
        assert_eq!(lit, vec![3, 4, 5]);
    }

    #[test]
    fn outline_is_clipped_to_canvas() {
        let mut canvas = GrayImage::new(5, 5);
        let points = [Point::new(-3, -3), Point::new(10, -3), Point::new(10, 10)];
        draw_closed_outline(&mut canvas, &points, 2, Luma([255]));
        assert_eq!(canvas.dimensions(), (5, 5));
    }

    #[test]
    fn single_point_outline_marks_the_point() {
        let mut canvas = GrayImage::new(5, 5);
        draw_closed_outline(&mut canvas, &[Point::new(2, 2)], 1, Luma([255]));
        assert_eq!(canvas.get_pixel(2, 2)[0], 255);
    }
}
