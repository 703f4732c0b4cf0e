use bordas_common::filter::EdgeMap;
use image::imageops::replace;
use image::{DynamicImage, Rgb, RgbImage};

pub const GRID_COLUMNS: u32 = 3;
pub const GRID_ROWS: u32 = 2;
/// White border around and between panels, in pixels.
pub const GUTTER: u32 = 8;

/// Lay out the colour original and up to five edge maps in a 2×3 grid,
/// left to right then top to bottom. Unused cells stay white.
pub fn compose_grid(original: &DynamicImage, maps: &[EdgeMap]) -> RgbImage {
    let (cell_w, cell_h) = (original.width(), original.height());
    let width = GRID_COLUMNS * cell_w + (GRID_COLUMNS + 1) * GUTTER;
    let height = GRID_ROWS * cell_h + (GRID_ROWS + 1) * GUTTER;
    let mut grid = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));

    let panels = std::iter::once(original.to_rgb8()).chain(
        maps.iter()
            .map(|m| DynamicImage::ImageLuma8(m.image.clone()).to_rgb8()),
    );
    for (cell, panel) in panels.take((GRID_COLUMNS * GRID_ROWS) as usize).enumerate() {
        let (col, row) = (cell as u32 % GRID_COLUMNS, cell as u32 / GRID_COLUMNS);
        let x = GUTTER + col * (cell_w + GUTTER);
        let y = GUTTER + row * (cell_h + GUTTER);
        replace(&mut grid, &panel, x as i64, y as i64);
    }
    grid
}
