//! Binary cleanup sequences shared by every edge filter.
//!
//! 3×3 operations use imageproc's distance-transform morphology with the
//! chessboard norm. imageproc has no even-sized structuring elements, so the
//! 2×2 steps are done here with the window anchored at its lower-right cell.

use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::filter::median_filter;
use imageproc::morphology::{close, dilate, erode, open};

/// Apply `pick` over the window covering offsets -1..=0 on both axes.
/// Samples outside the image are skipped.
fn window2(image: &GrayImage, pick: fn(u8, u8) -> u8) -> GrayImage {
    let (width, height) = image.dimensions();
    let span = |v: u32| [Some(v), v.checked_sub(1)];
    GrayImage::from_fn(width, height, |x, y| {
        let mut v = image.get_pixel(x, y)[0];
        for yy in span(y).into_iter().flatten() {
            for xx in span(x).into_iter().flatten() {
                v = pick(v, image.get_pixel(xx, yy)[0]);
            }
        }
        Luma([v])
    })
}

pub fn erode2(image: &GrayImage) -> GrayImage {
    window2(image, u8::min)
}

pub fn dilate2(image: &GrayImage) -> GrayImage {
    window2(image, u8::max)
}

/// Erode then dilate over the same 2×2 window. Both steps lean the same
/// way, so surviving shapes move one pixel right and down.
pub fn open2(image: &GrayImage) -> GrayImage {
    dilate2(&erode2(image))
}

pub fn dilate3(image: &GrayImage) -> GrayImage {
    dilate(image, Norm::LInf, 1)
}

pub fn erode3(image: &GrayImage) -> GrayImage {
    erode(image, Norm::LInf, 1)
}

/// Close then open with a 3×3 square: fills pinholes, then drops specks.
pub fn denoise(image: &GrayImage) -> GrayImage {
    open(&close(image, Norm::LInf, 1), Norm::LInf, 1)
}

/// Cosmetic pass: open 2×2, dilate 3×3, erode 2×2, median 3×3.
pub fn clean_edges(image: &GrayImage) -> GrayImage {
    let opened = open2(image);
    let thickened = dilate3(&opened);
    let thinned = erode2(&thickened);
    median_filter(&thinned, 1, 1)
}

pub fn invert(image: &GrayImage) -> GrayImage {
    let mut out = image.clone();
    image::imageops::invert(&mut out);
    out
}

/// Tail shared by the gradient filters: dilate, denoise, clean, then invert
/// so edges come out dark on a light background.
pub fn finish_gradient_map(binary: &GrayImage) -> GrayImage {
    invert(&clean_edges(&denoise(&dilate3(binary))))
}
