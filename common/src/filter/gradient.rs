//! Gradient-magnitude edge filters.
//!
//! Two families are provided. [`Sobel5Filter`] works on raw intensities with a
//! 5-tap aperture and normalises the magnitude against its maximum before a
//! `u8` threshold. [`NormalizedGradientFilter`] scales intensities to `[0, 1]`
//! first, uses 3-tap kernels, and thresholds the RMS of the two directional
//! responses directly.

use image::{GrayImage, Luma};

use super::kernel::{Border, Plane};
use super::morphology::finish_gradient_map;
use super::traits::EdgeFilter;

const SOBEL5_DERIV: [f32; 5] = [-1.0, -2.0, 0.0, 2.0, 1.0];
const SOBEL5_SMOOTH: [f32; 5] = [1.0, 4.0, 6.0, 4.0, 1.0];

const EDGE3: [f32; 3] = [1.0, 0.0, -1.0];
const SOBEL3_SMOOTH: [f32; 3] = [0.25, 0.5, 0.25];
const PREWITT3_SMOOTH: [f32; 3] = [1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0];

/// L2 magnitude of the 5×5 Sobel derivatives on raw intensities.
pub fn sobel5_magnitude(image: &GrayImage) -> Plane {
    let src = Plane::from_gray(image, 1.0);
    let gx = src.correlate_separable(&SOBEL5_DERIV, &SOBEL5_SMOOTH, Border::Reflect101);
    let gy = src.correlate_separable(&SOBEL5_SMOOTH, &SOBEL5_DERIV, Border::Reflect101);
    gx.zip_with(&gy, f32::hypot)
}

/// Rescale so the strongest response maps to 255, truncating toward zero.
/// A field with no response at all maps to black.
pub fn scale_to_u8(magnitude: &Plane) -> GrayImage {
    let max = magnitude.max();
    if max <= 0.0 {
        return GrayImage::new(magnitude.width, magnitude.height);
    }
    GrayImage::from_fn(magnitude.width, magnitude.height, |x, y| {
        let v = magnitude.data[(y * magnitude.width + x) as usize];
        Luma([(255.0 * (v / max)) as u8])
    })
}

/// White where `v > threshold`, black elsewhere.
pub fn threshold_u8(image: &GrayImage, threshold: u8) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([if image.get_pixel(x, y)[0] > threshold { 255 } else { 0 }])
    })
}

/// White where `v > threshold`, black elsewhere.
pub fn threshold_plane(plane: &Plane, threshold: f32) -> GrayImage {
    GrayImage::from_fn(plane.width, plane.height, |x, y| {
        let v = plane.data[(y * plane.width + x) as usize];
        Luma([if v > threshold { 255 } else { 0 }])
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Sobel,
    Prewitt,
}

impl Operator {
    fn smoothing(self) -> &'static [f32; 3] {
        match self {
            Operator::Sobel => &SOBEL3_SMOOTH,
            Operator::Prewitt => &PREWITT3_SMOOTH,
        }
    }
}

/// RMS gradient magnitude on `[0, 1]` intensities with a 3×3 operator and
/// half-sample symmetric borders.
pub fn normalized_magnitude(image: &GrayImage, operator: Operator) -> Plane {
    let src = Plane::from_gray(image, 1.0 / 255.0);
    let smooth = operator.smoothing();
    let gx = src.correlate_separable(&EDGE3, smooth, Border::Reflect);
    let gy = src.correlate_separable(smooth, &EDGE3, Border::Reflect);
    gx.zip_with(&gy, |a, b| ((a * a + b * b) / 2.0).sqrt())
}

pub struct Sobel5Filter {
    pub threshold: u8,
}

impl Default for Sobel5Filter {
    fn default() -> Self {
        Self { threshold: 35 }
    }
}

impl EdgeFilter for Sobel5Filter {
    fn apply(&self, image: &GrayImage) -> GrayImage {
        let scaled = scale_to_u8(&sobel5_magnitude(image));
        finish_gradient_map(&threshold_u8(&scaled, self.threshold))
    }

    fn name(&self) -> &str {
        "Sobel 5x5"
    }
}

pub struct NormalizedGradientFilter {
    operator: Operator,
    threshold: f32,
}

impl NormalizedGradientFilter {
    pub fn sobel() -> Self {
        Self {
            operator: Operator::Sobel,
            threshold: 0.04,
        }
    }

    pub fn prewitt() -> Self {
        Self {
            operator: Operator::Prewitt,
            threshold: 0.04,
        }
    }
}

impl EdgeFilter for NormalizedGradientFilter {
    fn apply(&self, image: &GrayImage) -> GrayImage {
        let magnitude = normalized_magnitude(image, self.operator);
        finish_gradient_map(&threshold_plane(&magnitude, self.threshold))
    }

    fn name(&self) -> &str {
        match self.operator {
            Operator::Sobel => "Sobel (normalized)",
            Operator::Prewitt => "Prewitt",
        }
    }
}
