use image::{GrayImage, Luma};
use rayon::prelude::*;

/// How samples outside the image are synthesised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Border {
    /// `gfedcb|abcdefgh|gfedcba`, the edge sample is not repeated.
    Reflect101,
    /// `fedcba|abcdefgh|hgfedcb`, the edge sample is repeated.
    Reflect,
    /// `aaaaaa|abcdefgh|hhhhhhh`
    Replicate,
}

fn reflect_index(i: isize, len: usize, border: Border) -> usize {
    let n = len as isize;
    if n == 1 {
        return 0;
    }
    if border == Border::Replicate {
        return i.clamp(0, n - 1) as usize;
    }
    let mut i = i;
    loop {
        if i < 0 {
            i = match border {
                Border::Reflect101 => -i,
                Border::Reflect | Border::Replicate => -i - 1,
            };
        } else if i >= n {
            i = match border {
                Border::Reflect101 => 2 * n - 2 - i,
                Border::Reflect | Border::Replicate => 2 * n - 1 - i,
            };
        } else {
            return i as usize;
        }
    }
}

/// Row-major `f32` samples, used for intermediate results that need sign or
/// range beyond `u8`.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    pub width: u32,
    pub height: u32,
    pub data: Vec<f32>,
}

impl Plane {
    pub fn from_gray(image: &GrayImage, scale: f32) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            data: image.as_raw().iter().map(|&v| v as f32 * scale).collect(),
        }
    }

    /// Correlate with `kx` along rows, then `ky` along columns. Both kernels
    /// must have odd length; the centre tap is aligned with the output pixel.
    pub fn correlate_separable(&self, kx: &[f32], ky: &[f32], border: Border) -> Plane {
        let w = self.width as usize;
        let h = self.height as usize;
        if w == 0 || h == 0 {
            return self.clone();
        }
        let rx = (kx.len() / 2) as isize;
        let ry = (ky.len() / 2) as isize;

        let mut tmp = vec![0.0f32; w * h];
        tmp.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
            let src = &self.data[y * w..(y + 1) * w];
            for (x, out) in row.iter_mut().enumerate() {
                let mut acc = 0.0;
                for (k, &c) in kx.iter().enumerate() {
                    let xi = reflect_index(x as isize + k as isize - rx, w, border);
                    acc += c * src[xi];
                }
                *out = acc;
            }
        });

        let mut data = vec![0.0f32; w * h];
        data.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
            for (k, &c) in ky.iter().enumerate() {
                let yi = reflect_index(y as isize + k as isize - ry, h, border);
                let src = &tmp[yi * w..(yi + 1) * w];
                for (out, &v) in row.iter_mut().zip(src) {
                    *out += c * v;
                }
            }
        });

        Plane {
            width: self.width,
            height: self.height,
            data,
        }
    }

    /// Combine two planes sample by sample.
    pub fn zip_with(&self, other: &Plane, f: impl Fn(f32, f32) -> f32 + Sync) -> Plane {
        debug_assert_eq!((self.width, self.height), (other.width, other.height));
        Plane {
            width: self.width,
            height: self.height,
            data: self
                .data
                .par_iter()
                .zip(other.data.par_iter())
                .map(|(&a, &b)| f(a, b))
                .collect(),
        }
    }

    pub fn max(&self) -> f32 {
        self.data.iter().copied().fold(0.0, f32::max)
    }

    /// Round and saturate every sample to `u8`.
    pub fn to_gray(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            let v = self.data[(y * self.width + x) as usize];
            Luma([v.round().clamp(0.0, 255.0) as u8])
        })
    }
}

/// Normalised 1-D Gaussian of length `ksize`.
///
/// A non-positive sigma selects the fixed binomial kernels for sizes 1, 3
/// and 5, and otherwise derives sigma from the kernel size.
pub fn gaussian_kernel(ksize: usize, sigma: f32) -> Vec<f32> {
    if sigma <= 0.0 {
        match ksize {
            1 => return vec![1.0],
            3 => return vec![0.25, 0.5, 0.25],
            5 => return vec![1.0 / 16.0, 4.0 / 16.0, 6.0 / 16.0, 4.0 / 16.0, 1.0 / 16.0],
            _ => {}
        }
    }
    let sigma = if sigma > 0.0 {
        sigma
    } else {
        0.3 * ((ksize as f32 - 1.0) * 0.5 - 1.0) + 0.8
    };
    let center = (ksize as f32 - 1.0) / 2.0;
    let weights: Vec<f32> = (0..ksize)
        .map(|i| {
            let d = i as f32 - center;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f32 = weights.iter().sum();
    weights.into_iter().map(|w| w / sum).collect()
}

/// Gaussian smoothing with independent sigmas per axis. `sigma_y <= 0`
/// reuses `sigma_x`.
pub fn gaussian_blur(image: &GrayImage, ksize: usize, sigma_x: f32, sigma_y: f32) -> GrayImage {
    let sigma_y = if sigma_y > 0.0 { sigma_y } else { sigma_x };
    Plane::from_gray(image, 1.0)
        .correlate_separable(
            &gaussian_kernel(ksize, sigma_x),
            &gaussian_kernel(ksize, sigma_y),
            Border::Reflect101,
        )
        .to_gray()
}
