use image::GrayImage;
use rayon::prelude::*;
use tracing::debug;

use super::gradient::{NormalizedGradientFilter, Sobel5Filter};
use super::kernel::gaussian_blur;
use super::lines::ConnectedLinesFilter;
use super::traits::EdgeFilter;

/// Side length of the smoothing kernel used by every blur variant.
pub const BLUR_KSIZE: usize = 5;

/// A fixed smoothing configuration applied before the edge filters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlurVariant {
    pub title: &'static str,
    /// File-name friendly identifier.
    pub slug: &'static str,
    pub sigma_x: f32,
    pub sigma_y: f32,
}

pub const BLUR_VARIANTS: [BlurVariant; 3] = [
    BlurVariant {
        title: "Suavização Média",
        slug: "blur-medium",
        sigma_x: 1.0,
        sigma_y: 1.0,
    },
    BlurVariant {
        title: "Suavização Intermediária",
        slug: "blur-intermediate",
        sigma_x: 1.2,
        sigma_y: 1.0,
    },
    BlurVariant {
        title: "Suavização Personalizada",
        slug: "blur-custom",
        sigma_x: 1.5,
        sigma_y: 0.5,
    },
];

impl BlurVariant {
    pub fn apply(&self, gray: &GrayImage) -> GrayImage {
        gaussian_blur(gray, BLUR_KSIZE, self.sigma_x, self.sigma_y)
    }
}

/// Output of one filter in a chain run.
#[derive(Debug, Clone)]
pub struct EdgeMap {
    pub name: String,
    pub image: GrayImage,
}

/// Independent edge filters applied to the same input.
pub struct EdgeChain {
    filters: Vec<Box<dyn EdgeFilter>>,
}

impl EdgeChain {
    pub fn new(filters: Vec<Box<dyn EdgeFilter>>) -> Self {
        Self { filters }
    }

    /// Sobel 5x5, normalised Sobel, Prewitt and connected lines, in that order.
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(Sobel5Filter::default()),
            Box::new(NormalizedGradientFilter::sobel()),
            Box::new(NormalizedGradientFilter::prewitt()),
            Box::new(ConnectedLinesFilter::default()),
        ])
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Run every filter on `image`. Results keep the chain's order.
    pub fn run(&self, image: &GrayImage) -> Vec<EdgeMap> {
        self.filters
            .par_iter()
            .map(|filter| {
                let out = filter.apply(image);
                debug!(filter = filter.name(), "edge filter done");
                EdgeMap {
                    name: filter.name().to_string(),
                    image: out,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn scene() -> GrayImage {
        GrayImage::from_fn(96, 72, |x, y| {
            let v = if (20..76).contains(&x) && (15..60).contains(&y) {
                200
            } else {
                40
            };
            Luma([v])
        })
    }

    #[test]
    fn every_variant_and_filter_preserves_dimensions() {
        let chain = EdgeChain::standard();
        let gray = scene();
        let mut inputs = vec![gray.clone()];
        inputs.extend(BLUR_VARIANTS.iter().map(|v| v.apply(&gray)));
        for input in &inputs {
            assert_eq!(input.dimensions(), (96, 72));
            let maps = chain.run(input);
            assert_eq!(maps.len(), 4);
            for map in &maps {
                assert_eq!(map.image.dimensions(), (96, 72), "{}", map.name);
            }
        }
    }

    #[test]
    fn results_follow_chain_order() {
        let names: Vec<String> = EdgeChain::standard()
            .run(&scene())
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(
            names,
            ["Sobel 5x5", "Sobel (normalized)", "Prewitt", "Connected lines"]
        );
    }

    #[test]
    fn blank_input_gives_white_maps() {
        let blank = GrayImage::from_pixel(40, 30, Luma([0]));
        for map in EdgeChain::standard().run(&blank) {
            assert!(map.image.pixels().all(|p| p[0] == 255), "{}", map.name);
        }
    }

    #[test]
    fn gradient_maps_mark_the_rectangle() {
        let maps = EdgeChain::standard().run(&scene());
        for map in &maps[..3] {
            assert!(map.image.pixels().any(|p| p[0] == 0), "{}", map.name);
        }
    }
}
