use image::GrayImage;

/// One stage of an edge-detection chain.
///
/// Implementations are stateless: they borrow a grayscale image and return a
/// new one with the same dimensions.
pub trait EdgeFilter: Send + Sync {
    fn apply(&self, image: &GrayImage) -> GrayImage;

    /// Human-readable name for logging and panel titles.
    fn name(&self) -> &str {
        "unnamed"
    }
}
