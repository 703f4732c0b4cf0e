mod render;

use bordas_common::codec;
use bordas_common::config::{Config, ConfigError};
use bordas_common::filter::{EdgeChain, BLUR_VARIANTS};
use image::GrayImage;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info};

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to load image {0}: {1}")]
    Load(String, image::ImageError),
    #[error("failed to create output directory {0}: {1}")]
    CreateDir(String, std::io::Error),
    #[error("failed to save grid {0}: {1}")]
    Save(String, image::ImageError),
}

/// One smoothing level fed through the edge chain.
struct Run {
    title: String,
    slug: &'static str,
    input: GrayImage,
}

fn main() {
    let config = match Config::resolve(std::env::args().nth(1).map(PathBuf::from)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .init();

    info!(
        input = config.batch.input,
        output_dir = config.batch.output_dir,
        "starting edge detection batch"
    );

    if let Err(e) = run(&config) {
        error!(error = %e, "batch failed");
        std::process::exit(1);
    }
}

fn run(config: &Config) -> Result<(), BatchError> {
    let started = Instant::now();
    let original = image::open(&config.batch.input)
        .map_err(|e| BatchError::Load(config.batch.input.clone(), e))?;
    let gray = codec::to_gray_bt601(&original);
    info!(
        width = gray.width(),
        height = gray.height(),
        "input image loaded"
    );

    let output_dir = Path::new(&config.batch.output_dir);
    std::fs::create_dir_all(output_dir)
        .map_err(|e| BatchError::CreateDir(output_dir.display().to_string(), e))?;

    let mut runs = vec![Run {
        title: "Original".into(),
        slug: "original",
        input: gray.clone(),
    }];
    runs.extend(BLUR_VARIANTS.iter().map(|variant| Run {
        title: variant.title.into(),
        slug: variant.slug,
        input: variant.apply(&gray),
    }));

    let chain = EdgeChain::standard();
    runs.par_iter()
        .enumerate()
        .try_for_each(|(index, run)| -> Result<(), BatchError> {
            let maps = chain.run(&run.input);
            let grid = render::compose_grid(&original, &maps);
            let path = output_dir.join(format!("{}_{}.png", index + 1, run.slug));
            grid.save(&path)
                .map_err(|e| BatchError::Save(path.display().to_string(), e))?;
            info!(
                title = format!("Edge detection - {}", run.title),
                path = path.display().to_string(),
                "grid written"
            );
            Ok(())
        })?;

    info!(
        runs = runs.len(),
        filters = chain.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "batch complete"
    );
    Ok(())
}
