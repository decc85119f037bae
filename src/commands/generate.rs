use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

use nichecast::config::Config;
use nichecast::niche::NicheCatalog;
use nichecast::pipeline::GenerationPipeline;
use nichecast::render::CommandRenderer;

pub async fn generate(config: &Config, name: &str, count: usize) -> Result<()> {
    if !config.renderer.is_configured() {
        return Err(nichecast::Error::config(
            "No renderer configured. Set [renderer] program in the config file",
        )
        .into());
    }

    let niche = NicheCatalog::new(&config.paths.niches_dir, config.layout.clone()).open(name)?;
    let renderer = Arc::new(CommandRenderer::new(config.renderer.clone()));
    let pipeline = GenerationPipeline::new(renderer, config.generation.clone());

    println!("Generating {count} artifact(s) for {}", niche.display_name());
    println!("========================");

    let mut rng = StdRng::from_entropy();
    let report = pipeline.generate(&niche, count, &mut rng).await?;

    println!("{}", report.display());
    Ok(())
}
