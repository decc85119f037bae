use anyhow::Result;

use nichecast::config::Config;
use nichecast::niche::{NicheCatalog, NicheSummary};

fn catalog(config: &Config) -> NicheCatalog {
    NicheCatalog::new(&config.paths.niches_dir, config.layout.clone())
}

pub fn list(config: &Config) -> Result<()> {
    let catalog = catalog(config);
    let names = catalog.list()?;

    if names.is_empty() {
        println!("No niches found in {}", catalog.base().display());
        return Ok(());
    }

    println!("Niches in {}:", catalog.base().display());
    for (i, name) in names.iter().enumerate() {
        let display = name.strip_prefix('!').unwrap_or(name);
        println!("  {}. {display}", i + 1);
    }
    Ok(())
}

pub fn init(config: &Config, name: &str) -> Result<()> {
    let niche = catalog(config).init(name)?;

    println!("Created niche {} at {}", niche.display_name(), niche.root().display());
    println!("  Assets:       {}", niche.assets_dir().display());
    println!("  Captions:     {}", niche.captions_file().display());
    println!("  Audio:        {}", niche.audio_dir().display());
    println!("  Output:       {}", niche.output_dir().display());
    if !niche.credentials_file().exists() {
        println!(
            "Add credentials to {} before uploading",
            niche.credentials_file().display()
        );
    }
    Ok(())
}

pub fn status(config: &Config, name: &str) -> Result<()> {
    let niche = catalog(config).open(name)?;

    let mut platforms = Vec::new();
    for id in config.platform_ids() {
        let target = config.platform_target(&id, None)?;
        platforms.push((id, target.pattern().clone()));
    }

    let generated = config.generation.artifact_pattern();
    let summary = NicheSummary::collect(&niche, &generated, &platforms)?;
    println!("{}", summary.display(&generated));
    Ok(())
}
