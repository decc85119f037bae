use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

use nichecast::config::Config;
use nichecast::ledger;
use nichecast::niche::NicheCatalog;
use nichecast::scheduler::{Clock, SystemClock};
use nichecast::upload::{next_candidate, CommandUploader, PlatformTarget, UploadOrchestrator};

/// Expand `all` and drop duplicates, keeping the given order
fn resolve_platforms(config: &Config, requested: &[String]) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for id in requested {
        let expanded = if id.eq_ignore_ascii_case("all") {
            config.platform_ids()
        } else {
            vec![id.clone()]
        };
        for id in expanded {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }
    ids
}

fn targets(config: &Config, requested: &[String], slot_set: Option<&str>) -> Result<Vec<PlatformTarget>> {
    resolve_platforms(config, requested)
        .iter()
        .map(|id| {
            config
                .platform_target(id, slot_set)
                .map_err(anyhow::Error::from)
        })
        .collect()
}

pub async fn upload(
    config: &Config,
    name: &str,
    platforms: &[String],
    count: usize,
    slot_set: Option<&str>,
) -> Result<()> {
    let niche = NicheCatalog::new(&config.paths.niches_dir, config.layout.clone()).open(name)?;
    let targets = targets(config, platforms, slot_set)?;

    let orchestrator = UploadOrchestrator::new(
        Arc::new(CommandUploader::from_config(config)),
        Arc::new(SystemClock),
    )
    .with_continue_on_failure(config.upload.continue_on_failure);

    println!("Uploading up to {count} artifact(s) per platform for {}", niche.display_name());
    println!("========================");

    let mut rng = StdRng::from_entropy();
    let reports = orchestrator
        .run_platforms(&niche, &targets, count, &mut rng)
        .await?;

    for report in reports {
        println!("{}", report.display());
    }
    Ok(())
}

pub fn schedule(
    config: &Config,
    name: &str,
    platforms: &[String],
    slot_set: Option<&str>,
) -> Result<()> {
    let niche = NicheCatalog::new(&config.paths.niches_dir, config.layout.clone()).open(name)?;
    let targets = targets(config, platforms, slot_set)?;
    let state = niche.load_state()?;
    let now = SystemClock.now();
    let mut rng = StdRng::from_entropy();

    println!("Next publication times for {} (dry run)", niche.display_name());
    for target in &targets {
        let cursor = state.cursor(target.id());
        let available = ledger::scan_numbers(niche.output_dir(), target.pattern())?;
        let artifact = next_candidate(available.iter().copied(), cursor.last_published_number)
            .map(|n| target.pattern().file_name(n))
            .unwrap_or_else(|| "nothing to upload".to_string());

        let slot = match target.scheduler().next(&cursor, now, &mut rng) {
            Ok(slot) => slot.display(),
            Err(no_slot) => no_slot.to_string(),
        };
        println!(
            "  {:<10} {artifact} @ {slot} [slots {}]",
            target.id(),
            target.scheduler().slots()
        );
    }
    Ok(())
}
