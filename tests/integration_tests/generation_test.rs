//! Generation batch tests
//!
//! Numbering, resume after restart, render failures and empty pools.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeSet;
use std::fs;
use std::sync::Arc;

use nichecast::ledger;
use nichecast::pipeline::GenerationPipeline;
use nichecast::state::{StateError, LOCK_FILE_NAME};
use nichecast::Error;

use crate::common::{FakeRenderer, NicheFixture};

fn pipeline(fixture: &NicheFixture, renderer: Arc<FakeRenderer>) -> GenerationPipeline {
    GenerationPipeline::new(renderer, fixture.config.generation.clone())
}

#[tokio::test]
async fn test_generate_numbers_from_one() {
    let fixture = NicheFixture::new();
    let renderer = Arc::new(FakeRenderer::new());
    let mut rng = ChaCha8Rng::seed_from_u64(1);

    let report = pipeline(&fixture, renderer.clone())
        .generate(&fixture.niche, 3, &mut rng)
        .await
        .unwrap();

    assert_eq!(report.created, vec![1, 2, 3]);
    assert_eq!(report.failed, 0);
    assert_eq!(report.skipped, 0);
    assert_eq!(
        fixture.output_files(),
        vec!["meme_0001.mp4", "meme_0002.mp4", "meme_0003.mp4"]
    );

    let parts: Vec<u32> = renderer.requests().iter().map(|r| r.part).collect();
    assert_eq!(parts, vec![1, 2, 3]);

    let state = fixture.niche.load_state().unwrap();
    assert_eq!(state.generation_cursor, 4);
    assert!(state.platform_cursors.is_empty());
    assert!(!fixture.niche.root().join(LOCK_FILE_NAME).exists());
}

#[tokio::test]
async fn test_generate_resumes_across_runs() {
    let fixture = NicheFixture::new();
    let mut rng = ChaCha8Rng::seed_from_u64(2);

    let first = pipeline(&fixture, Arc::new(FakeRenderer::new()))
        .generate(&fixture.niche, 2, &mut rng)
        .await
        .unwrap();

    // Fresh pipeline and reopened niche, as after a restart
    let niche = fixture.reopen();
    let second = GenerationPipeline::new(
        Arc::new(FakeRenderer::new()),
        fixture.config.generation.clone(),
    )
    .generate(&niche, 3, &mut rng)
    .await
    .unwrap();

    assert_eq!(first.created, vec![1, 2]);
    assert_eq!(second.created, vec![3, 4, 5]);

    let numbers = ledger::scan_numbers(
        fixture.niche.output_dir(),
        &fixture.config.generation.artifact_pattern(),
    )
    .unwrap();
    assert_eq!(numbers, BTreeSet::from([1, 2, 3, 4, 5]));
    assert_eq!(niche.load_state().unwrap().generation_cursor, 6);
}

#[tokio::test]
async fn test_render_failure_retries_same_number() {
    let fixture = NicheFixture::new();
    let renderer = Arc::new(FakeRenderer::failing_calls([2]));
    let mut rng = ChaCha8Rng::seed_from_u64(3);

    let report = pipeline(&fixture, renderer.clone())
        .generate(&fixture.niche, 3, &mut rng)
        .await
        .unwrap();

    assert_eq!(report.created, vec![1, 2]);
    assert_eq!(report.failed, 1);

    let numbers: Vec<u32> = renderer.requests().iter().map(|r| r.number).collect();
    assert_eq!(numbers, vec![1, 2, 2]);
    assert_eq!(fixture.output_files(), vec!["meme_0001.mp4", "meme_0002.mp4"]);
    assert_eq!(fixture.niche.load_state().unwrap().generation_cursor, 3);
}

#[tokio::test]
async fn test_empty_pools_skip_every_iteration() {
    let fixture = NicheFixture::empty();
    let renderer = Arc::new(FakeRenderer::new());
    let mut rng = ChaCha8Rng::seed_from_u64(4);

    let report = pipeline(&fixture, renderer.clone())
        .generate(&fixture.niche, 2, &mut rng)
        .await
        .unwrap();

    assert!(report.created.is_empty());
    assert_eq!(report.skipped, 2);
    assert!(renderer.requests().is_empty());
    assert!(!fixture.niche.state_store().path().exists());
    assert!(report.display().contains("2 skipped"));
}

#[tokio::test]
async fn test_numbering_continues_after_highest_existing() {
    let fixture = NicheFixture::new();
    for n in [1, 2, 3, 4, 6] {
        fixture.add_artifact(n);
    }
    let renderer = Arc::new(FakeRenderer::new());
    let mut rng = ChaCha8Rng::seed_from_u64(5);

    let report = pipeline(&fixture, renderer.clone())
        .generate(&fixture.niche, 1, &mut rng)
        .await
        .unwrap();

    // #5 is never refilled
    assert_eq!(report.created, vec![7]);
    assert_eq!(renderer.requests()[0].part, 7);
    assert!(fixture.niche.output_dir().join("meme_0007.mp4").exists());
    assert!(!fixture.niche.output_dir().join("meme_0005.mp4").exists());
    assert_eq!(fixture.niche.load_state().unwrap().generation_cursor, 8);
}

#[tokio::test]
async fn test_description_sidecar_includes_hashtags() {
    let fixture = NicheFixture::new();
    let mut rng = ChaCha8Rng::seed_from_u64(6);

    pipeline(&fixture, Arc::new(FakeRenderer::new()))
        .generate(&fixture.niche, 2, &mut rng)
        .await
        .unwrap();

    for n in [1, 2] {
        let path = fixture
            .niche
            .descriptions_dir()
            .join(format!("meme_{n:04}.json"));
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let description = value["description"].as_str().unwrap();
        assert!(description.ends_with("#cats #memes"), "{description}");
    }
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_generate_refuses_locked_niche() {
    let fixture = NicheFixture::new();
    // Held by init, which outlives the test
    fs::write(fixture.niche.root().join(LOCK_FILE_NAME), "1\n").unwrap();
    let renderer = Arc::new(FakeRenderer::new());
    let mut rng = ChaCha8Rng::seed_from_u64(7);

    let result = pipeline(&fixture, renderer.clone())
        .generate(&fixture.niche, 1, &mut rng)
        .await;

    assert!(matches!(
        result,
        Err(Error::State(StateError::Locked { .. }))
    ));
    assert!(renderer.requests().is_empty());
}

#[tokio::test]
async fn test_generate_resumes_after_crashed_run() {
    let fixture = NicheFixture::new();
    let mut rng = ChaCha8Rng::seed_from_u64(8);

    pipeline(&fixture, Arc::new(FakeRenderer::new()))
        .generate(&fixture.niche, 2, &mut rng)
        .await
        .unwrap();

    // The crashed run never released its lock
    std::mem::forget(fixture.niche.lock().unwrap());

    let report = pipeline(&fixture, Arc::new(FakeRenderer::new()))
        .generate(&fixture.reopen(), 1, &mut rng)
        .await
        .unwrap();

    assert_eq!(report.created, vec![3]);
    assert!(!fixture.niche.root().join(LOCK_FILE_NAME).exists());
}
