//! Upload batch tests
//!
//! Cursor advancement, slot spacing, failure handling and multi-platform runs
//! against a frozen clock.

use chrono::{Duration, NaiveDateTime};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;

use nichecast::scheduler::FixedClock;
use nichecast::state::LOCK_FILE_NAME;
use nichecast::upload::{PlatformTarget, StopReason, UploadOrchestrator};
use nichecast::Error;

use crate::common::{at, FakeUploader, NicheFixture, Outcome};

fn orchestrator(uploader: Arc<FakeUploader>, now: NaiveDateTime) -> UploadOrchestrator {
    UploadOrchestrator::new(uploader, Arc::new(FixedClock(now)))
}

fn target(fixture: &NicheFixture, platform: &str) -> PlatformTarget {
    fixture.config.platform_target(platform, None).unwrap()
}

#[tokio::test]
async fn test_upload_uses_spaced_slots() {
    let fixture = NicheFixture::new();
    for n in 1..=3 {
        fixture.add_artifact(n);
    }
    let uploader = Arc::new(FakeUploader::new());
    let now = at(1, 10, 0);
    let mut rng = ChaCha8Rng::seed_from_u64(1);

    let report = orchestrator(uploader.clone(), now)
        .run(&fixture.niche, &target(&fixture, "youtube"), 2, &mut rng)
        .await
        .unwrap();

    let numbers: Vec<u32> = report.published.iter().map(|p| p.number).collect();
    let canonical: Vec<NaiveDateTime> = report.published.iter().map(|p| p.canonical).collect();
    assert_eq!(numbers, vec![1, 2]);
    assert_eq!(canonical, vec![at(1, 13, 30), at(1, 21, 0)]);
    assert_eq!(report.stop, None);

    for item in &report.published {
        let offset = item.jittered - item.canonical;
        assert!(offset >= Duration::minutes(-10) && offset <= Duration::minutes(10));
        assert!(item.jittered > now);
    }

    let calls = uploader.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|c| c.platform == "youtube"));
    assert_eq!(calls[0].schedule, report.published[0].jittered);
    assert!(calls[1].artifact.ends_with("meme_0002.mp4"));

    let cursor = fixture.niche.load_state().unwrap().cursor("youtube");
    assert_eq!(cursor.last_published_number, Some(2));
    assert_eq!(cursor.last_schedule_time, Some(at(1, 21, 0)));
    assert!(!fixture.niche.root().join(LOCK_FILE_NAME).exists());
}

#[tokio::test]
async fn test_upload_skips_numbering_gaps() {
    let fixture = NicheFixture::new();
    for n in [3, 4, 7] {
        fixture.add_artifact(n);
    }
    let mut state = fixture.niche.load_state().unwrap();
    let cursor = state.cursor_mut("youtube");
    cursor.last_published_number = Some(4);
    cursor.last_schedule_time = Some(at(1, 0, 30));
    fixture.niche.save_state(&state).unwrap();

    let uploader = Arc::new(FakeUploader::new());
    let mut rng = ChaCha8Rng::seed_from_u64(2);

    let report = orchestrator(uploader.clone(), at(1, 10, 0))
        .run(&fixture.niche, &target(&fixture, "youtube"), 3, &mut rng)
        .await
        .unwrap();

    assert_eq!(report.published.len(), 1);
    assert_eq!(report.published[0].number, 7);
    assert_eq!(report.published[0].canonical, at(1, 13, 30));
    assert_eq!(report.stop, Some(StopReason::Exhausted));
    assert_eq!(uploader.calls().len(), 1);
}

#[tokio::test]
async fn test_failure_stops_batch_and_keeps_cursor() {
    let fixture = NicheFixture::new();
    for n in 1..=3 {
        fixture.add_artifact(n);
    }
    let uploader = Arc::new(FakeUploader::scripted([Outcome::Accept, Outcome::Error]));
    let mut rng = ChaCha8Rng::seed_from_u64(3);

    let report = orchestrator(uploader.clone(), at(1, 10, 0))
        .run(&fixture.niche, &target(&fixture, "youtube"), 3, &mut rng)
        .await
        .unwrap();

    assert_eq!(report.succeeded(), 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].number, 2);
    assert!(report.failures[0].reason.contains("quota exceeded"));
    assert_eq!(report.stop, Some(StopReason::UploadFailed { number: 2 }));
    assert_eq!(uploader.calls().len(), 2);

    let cursor = fixture.niche.load_state().unwrap().cursor("youtube");
    assert_eq!(cursor.last_published_number, Some(1));
    assert_eq!(cursor.last_schedule_time, Some(at(1, 13, 30)));
}

#[tokio::test]
async fn test_continue_on_failure_retries_same_artifact() {
    let fixture = NicheFixture::new();
    for n in 1..=2 {
        fixture.add_artifact(n);
    }
    let uploader = Arc::new(FakeUploader::scripted([Outcome::Reject, Outcome::Accept]));
    let mut rng = ChaCha8Rng::seed_from_u64(4);

    let report = orchestrator(uploader.clone(), at(1, 10, 0))
        .with_continue_on_failure(true)
        .run(&fixture.niche, &target(&fixture, "youtube"), 2, &mut rng)
        .await
        .unwrap();

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].number, 1);
    assert_eq!(report.published.len(), 1);
    assert_eq!(report.published[0].number, 1);
    assert_eq!(report.stop, None);

    let calls = uploader.calls();
    assert!(calls.iter().all(|c| c.artifact.ends_with("meme_0001.mp4")));
    assert_eq!(
        fixture
            .niche
            .load_state()
            .unwrap()
            .cursor("youtube")
            .last_published_number,
        Some(1)
    );
}

#[tokio::test]
async fn test_no_slot_within_horizon_stops_before_upload() {
    let mut fixture = NicheFixture::new();
    fixture.config.upload.horizon_days = 0;
    fixture.add_artifact(1);
    let uploader = Arc::new(FakeUploader::new());
    let mut rng = ChaCha8Rng::seed_from_u64(5);

    let report = orchestrator(uploader.clone(), at(1, 22, 0))
        .run(&fixture.niche, &target(&fixture, "youtube"), 1, &mut rng)
        .await
        .unwrap();

    assert_eq!(report.stop, Some(StopReason::NoSlotFound));
    assert!(report.published.is_empty());
    assert!(uploader.calls().is_empty());
    assert!(fixture
        .niche
        .load_state()
        .unwrap()
        .cursor("youtube")
        .is_unset());
}

#[tokio::test]
async fn test_missing_credentials_is_an_error() {
    let fixture = NicheFixture::empty();
    fixture.add_artifact(1);
    let uploader = Arc::new(FakeUploader::new());
    let mut rng = ChaCha8Rng::seed_from_u64(6);

    let result = orchestrator(uploader.clone(), at(1, 10, 0))
        .run(&fixture.niche, &target(&fixture, "youtube"), 1, &mut rng)
        .await;

    match result {
        Err(Error::Config(msg)) => assert!(msg.contains("Credentials file not found")),
        other => panic!("expected config error, got {other:?}"),
    }
    assert!(uploader.calls().is_empty());
    assert!(!fixture.niche.root().join(LOCK_FILE_NAME).exists());
}

#[tokio::test]
async fn test_platforms_advance_independently() {
    let fixture = NicheFixture::new();
    for n in 1..=2 {
        fixture.add_artifact(n);
    }
    let uploader = Arc::new(FakeUploader::new().failing_platform("tiktok"));
    let targets = vec![target(&fixture, "youtube"), target(&fixture, "tiktok")];
    let mut rng = ChaCha8Rng::seed_from_u64(7);

    let reports = orchestrator(uploader.clone(), at(1, 10, 0))
        .run_platforms(&fixture.niche, &targets, 2, &mut rng)
        .await
        .unwrap();

    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].platform, "youtube");
    assert_eq!(reports[0].succeeded(), 2);
    assert_eq!(reports[1].platform, "tiktok");
    assert_eq!(reports[1].succeeded(), 0);
    assert_eq!(reports[1].stop, Some(StopReason::UploadFailed { number: 1 }));

    let state = fixture.niche.load_state().unwrap();
    assert_eq!(state.cursor("youtube").last_published_number, Some(2));
    assert!(state.cursor("tiktok").is_unset());
}

#[tokio::test]
async fn test_upload_resumes_across_runs() {
    let fixture = NicheFixture::new();
    for n in 1..=3 {
        fixture.add_artifact(n);
    }
    let youtube = target(&fixture, "youtube");
    let mut rng = ChaCha8Rng::seed_from_u64(8);

    let runs = [at(1, 10, 0), at(1, 10, 5), at(2, 9, 0)];
    let mut published = Vec::new();
    for now in runs {
        let niche = fixture.reopen();
        let report = orchestrator(Arc::new(FakeUploader::new()), now)
            .run(&niche, &youtube, 1, &mut rng)
            .await
            .unwrap();
        published.extend(report.published.into_iter().map(|p| (p.number, p.canonical)));
    }

    assert_eq!(
        published,
        vec![(1, at(1, 13, 30)), (2, at(1, 21, 0)), (3, at(2, 13, 30))]
    );
}

#[cfg(unix)]
#[tokio::test]
async fn test_upload_reclaims_lock_of_dead_process() {
    let fixture = NicheFixture::new();
    fixture.add_artifact(1);
    std::fs::write(fixture.niche.root().join(LOCK_FILE_NAME), "4194305\n").unwrap();
    let uploader = Arc::new(FakeUploader::new());
    let mut rng = ChaCha8Rng::seed_from_u64(9);

    let report = orchestrator(uploader.clone(), at(1, 10, 0))
        .run(&fixture.niche, &target(&fixture, "youtube"), 1, &mut rng)
        .await
        .unwrap();

    assert_eq!(report.succeeded(), 1);
    assert!(!fixture.niche.root().join(LOCK_FILE_NAME).exists());
}
