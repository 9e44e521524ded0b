mod common;

use common::*;
use dropmap_core::cleanup::Janitor;
use dropmap_core::compose::status_line;
use dropmap_core::workers::{RenderJob, RenderPool};
use dropmap_core::{Compositor, RenderOutcome, RenderRequest, TraceError};
use std::sync::Arc;
use std::time::Duration;

fn pool(fixture: &Fixture, threads: usize) -> RenderPool {
    let compositor = Compositor::new(fixture.config.clone(), Arc::new(fixture.loader()));
    RenderPool::new(compositor, threads).unwrap()
}

#[test]
fn test_pool_renders_concurrent_jobs() {
    let fixture = Fixture::new();
    let log = fixture.write_log("match.json", &scenario());
    let pool = pool(&fixture, 2);
    assert_eq!(pool.threads(), 2);

    let receivers: Vec<_> = ["Alice", "Bob", "Eve"]
        .into_iter()
        .map(|player| {
            pool.submit(RenderJob::new(
                &log,
                RenderRequest::new(player, "concurrent", false),
            ))
        })
        .collect();

    for receiver in receivers {
        let outcome = receiver.recv().unwrap().unwrap();
        let path = outcome.output_path().unwrap();
        assert!(path.exists(), "{} missing", path.display());
    }
}

#[test]
fn test_unreadable_telemetry_reports_failure() {
    let fixture = Fixture::new();
    let log = fixture.root().join("truncated.json");
    std::fs::write(&log, b"[{\"_T\": \"LogMatchStart\"").unwrap();

    let result = pool(&fixture, 1).render_blocking(RenderJob::new(
        &log,
        RenderRequest::new("Alice", "broken", true),
    ));
    assert!(matches!(result, Err(TraceError::TelemetryJson(_))));
    assert!(status_line(&result).starts_with("Rendering failed: "));

    let missing = pool(&fixture, 1).render_blocking(RenderJob::new(
        fixture.root().join("nope.json"),
        RenderRequest::new("Alice", "missing", true),
    ));
    assert!(matches!(missing, Err(TraceError::MalformedTelemetry(_))));
}

#[test]
fn test_janitor_removes_outputs_and_owned_telemetry() {
    let fixture = Fixture::new();
    let log = fixture.write_log("owned.json", &scenario());
    let janitor = Arc::new(Janitor::new(Duration::from_secs(3600)).unwrap());
    let pool = pool(&fixture, 1).with_janitor(Arc::clone(&janitor));

    let outcome = pool
        .render_blocking(
            RenderJob::new(&log, RenderRequest::new("Alice", "cleanup", true))
                .discard_telemetry(true),
        )
        .unwrap();
    let output = outcome.output_path().unwrap().to_path_buf();
    assert!(output.exists());
    assert!(log.exists());

    janitor.flush();
    assert!(!output.exists());
    assert!(!log.exists());
}

#[test]
fn test_no_data_job_still_discards_telemetry() {
    let fixture = Fixture::new();
    let log = fixture.write_log("ghost.json", &scenario());
    let janitor = Arc::new(Janitor::new(Duration::from_millis(20)).unwrap());
    let pool = pool(&fixture, 1).with_janitor(Arc::clone(&janitor));

    let outcome = pool
        .render_blocking(
            RenderJob::new(&log, RenderRequest::new("Ghost", "none", false))
                .discard_telemetry(true),
        )
        .unwrap();
    assert!(matches!(outcome, RenderOutcome::NoData { .. }));

    drop(pool);
    let janitor = Arc::try_unwrap(janitor).unwrap();
    janitor.wait();
    assert!(!log.exists());
}
