//! Mid-run progress streaming tests.

use std::time::{Duration, Instant};

use opsbot::exec;
use opsbot::exec::publish::{ProgressPublisher, PublishDecision, SkipReason};

use crate::fixtures::RecordingSink;

#[tokio::test]
async fn slow_command_streams_progress_before_final_report() {
    let mut sink = RecordingSink::new();
    let result = exec::run("sh", "echo first; sleep 1; echo second", &mut sink)
        .await
        .unwrap();

    assert_eq!(result.exit_code, 0);
    // At least one mid-run update plus the final report.
    assert!(sink.updates.len() >= 2, "updates: {:?}", sink.updates);

    let mid_run = &sink.updates[0];
    assert!(mid_run.contains("Running"));
    assert!(mid_run.contains("first"));
    assert!(!mid_run.contains("second"));

    let final_text = sink.final_text().unwrap();
    assert!(final_text.contains("Success"));
    assert!(final_text.contains("second"));
}

#[tokio::test]
async fn progress_shows_recent_tail_for_verbose_commands() {
    let mut sink = RecordingSink::new();
    let result = exec::run(
        "sh",
        "i=0; while [ $i -lt 100 ]; do printf '%049d\\n' $i; i=$((i+1)); done; sleep 1",
        &mut sink,
    )
    .await
    .unwrap();

    assert_eq!(result.exit_code, 0);
    // The last mid-run update shows the tail, not the head.
    let mid_run = &sink.updates[sink.updates.len() - 2];
    assert!(mid_run.contains(&format!("{:049}", 99)));
}

#[tokio::test]
async fn publisher_throttles_between_process_polls() {
    // The same publisher the session uses, driven directly with a
    // controlled clock.
    let mut publisher = ProgressPublisher::new();
    let mut sink = RecordingSink::new();
    let t0 = Instant::now();

    let first = publisher.maybe_publish(&mut sink, "tick 1", 6, t0).await;
    assert_eq!(first, PublishDecision::Sent);

    let second = publisher
        .maybe_publish(&mut sink, "tick 2", 12, t0 + Duration::from_millis(200))
        .await;
    assert_eq!(second, PublishDecision::Skipped(SkipReason::Throttled));

    let third = publisher
        .maybe_publish(&mut sink, "tick 2", 12, t0 + Duration::from_secs(2))
        .await;
    assert_eq!(third, PublishDecision::Sent);

    assert_eq!(sink.updates, vec!["tick 1", "tick 2"]);
}
