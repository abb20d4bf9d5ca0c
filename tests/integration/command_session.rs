//! Full invocation lifecycle tests: spawn, drain, finalize, report.

use opsbot::exec::session::{MESSAGE_BUDGET, TRUNCATION_MARKER};
use opsbot::exec::{self, CommandSession, SessionState};
use opsbot::Error;

use crate::fixtures::RecordingSink;

#[tokio::test]
async fn echo_command_succeeds_with_output() {
    let mut sink = RecordingSink::new();
    let result = exec::run("sh", "echo hi", &mut sink).await.unwrap();

    assert_eq!(result.exit_code, 0);
    assert_eq!(result.combined_output, "hi\n");

    // Placeholder first, then at least the final report.
    assert_eq!(sink.posts.len(), 1);
    assert!(sink.posts[0].contains("echo hi"));
    let final_text = sink.final_text().unwrap();
    assert!(final_text.contains("Success"));
    assert!(final_text.contains("hi"));
}

#[tokio::test]
async fn failing_command_reports_exit_code() {
    let mut sink = RecordingSink::new();
    let result = exec::run("sh", "exit 7", &mut sink).await.unwrap();

    assert_eq!(result.exit_code, 7);
    let final_text = sink.final_text().unwrap();
    assert!(final_text.contains("Failed"));
    assert!(final_text.contains('7'));
}

#[tokio::test]
async fn spawn_failure_sends_exactly_one_error_report() {
    let mut sink = RecordingSink::new();
    let mut session = CommandSession::new("/definitely/not/a/shell", "echo hi");
    let result = session.run(&mut sink).await;

    assert!(matches!(result, Err(Error::Spawn { .. })));
    assert_eq!(session.state(), SessionState::Failed);
    assert_eq!(sink.push_count(), 1);
    assert!(sink.posts[0].contains("Error running"));
}

#[tokio::test]
async fn combined_output_is_stdout_then_tagged_stderr() {
    let mut sink = RecordingSink::new();
    let result = exec::run("sh", "echo one; echo two >&2; echo three", &mut sink)
        .await
        .unwrap();

    assert_eq!(result.combined_output, "one\nthree\n[stderr] two\n");
}

#[tokio::test]
async fn long_output_is_truncated_with_marker() {
    // 5000 chars of stdout, well past the message budget.
    let mut sink = RecordingSink::new();
    let result = exec::run(
        "sh",
        "i=0; while [ $i -lt 100 ]; do printf '%049d\\n' $i; i=$((i+1)); done",
        &mut sink,
    )
    .await
    .unwrap();

    assert_eq!(result.combined_output.len(), 5000);
    let final_text = sink.final_text().unwrap();
    assert!(final_text.ends_with(TRUNCATION_MARKER));
    let content = final_text.strip_suffix(TRUNCATION_MARKER).unwrap();
    assert_eq!(content.chars().count(), MESSAGE_BUDGET);
}

#[tokio::test]
async fn signal_death_maps_to_negative_exit_code() {
    let mut sink = RecordingSink::new();
    let result = exec::run("sh", "kill -9 $$", &mut sink).await.unwrap();

    assert_eq!(result.exit_code, -1);
    assert!(sink.final_text().unwrap().contains("Failed"));
}

#[tokio::test]
async fn failed_final_transmission_still_completes_the_session() {
    let mut sink = RecordingSink {
        fail_updates_with: Some("channel offline".to_string()),
        ..Default::default()
    };
    let mut session = CommandSession::new("sh", "echo hi");
    let result = session.run(&mut sink).await.unwrap();

    // The result is still produced and the session still finishes.
    assert_eq!(result.exit_code, 0);
    assert_eq!(session.state(), SessionState::Done);
}

#[tokio::test]
async fn silent_command_still_gets_a_final_report() {
    let mut sink = RecordingSink::new();
    let result = exec::run("sh", "true", &mut sink).await.unwrap();

    assert_eq!(result.exit_code, 0);
    assert_eq!(result.combined_output, "");
    // Never silence: the operator always gets a terminal message.
    let final_text = sink.final_text().unwrap();
    assert!(final_text.contains("Success"));
}
