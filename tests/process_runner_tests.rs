// Integration tests for deadline-bounded process execution

#![cfg(unix)]

use std::time::{Duration, Instant};
use vidscribe::process::{run, CommandSpec, ProcessOutcome};

fn sh(script: &str) -> CommandSpec {
    CommandSpec::new("sh", "test").args(["-c", script])
}

#[tokio::test]
async fn test_success_merges_both_streams() -> std::io::Result<()> {
    let result = run(
        &sh("echo to-stdout; echo to-stderr 1>&2; echo again"),
        Duration::from_secs(5),
    )
    .await?;

    assert_eq!(result.outcome(), ProcessOutcome::Success);
    assert!(result.output.contains("to-stdout\n"));
    assert!(result.output.contains("to-stderr\n"));
    assert!(result.output.contains("again\n"));
    assert_eq!(result.output.lines().count(), 3);

    Ok(())
}

#[tokio::test]
async fn test_nonzero_exit_keeps_output() -> std::io::Result<()> {
    let result = run(&sh("echo 'ERROR: bad input' 1>&2; exit 3"), Duration::from_secs(5)).await?;

    assert_eq!(result.outcome(), ProcessOutcome::Failed { code: Some(3) });
    assert_eq!(result.exit_code, Some(3));
    assert_eq!(result.output, "ERROR: bad input\n");
    assert!(!result.timed_out);

    Ok(())
}

#[tokio::test]
async fn test_deadline_kills_process_and_keeps_partial_output() -> std::io::Result<()> {
    let started = Instant::now();
    let result = run(&sh("echo started; exec sleep 30"), Duration::from_secs(1)).await?;

    assert!(started.elapsed() < Duration::from_secs(10), "Process was not killed");
    assert_eq!(result.outcome(), ProcessOutcome::TimedOut);
    assert!(result.timed_out);
    assert_eq!(result.exit_code, None);
    assert_eq!(result.output, "started\n");

    Ok(())
}

#[tokio::test]
async fn test_missing_program_is_spawn_error() {
    let cmd = CommandSpec::new("/nonexistent/bin/yt-dlp", "test").arg("--version");
    let result = run(&cmd, Duration::from_secs(5)).await;

    let err = result.unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
}

#[tokio::test]
async fn test_large_output_does_not_block() -> std::io::Result<()> {
    // Far more than a pipe buffer; the child would stall if output weren't drained
    let result = run(
        &sh("i=0; while [ $i -lt 5000 ]; do echo line-$i; i=$((i+1)); done"),
        Duration::from_secs(20),
    )
    .await?;

    assert!(result.success());
    assert_eq!(result.output.lines().count(), 5000);
    assert!(result.output.ends_with("line-4999\n"));

    Ok(())
}

#[tokio::test]
async fn test_exit_is_not_held_up_by_background_child() -> std::io::Result<()> {
    // The background sleep inherits the pipes and keeps them open after exit
    let started = Instant::now();
    let result = run(&sh("echo done; sleep 5 & exit 0"), Duration::from_secs(3)).await?;

    assert_eq!(result.outcome(), ProcessOutcome::Success);
    assert!(!result.timed_out);
    assert!(result.output.contains("done\n"));
    assert!(started.elapsed() < Duration::from_secs(3), "Waited for the pipes to close");

    Ok(())
}
