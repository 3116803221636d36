//! Integration tests for encoder process supervision, using `/bin/sh` as a
//! stand-in encoder
#![cfg(unix)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clipenc_cli::domain::model::{ClipSpec, ContainerFormat, SourceMedia, TimeSpec};
use clipenc_cli::engine::command::EncoderCommand;
use clipenc_cli::engine::process::pass_log_artifacts;
use clipenc_cli::error::{EncodeError, EncodeResult};
use clipenc_cli::*;
use tempfile::TempDir;
use tokio::sync::broadcast;

// Test utilities

fn shell(script: &str, pass: PassKind) -> EncoderCommand {
    EncoderCommand::new("/bin/sh", vec!["-c".to_string(), script.to_string()], pass)
}

fn write_artifacts(output: &Path) {
    for artifact in pass_log_artifacts(output) {
        fs::write(artifact, b"stats").unwrap();
    }
}

fn assert_no_artifacts(output: &Path) {
    for artifact in pass_log_artifacts(output) {
        assert!(!artifact.exists(), "{} left behind", artifact.display());
    }
}

fn drain(events: &mut broadcast::Receiver<EncoderEvent>) -> Vec<EncoderEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}

/// Runs the real supervisor, launching a fake encoder script through `/bin/sh`
struct ScriptRunner {
    script: PathBuf,
    supervisor: ProcessSupervisor,
}

#[async_trait]
impl PassRunner for ScriptRunner {
    async fn run_pass(
        &self,
        command: &EncoderCommand,
        cancel: &CancelHandle,
        events: &broadcast::Sender<EncoderEvent>,
    ) -> EncodeResult<PassResult> {
        let mut args = vec![self.script.to_string_lossy().into_owned()];
        args.extend(command.args.iter().cloned());
        let mut wrapped = EncoderCommand::new("/bin/sh", args, command.pass);
        wrapped.pass_log = command.pass_log.clone();
        self.supervisor.run(&wrapped, cancel, events).await
    }
}

/// Fake encoder: records each pass number, writes the pass-log files on a
/// first pass and prints a statistics line. Sleeps when a `hang_pass_<n>` file
/// exists, otherwise exits with the code in `fail_pass_<n>` (default 0).
const FAKE_ENCODER: &str = r#"
pass=0
log=""
while [ $# -gt 0 ]; do
  case "$1" in
    -pass) pass="$2"; shift ;;
    -passlogfile) log="$2"; shift ;;
  esac
  shift
done
dir="$(dirname "$0")"
echo "$pass" >> "$dir/passes"
if [ "$pass" = "1" ]; then
  : > "$log-0.log"
  : > "$log-0.log.mbtree"
fi
echo "frame=   25 fps=0.0 q=-1.0 size=N/A time=00:00:01.00 bitrate= 64.0kbits/s" >&2
if [ -e "$dir/hang_pass_$pass" ]; then
  exec sleep 30
fi
exit_code=$(cat "$dir/fail_pass_$pass" 2>/dev/null || echo 0)
exit "$exit_code"
"#;

fn two_pass_clip(dir: &TempDir) -> ClipSpec {
    let source = SourceMedia {
        path: dir.path().join("source.mkv"),
        frame_rate: 25.0,
        width: 640,
        height: 360,
    };
    let mut clip = ClipSpec::new(
        source,
        TimeSpec::from_seconds(1.0),
        TimeSpec::from_seconds(2.0),
        ContainerFormat::mp4(),
        dir.path().join("clip.mp4"),
    );
    clip.video_codec = Some("libx264".to_string());
    clip.two_pass = true;
    clip
}

fn script_runner(dir: &TempDir) -> Arc<ScriptRunner> {
    let script = dir.path().join("encoder.sh");
    fs::write(&script, FAKE_ENCODER).unwrap();
    Arc::new(ScriptRunner {
        script,
        supervisor: ProcessSupervisor::new(),
    })
}

fn recorded_passes(dir: &TempDir) -> Vec<String> {
    fs::read_to_string(dir.path().join("passes"))
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

// Process supervisor tests

#[tokio::test]
async fn test_progress_from_stderr_in_order() {
    let (events, mut rx) = broadcast::channel(64);
    let command = shell(
        "echo 'ffmpeg version banner'; \
         printf 'frame=   10 time=00:00:01.00 bitrate= 100.0kbits/s\\r' >&2; \
         printf 'frame=   20 time=00:00:02.00 bitrate= 200.0kbits/s\\n' >&2",
        PassKind::Single,
    );

    let result = ProcessSupervisor::new()
        .run(&command, &CancelHandle::new(), &events)
        .await
        .unwrap();

    assert_eq!(result.exit, PassExit::Code(0));
    assert_eq!(result.last_sample.map(|s| s.frame), Some(20));

    let seen = drain(&mut rx);
    let frames: Vec<u64> = seen
        .iter()
        .filter_map(|event| match event {
            EncoderEvent::Progress { sample } => Some(sample.frame),
            _ => None,
        })
        .collect();
    assert_eq!(frames, vec![10, 20]);

    let outputs = seen
        .iter()
        .filter(|event| matches!(event, EncoderEvent::Output { .. }))
        .count();
    assert_eq!(outputs, 3);
}

#[tokio::test]
async fn test_nonzero_exit_keeps_diagnostics() {
    let (events, _rx) = broadcast::channel(64);
    let command = shell("echo 'Conversion failed!' >&2; exit 3", PassKind::Single);

    let result = ProcessSupervisor::new()
        .run(&command, &CancelHandle::new(), &events)
        .await
        .unwrap();

    assert_eq!(result.exit, PassExit::Code(3));
    assert_eq!(result.last_sample, None);
    assert_eq!(result.diagnostics, vec!["Conversion failed!"]);
}

#[tokio::test]
async fn test_cancel_terminates_process() {
    let (events, _rx) = broadcast::channel(64);
    let cancel = CancelHandle::new();
    let command = shell("echo started; exec sleep 30", PassKind::Single);

    let run = {
        let cancel = cancel.clone();
        tokio::spawn(async move { ProcessSupervisor::new().run(&command, &cancel, &events).await })
    };
    tokio::time::sleep(Duration::from_millis(200)).await;
    cancel.cancel();

    let result = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("supervisor returned after cancel")
        .unwrap()
        .unwrap();
    assert_eq!(result.exit, PassExit::Cancelled);
}

#[tokio::test]
async fn test_second_pass_removes_pass_logs_on_failure() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("clip.mp4");
    write_artifacts(&output);
    let (events, _rx) = broadcast::channel(64);

    let command = shell("exit 1", PassKind::Second).with_pass_log(&output);
    let result = ProcessSupervisor::new()
        .run(&command, &CancelHandle::new(), &events)
        .await
        .unwrap();

    assert_eq!(result.exit, PassExit::Code(1));
    assert_no_artifacts(&output);
}

#[tokio::test]
async fn test_second_pass_removes_pass_logs_on_cancel() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("clip.mp4");
    write_artifacts(&output);
    let (events, _rx) = broadcast::channel(64);
    let cancel = CancelHandle::new();

    let command = shell("exec sleep 30", PassKind::Second).with_pass_log(&output);
    let run = {
        let cancel = cancel.clone();
        tokio::spawn(async move { ProcessSupervisor::new().run(&command, &cancel, &events).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel.cancel();

    let result = run.await.unwrap().unwrap();
    assert_eq!(result.exit, PassExit::Cancelled);
    assert_no_artifacts(&output);
}

#[tokio::test]
async fn test_first_pass_keeps_pass_logs() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("clip.mp4");
    write_artifacts(&output);
    let (events, _rx) = broadcast::channel(64);

    let command = shell("exit 0", PassKind::First).with_pass_log(&output);
    ProcessSupervisor::new()
        .run(&command, &CancelHandle::new(), &events)
        .await
        .unwrap();

    for artifact in pass_log_artifacts(&output) {
        assert!(artifact.exists());
    }
}

#[tokio::test]
async fn test_missing_encoder_is_launch_error_and_still_cleans_up() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("clip.mp4");
    write_artifacts(&output);
    let (events, _rx) = broadcast::channel(64);

    let command = EncoderCommand::new(dir.path().join("no-such-encoder"), vec![], PassKind::Second)
        .with_pass_log(&output);
    let result = ProcessSupervisor::new()
        .run(&command, &CancelHandle::new(), &events)
        .await;

    assert!(matches!(result, Err(EncodeError::Launch { .. })));
    assert_no_artifacts(&output);
}

// Full pass sequences through the fake encoder

#[tokio::test]
async fn test_two_pass_job_succeeds_and_leaves_no_pass_logs() {
    let dir = TempDir::new().unwrap();
    let clip = two_pass_clip(&dir);
    let output = clip.output.clone();

    let orchestrator = JobOrchestrator::new("ffmpeg", script_runner(&dir), 2);
    let id = orchestrator.add(clip).unwrap();
    orchestrator.start(id).unwrap();
    orchestrator.wait_all().await;

    let job = orchestrator.job(id).unwrap();
    assert_eq!(job.state(), JobState::Done);
    assert_eq!(job.latest_sample().map(|s| s.frame), Some(25));
    assert_eq!(recorded_passes(&dir), vec!["1", "2"]);
    assert_no_artifacts(&output);
}

#[tokio::test]
async fn test_failed_first_pass_never_starts_second() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("fail_pass_1"), "4").unwrap();
    let clip = two_pass_clip(&dir);
    let output = clip.output.clone();

    let orchestrator = JobOrchestrator::new("ffmpeg", script_runner(&dir), 2);
    let id = orchestrator.add(clip).unwrap();
    orchestrator.start_all();
    orchestrator.wait_all().await;

    match orchestrator.job(id).unwrap().state() {
        JobState::Failed {
            exit_code,
            diagnostics,
            ..
        } => {
            assert_eq!(exit_code, Some(4));
            assert!(diagnostics.iter().any(|line| line.contains("frame=")));
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(recorded_passes(&dir), vec!["1"]);
    assert_no_artifacts(&output);
}

#[tokio::test]
async fn test_failed_second_pass_leaves_no_pass_logs() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("fail_pass_2"), "1").unwrap();
    let clip = two_pass_clip(&dir);
    let output = clip.output.clone();

    let orchestrator = JobOrchestrator::new("ffmpeg", script_runner(&dir), 1);
    let id = orchestrator.add(clip).unwrap();
    orchestrator.start_all();
    orchestrator.wait_all().await;

    assert!(matches!(
        orchestrator.job(id).unwrap().state(),
        JobState::Failed {
            exit_code: Some(1),
            ..
        }
    ));
    assert_eq!(recorded_passes(&dir), vec!["1", "2"]);
    assert_no_artifacts(&output);
}

#[tokio::test]
async fn test_cancel_during_first_pass_leaves_no_pass_logs() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("hang_pass_1"), "").unwrap();
    let clip = two_pass_clip(&dir);
    let output = clip.output.clone();

    let orchestrator = JobOrchestrator::new("ffmpeg", script_runner(&dir), 1);
    let id = orchestrator.add(clip).unwrap();
    let mut events = orchestrator.subscribe(id).unwrap();
    orchestrator.start(id).unwrap();

    // The statistics line follows the pass-log writes
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Ok(EncoderEvent::Progress { .. }) = events.recv().await {
                return;
            }
        }
    })
    .await
    .expect("first pass reported progress");
    assert!(pass_log_artifacts(&output).iter().all(|artifact| artifact.exists()));

    assert!(orchestrator.cancel(id).unwrap());
    tokio::time::timeout(Duration::from_secs(5), orchestrator.wait_all())
        .await
        .expect("cancelled job finished");

    assert_eq!(orchestrator.job(id).unwrap().state(), JobState::Cancelled);
    assert_eq!(recorded_passes(&dir), vec!["1"]);
    assert_no_artifacts(&output);
}

#[tokio::test]
async fn test_unrepresentable_progress_time_is_zeroed() {
    let (events, _rx) = broadcast::channel(64);
    let command = shell(
        "printf 'frame=    3 time=inf bitrate=N/A\\n' >&2; \
         printf 'frame=    4 time=1e20 bitrate=N/A\\n' >&2",
        PassKind::Single,
    );

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        ProcessSupervisor::new().run(&command, &CancelHandle::new(), &events),
    )
    .await
    .expect("supervisor returned")
    .unwrap();

    assert_eq!(result.exit, PassExit::Code(0));
    let sample = result.last_sample.expect("sample");
    assert_eq!(sample.frame, 4);
    assert_eq!(sample.time, Duration::ZERO);
}
