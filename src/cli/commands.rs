//! Command implementations

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::json;
use tokio::sync::broadcast;
use tracing::{info, trace, warn};

use crate::adapters::{EngineSettings, JobFile};
use crate::app::{JobId, JobOrchestrator, JobSnapshot};
use crate::cli::args::{ArgsArgs, EncodeArgs};
use crate::engine::{EncoderEvent, JobState, PassSequencer, ProcessSupervisor};
use crate::utils::Utils;

/// Execute the encode command. Fails if any job did not finish successfully.
pub async fn encode(args: EncodeArgs, settings: &EngineSettings, json_output: bool) -> Result<()> {
    let jobs = JobFile::load(&args.selection.jobs).context("Failed to load job file")?;

    let supervisor = ProcessSupervisor::new().with_tail_lines(settings.diagnostic_tail_lines);
    let orchestrator = JobOrchestrator::new(
        settings.encoder_path.clone(),
        Arc::new(supervisor),
        settings.max_parallel_jobs,
    )
    .with_event_capacity(settings.event_capacity);

    let ids = orchestrator
        .add_selection(&jobs.videos, &args.selection.selection())
        .context("Failed to queue clips")?;
    if ids.is_empty() {
        warn!("Selection contains no clips");
        return Ok(());
    }
    info!("Encoding {} clip(s) with {}", ids.len(), settings.encoder_path.display());

    let mut printers = Vec::with_capacity(ids.len());
    for &id in &ids {
        let events = orchestrator.subscribe(id)?;
        let (label, length) = orchestrator
            .job(id)
            .map(|job| (job.clip().label(), job.clip().duration.to_duration()))
            .unwrap_or_default();
        printers.push(tokio::spawn(print_events(id, label, length, events, json_output)));
    }

    orchestrator.start_all();

    tokio::select! {
        _ = orchestrator.wait_all() => {}
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, cancelling all jobs");
            orchestrator.cancel_all();
            orchestrator.wait_all().await;
        }
    }
    for printer in printers {
        let _ = printer.await;
    }

    let snapshots = orchestrator.snapshots();
    print_summary(&snapshots, json_output)?;

    let unsuccessful = snapshots
        .iter()
        .filter(|snapshot| snapshot.state != JobState::Done)
        .count();
    if unsuccessful > 0 {
        anyhow::bail!("{} of {} job(s) did not complete", unsuccessful, snapshots.len());
    }
    Ok(())
}

/// Execute the args command: print every pass's command line
pub fn args(args: ArgsArgs, settings: &EngineSettings, json_output: bool) -> Result<()> {
    let jobs = JobFile::load(&args.selection.jobs).context("Failed to load job file")?;
    let clips = args.selection.selection().resolve(&jobs.videos)?;
    let runner = Arc::new(ProcessSupervisor::new());

    for clip in clips {
        let sequencer = PassSequencer::new(
            Arc::new(clip.clone()),
            settings.encoder_path.clone(),
            runner.clone(),
        );
        let commands = sequencer
            .commands()
            .with_context(|| format!("Cannot build arguments for clip '{}'", clip.label()))?;

        for command in commands {
            if json_output {
                let line = json!({
                    "clip": clip.label(),
                    "pass": command.pass,
                    "program": command.program,
                    "args": command.args,
                    "command": command.display(),
                });
                println!("{}", line);
            } else {
                println!("# {} ({})", clip.label(), command.pass);
                println!("{}", command.display());
            }
        }
    }
    Ok(())
}

async fn print_events(
    id: JobId,
    label: String,
    length: Duration,
    mut events: broadcast::Receiver<EncoderEvent>,
    json_output: bool,
) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                trace!("Job {} printer skipped {} events", id, skipped);
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        let terminal = matches!(&event, EncoderEvent::State { state } if state.is_terminal());
        if json_output {
            let line = json!({
                "timestamp": Utc::now().to_rfc3339(),
                "job": id,
                "clip": label,
                "data": event,
            });
            println!("{}", line);
        } else {
            print_human(id, &label, length, &event);
        }
        if terminal {
            break;
        }
    }
}

fn print_human(id: JobId, label: &str, length: Duration, event: &EncoderEvent) {
    match event {
        EncoderEvent::PassStarted { pass, command } => {
            println!("[job {}] {} started: {}", id, pass, command);
        }
        EncoderEvent::Output { line } => trace!("[job {}] {}", id, line),
        EncoderEvent::Progress { sample } => {
            println!(
                "[job {}] {:>5.1}% frame={} time={} bitrate={:.1}kbits/s",
                id,
                Utils::calculate_progress(sample.time, length),
                sample.frame,
                Utils::format_duration(sample.time),
                sample.bitrate_kbps
            );
        }
        EncoderEvent::PassFinished { pass, exit } => {
            println!("[job {}] {} finished: {:?}", id, pass, exit);
        }
        EncoderEvent::State { state } => match state {
            JobState::Failed {
                exit_code, reason, ..
            } => println!(
                "[job {}] {} failed (exit code {}): {}",
                id,
                label,
                exit_code.map_or_else(|| "none".to_string(), |code| code.to_string()),
                reason
            ),
            other => println!("[job {}] {} is {}", id, label, other.name()),
        },
    }
}

fn print_summary(snapshots: &[JobSnapshot], json_output: bool) -> Result<()> {
    if json_output {
        let summary = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "jobs": snapshots,
        });
        println!("{}", serde_json::to_string(&summary)?);
        return Ok(());
    }

    println!();
    println!("=== Summary ===");
    for snapshot in snapshots {
        let elapsed = match (snapshot.started_at, snapshot.finished_at) {
            (Some(started), Some(finished)) => (finished - started)
                .to_std()
                .map(Utils::format_duration)
                .unwrap_or_default(),
            _ => "-".to_string(),
        };
        println!(
            "{:>4}  {:<10} {:>12}  {}",
            snapshot.id,
            snapshot.state.name(),
            elapsed,
            snapshot.clip
        );
        if let JobState::Failed { diagnostics, .. } = &snapshot.state {
            for line in diagnostics {
                println!("        | {}", line);
            }
        }
    }
    Ok(())
}
