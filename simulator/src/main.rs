use anyhow::Context;
use clap::Parser;
use generator::SeededDetectionSource;
use query_bridge::bridge::{bridge_bind_address, QueryBridge};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::WorkflowConfig;
use workflow::runner::Runner;

mod generator;
mod query_bridge;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Detection cache workflow driver")]
struct Args {
    /// Run the seeded workflow once on a stepped clock and print a report
    #[arg(long, default_value_t = false)]
    offline: bool,
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    #[arg(long, default_value_t = 100)]
    capacity: usize,
    #[arg(long, default_value_t = 0.5)]
    threshold: f32,
    #[arg(long, default_value_t = 30_000)]
    max_age_ms: u64,
    #[arg(long, default_value_t = 60)]
    frames: usize,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Serve the cache over HTTP until Ctrl+C
    #[arg(long, default_value_t = false)]
    serve: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let workflow_config = if let Some(path) = args.workflow {
        WorkflowConfig::load(path)?
    } else {
        WorkflowConfig::from_args(
            args.capacity,
            args.threshold,
            args.max_age_ms,
            args.frames,
            args.seed,
        )
    };

    if args.offline {
        let runner = Runner::offline(workflow_config.clone())?;
        let mut source = SeededDetectionSource::new(workflow_config.generator.clone())
            .context("building seeded detection source")?;
        let result = runner.execute(&mut source)?;

        println!(
            "Offline run -> frames {}, detections {}, cached {}, expired {}, compacted {}",
            result.frames,
            result.tally.total(),
            result.statistics.total_records,
            result.expired,
            result.compacted
        );
        println!("{}", result.statistics);
        for record in &result.recent {
            println!(
                "  {:<14} {:<8} conf {:.2} updated {} ms",
                record.id(),
                record.category(),
                record.confidence(),
                record.last_updated_ms()
            );
        }

        let report = format!(
            "seed={} frames={} inserted={} updated={} merged={} rejected={} evictions={} swept={} cached={}\n",
            workflow_config.generator.seed,
            result.frames,
            result.tally.inserted,
            result.tally.updated,
            result.tally.merged,
            result.tally.rejected,
            result.tally.evictions,
            result.tally.swept,
            result.statistics.total_records
        );
        let report_path = PathBuf::from("tools/data/offline_cache.log");
        if let Some(parent) = report_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&report_path)
            .with_context(|| format!("opening {}", report_path.display()))?;
        file.write_all(report.as_bytes())?;
    }

    if args.serve {
        let runner = Arc::new(Runner::live(workflow_config.clone())?);
        let source = SeededDetectionSource::new(workflow_config.generator.clone())
            .context("building seeded detection source")?;
        let bridge = QueryBridge::new(runner, source);
        bridge.spawn(bridge_bind_address())?;
        bridge.publish_status("HTTP bridge running (Ctrl+C to stop)...");

        let runtime = TokioBuilder::new_current_thread()
            .enable_all()
            .build()
            .context("creating runtime for signal handling")?;
        runtime.block_on(async {
            signal::ctrl_c().await.context("awaiting Ctrl+C to exit")?;
            Ok::<(), anyhow::Error>(())
        })?;
    }

    if !args.offline && !args.serve {
        println!("Nothing to do: pass --offline and/or --serve.");
    }

    Ok(())
}
