//! Soak test: a `SourcePump` feeding a paced consumer through the FIFO.
//!
//! The pump runs a `RampGenerator`, so the consumer can count every break in
//! the sample sequence it reads back.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context};
use serde::Serialize;
use tracing::info;

use samplefifo_core::{
    buffering::{chunk::SampleChunk, FifoDiagnosticsSnapshot},
    engine::pump::DiagnosticsSnapshot,
    settings::{load_settings, FifoSettings},
    source::RampGenerator,
    GeneratorHandle, Sample, SourcePump,
};

#[derive(Debug)]
struct Args {
    settings: Option<PathBuf>,
    iterations: usize,
    rate: u32,
    output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Summary {
    capacity: usize,
    chunk_size: usize,
    advance: usize,
    iterations: usize,
    rate: u32,
    samples_checked: usize,
    discontinuities: usize,
    mean_power: f64,
    elapsed_ms: f64,
    fifo: FifoDiagnosticsSnapshot,
    pump: DiagnosticsSnapshot,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run() {
        eprintln!("soak failed: {e:#}");
        std::process::exit(1);
    }
}

fn parse_args() -> anyhow::Result<Args> {
    let mut settings = None;
    let mut iterations = 10_000usize;
    let mut rate = 48_000u32;
    let mut output = None;

    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--settings" => {
                let v = it.next().ok_or_else(|| anyhow!("missing value for --settings"))?;
                settings = Some(PathBuf::from(v));
            }
            "--iterations" => {
                let v = it
                    .next()
                    .ok_or_else(|| anyhow!("missing value for --iterations"))?;
                iterations = v.parse().context("invalid value for --iterations")?;
            }
            "--rate" => {
                let v = it.next().ok_or_else(|| anyhow!("missing value for --rate"))?;
                rate = v
                    .parse::<u32>()
                    .context("invalid value for --rate")?
                    .max(1);
            }
            "--output" => {
                let v = it.next().ok_or_else(|| anyhow!("missing value for --output"))?;
                output = Some(PathBuf::from(v));
            }
            "--help" | "-h" => {
                println!(
                    "Usage: cargo run -p samplefifo-core --bin soak -- \\
  [--settings <file.json>] [--iterations <n>] [--rate <samples/s>] [--output <file.json>]"
                );
                std::process::exit(0);
            }
            other => bail!("unknown argument: {other}"),
        }
    }

    Ok(Args {
        settings,
        iterations,
        rate,
        output,
    })
}

fn run() -> anyhow::Result<()> {
    let args = parse_args()?;
    let settings = match &args.settings {
        Some(path) => load_settings(path),
        None => {
            let mut s = FifoSettings::default();
            s.normalize();
            s
        }
    };

    let fifo = settings.fifo.build()?;
    let advance = settings
        .fifo
        .max_read_advance()
        .filter(|&n| n > 0)
        .ok_or_else(|| anyhow!("chunk size {} allows no read advance", fifo.chunk_size()))?;
    let capacity = fifo.capacity();
    let chunk_size = fifo.chunk_size();
    let fifo_diagnostics = fifo.diagnostics();

    info!(capacity, chunk_size, advance, rate = args.rate, "soak starting");

    let pump = SourcePump::new(settings.pump.clone(), GeneratorHandle::new(RampGenerator::new()));
    let (writer, mut reader) = fifo.split();
    pump.start(writer)?;

    // The first 2 * chunk_size slots are the initial zeroed headroom.
    let headroom = 2 * chunk_size;
    let per_advance = Duration::from_secs_f64(advance as f64 / args.rate as f64);

    let start = Instant::now();
    let mut deadline = start;
    let mut consumed = 0usize;
    let mut samples_checked = 0usize;
    let mut discontinuities = 0usize;
    let mut power_sum = 0.0f64;
    let mut prev: Option<Sample> = None;

    for _ in 0..args.iterations {
        let end = reader.read_advance(advance);
        let chunk = SampleChunk::from_window(&reader.window(end, advance), args.rate);
        power_sum += chunk.mean_power();

        for (i, &sample) in chunk.samples.iter().enumerate() {
            if consumed + i < headroom {
                continue;
            }
            if let Some(p) = prev {
                if !RampGenerator::is_successor(p, sample) {
                    discontinuities += 1;
                }
            }
            prev = Some(sample);
            samples_checked += 1;
        }
        consumed += advance;

        deadline += per_advance;
        let now = Instant::now();
        if deadline > now {
            std::thread::sleep(deadline - now);
        }
    }

    let elapsed = start.elapsed();
    let writer = pump.stop()?;
    let _fifo = writer.unsplit(reader)?;

    let summary = Summary {
        capacity,
        chunk_size,
        advance,
        iterations: args.iterations,
        rate: args.rate,
        samples_checked,
        discontinuities,
        mean_power: power_sum / args.iterations.max(1) as f64,
        elapsed_ms: elapsed.as_secs_f64() * 1000.0,
        fifo: fifo_diagnostics.snapshot(),
        pump: pump.diagnostics_snapshot(),
    };

    info!(
        samples_checked,
        discontinuities,
        elapsed_ms = summary.elapsed_ms,
        "soak finished"
    );

    let json = serde_json::to_string_pretty(&summary)?;
    if let Some(out) = args.output {
        if let Some(parent) = out.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&out, json)?;
        println!("Wrote soak report: {}", out.display());
    } else {
        println!("{json}");
    }

    Ok(())
}
