use std::fs::File;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use flashsim_machine::{
    Lpa, PhysicalAddress, RequestKind, SimReport, Simulator, SimulatorConfig, Stage,
    TraceRequest,
};

/// Discrete-event SSD simulator: replays a host I/O trace against the
/// modeled device and reports per-request latencies and device counters.
#[derive(Parser)]
#[command(name = "flashsim", version)]
struct Args {
    /// JSON trace file: an array of {"op", "lba", "at", "fua"} objects.
    #[arg(long, conflicts_with = "demo")]
    trace: Option<PathBuf>,

    /// Run a builtin demo workload instead of a trace file.
    #[arg(long, value_enum)]
    demo: Option<Demo>,

    /// Stop the simulation at this time (µs) instead of draining.
    #[arg(long)]
    until: Option<u64>,

    /// Emit the full report as JSON.
    #[arg(long)]
    json: bool,

    /// Native command queue depth.
    #[arg(long)]
    ncq_size: Option<usize>,

    /// Write cache size in pages.
    #[arg(long)]
    cache_pages: Option<usize>,

    /// Write coalescing window in µs.
    #[arg(long)]
    writeback_delay: Option<u64>,

    /// LBAs per physical page.
    #[arg(long)]
    lbas_per_page: Option<u64>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Demo {
    /// Ten reads of a warm device, all ready at t=0.
    SyncReads,
    /// Ten reads arriving 20µs apart.
    StaggeredReads,
    /// Alternating reads and writes over two LBAs.
    Mixed,
    /// Write/read interleaving with RAW and WAW hazards.
    HazardMix,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut cfg = SimulatorConfig::default();
    if let Some(ncq_size) = args.ncq_size {
        cfg.ncq_size = ncq_size;
    }
    if let Some(cache_pages) = args.cache_pages {
        cfg.cache.num_pages = cache_pages;
    }
    if let Some(delay) = args.writeback_delay {
        cfg.cache.writeback_delay_us = delay;
    }
    if let Some(lbas_per_page) = args.lbas_per_page {
        cfg.ftl.lbas_per_page = lbas_per_page;
    }

    let mut sim = Simulator::new(cfg).context("invalid configuration")?;

    let trace = match (&args.trace, args.demo) {
        (Some(path), None) => {
            let file = File::open(path)
                .with_context(|| format!("cannot open trace {}", path.display()))?;
            serde_json::from_reader(file)
                .with_context(|| format!("malformed trace {}", path.display()))?
        }
        (None, Some(demo)) => build_demo(demo, &mut sim),
        (None, None) => bail!("pass either --trace <file> or --demo <name>"),
        (Some(_), Some(_)) => unreachable!("clap rejects --trace with --demo"),
    };

    let report = sim.run_until(&trace, args.until);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

/// Seeds mappings for a warm-device demo so its reads have NAND pages to
/// go to, then returns the workload.
fn build_demo(demo: Demo, sim: &mut Simulator) -> Vec<TraceRequest> {
    let warm = |sim: &mut Simulator, lpas: u64| {
        for lpa in 0..lpas {
            sim.ftl_mut().preload(
                Lpa(lpa),
                PhysicalAddress {
                    channel: (lpa % 2) as u32,
                    die: ((lpa / 2) % 2) as u32,
                    plane: 0,
                    block: 0,
                    page: lpa as u32,
                },
            );
        }
    };

    match demo {
        Demo::SyncReads => {
            warm(sim, 8);
            (0..10).map(|lba| TraceRequest::read(lba, 0)).collect()
        }
        Demo::StaggeredReads => {
            warm(sim, 8);
            (0..10)
                .map(|lba| TraceRequest::read(lba, 20 * lba))
                .collect()
        }
        Demo::Mixed => (0..10)
            .map(|i| {
                let lba = i % 2;
                if i % 3 == 0 {
                    TraceRequest::write(lba, 10 * i)
                } else {
                    TraceRequest::read(lba, 10 * i)
                }
            })
            .collect(),
        Demo::HazardMix => vec![
            TraceRequest::write(0, 0),
            TraceRequest::read(0, 0),
            TraceRequest::read(1, 0),
            TraceRequest::write(1, 0),
            TraceRequest::read(1, 0),
            TraceRequest::read(2, 0),
        ],
    }
}

fn print_report(report: &SimReport) {
    println!("{:>5} {:>6} {:>6} {:>9} {:>10} {:>9}", "req", "op", "lba", "arrival", "complete", "resp µs");
    for request in &report.completed {
        let op = match request.kind {
            RequestKind::Read => "read",
            RequestKind::Write => {
                if request.fua() {
                    "write+"
                } else {
                    "write"
                }
            }
            RequestKind::Flush => "flush",
        };
        println!(
            "{:>5} {:>6} {:>6} {:>9} {:>10} {:>9}",
            request.id.0,
            op,
            request.lba.0,
            fmt_stamp(request.trace.get(Stage::Arrival)),
            fmt_stamp(request.trace.get(Stage::Completion)),
            fmt_stamp(request.response_time_us()),
        );
    }

    let stats = &report.stats;
    println!();
    println!("NAND reads:      {}", stats.nand_reads);
    println!("NAND writes:     {}", stats.nand_writes);
    println!(
        "cache hit rate:  {}",
        stats
            .cache_hit_rate()
            .map_or_else(|| "n/a".into(), |r| format!("{:.1}%", 100.0 * r))
    );
    println!(
        "write amp:       {}",
        stats
            .write_amplification()
            .map_or_else(|| "n/a".into(), |wa| format!("{wa:.2}"))
    );
}

fn fmt_stamp(stamp: Option<u64>) -> String {
    stamp.map_or_else(|| "-".into(), |t| t.to_string())
}
