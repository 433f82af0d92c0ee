//! Selective-Repeat ARQ simulator CLI
//!
//! Run a single configurable simulation, or the named scenarios.

use arq_core::ProtocolConfig;
use arq_sim::{ArrivalProcess, ScenarioId, ScenarioResult, ScenarioRunner, SimConfig, SimError, SimWorld, TraceExport};
use clap::{Parser, ValueEnum};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Inter-arrival distribution selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Arrivals {
    /// Uniform on [0, 2 * interval]
    Uniform,
    /// Exponential with mean `interval`
    Exponential,
    /// Exactly `interval` apart
    Fixed,
}

/// Selective-Repeat ARQ network simulator
#[derive(Parser, Debug)]
#[command(name = "arq-sim")]
#[command(about = "Drive a Selective-Repeat ARQ link over a lossy, corrupting channel", long_about = None)]
struct Args {
    /// Number of messages to simulate
    #[arg(short = 'n', long, default_value = "20")]
    messages: u64,

    /// Packet loss probability
    #[arg(short, long, default_value = "0.0")]
    loss: f64,

    /// Packet corruption probability
    #[arg(short, long, default_value = "0.0")]
    corrupt: f64,

    /// Average time between messages from the sender's application layer
    #[arg(short, long, default_value = "10.0")]
    interval: f64,

    /// Trace level (0 = warnings, 1 = info, 2 = debug, 3 = everything)
    #[arg(short, long, default_value = "0")]
    trace: u8,

    /// Master seed for determinism
    #[arg(short, long, default_value = "1")]
    seed: u64,

    /// Window size
    #[arg(short, long, default_value = "10")]
    window: u32,

    /// Sequence number modulus (default: window + 1)
    #[arg(long)]
    seq_modulus: Option<u32>,

    /// Retransmission timeout
    #[arg(long, default_value = "20.0")]
    timeout: f64,

    /// Arrival process
    #[arg(long, value_enum, default_value = "uniform")]
    arrivals: Arrivals,

    /// Stop after this simulated time
    #[arg(long)]
    time_limit: Option<f64>,

    /// Scenario to run instead (in_order, single_loss, corrupt_ack, lossy, backpressure, all)
    #[arg(short = 'S', long)]
    scenario: Option<String>,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Export the event trace to a JSON file
    #[arg(long)]
    export: Option<String>,
}

impl Args {
    fn log_level(&self) -> Level {
        match self.trace {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }

    fn sim_config(&self) -> SimConfig {
        let arrivals = match self.arrivals {
            Arrivals::Uniform => ArrivalProcess::Uniform { mean: self.interval },
            Arrivals::Exponential => ArrivalProcess::Exponential { mean: self.interval },
            Arrivals::Fixed => ArrivalProcess::Fixed { interval: self.interval },
        };
        let mut protocol = ProtocolConfig::with_window(self.window).with_timeout(self.timeout);
        if let Some(modulus) = self.seq_modulus {
            protocol = protocol.with_seq_modulus(modulus);
        }
        SimConfig {
            seed: self.seed,
            messages: self.messages,
            loss_probability: self.loss,
            corruption_probability: self.corrupt,
            arrivals,
            trace_level: self.trace,
            protocol,
            time_limit: self.time_limit,
        }
    }
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level())
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Error: failed to set tracing subscriber: {}", e);
    }

    let code = match &args.scenario {
        Some(name) => run_scenarios(&args, name),
        None => run_single(&args),
    };
    std::process::exit(code);
}

/// One simulation from the command-line parameters.
fn run_single(args: &Args) -> i32 {
    let config = args.sim_config();
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return 1;
    }

    if !args.json {
        println!("-----  Selective Repeat Network Simulator Version 1.1 --------");
        println!();
        println!("the number of messages to simulate: {}", config.messages);
        println!("packet loss probability: {:.6}", config.loss_probability);
        println!("packet corruption probability: {:.6}", config.corruption_probability);
        println!("average time between messages from sender's layer5: {:.6}", config.arrivals.mean());
        println!("TRACE: {}", config.trace_level);
    }

    match simulate(config, args.export.as_deref()) {
        Ok(summary) => {
            if args.json {
                match serde_json::to_string_pretty(&summary) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        return 1;
                    }
                }
            } else {
                println!();
                println!("{}", summary.termination_line());
                println!(
                    "packets sent: {}  lost: {}  corrupted: {}  retransmitted: {}  delivered: {}",
                    summary.channel.transmitted,
                    summary.channel.lost,
                    summary.channel.corrupted,
                    summary.sender.retransmissions,
                    summary.messages_delivered,
                );
            }
            0
        }
        Err(e) => {
            error!("Simulation failed: {}", e);
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn simulate(config: SimConfig, export_path: Option<&str>) -> Result<arq_sim::SimSummary, SimError> {
    let mut world = SimWorld::new(config.clone())?;
    if export_path.is_some() {
        world = world.with_recording();
    }
    let summary = world.run()?;

    if let Some(path) = export_path {
        let mut export = TraceExport::new("custom", config);
        export.extend(world.take_records());
        export.finalize(summary.clone(), None);
        export.write_to_file(path)?;
        info!("Exported {} events to {}", export.events.len(), path);
    }
    Ok(summary)
}

/// The named scenarios; `all` runs every one.
fn run_scenarios(args: &Args, name: &str) -> i32 {
    let scenarios: Vec<ScenarioId> = if name == "all" {
        ScenarioId::all()
    } else {
        match name.parse() {
            Ok(id) => vec![id],
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!("Available scenarios: in_order, single_loss, corrupt_ack, lossy, backpressure, all");
                return 1;
            }
        }
    };

    if args.export.is_some() && scenarios.len() > 1 {
        eprintln!("Error: --export only supports a single scenario, not 'all'");
        return 1;
    }

    let runner = ScenarioRunner::new(args.seed).with_trace(args.export.is_some());

    let mut results: Vec<ScenarioResult> = Vec::new();
    for scenario in &scenarios {
        let result = runner.run(*scenario);

        if !args.json {
            if result.passed {
                println!("✓ {} (seed={}) PASSED", scenario.name(), result.seed);
            } else {
                println!(
                    "✗ {} (seed={}) FAILED: {}",
                    scenario.name(),
                    result.seed,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }
        results.push(result);
    }

    if let (Some(path), Some(trace)) = (&args.export, results.first().and_then(|r| r.trace.as_ref())) {
        if let Err(e) = trace.write_to_file(path) {
            eprintln!("Error: failed to write export: {}", e);
            return 1;
        }
        info!("Exported {} events to {}", trace.events.len(), path);
    }

    let total = results.len();
    let failed = results.iter().filter(|r| !r.passed).count();

    if args.json {
        let summary = serde_json::json!({
            "total": total,
            "passed": total - failed,
            "failed": failed,
            "results": results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario.name(),
                    "seed": r.seed,
                    "passed": r.passed,
                    "final_time": r.final_time,
                    "messages_submitted": r.messages_submitted,
                    "messages_delivered": r.messages_delivered,
                    "failure_reason": r.failure_reason,
                    "metrics": r.metrics,
                })
            }).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        }
    } else if failed == 0 {
        println!("All {} scenario runs passed", total);
    } else {
        println!("{}/{} scenario runs failed", failed, total);
    }

    if failed > 0 {
        1
    } else {
        0
    }
}
