//! Frugal deadline CLI.
//!
//! Drives the engine through a few workloads and prints a JSON report.
//!
//! ```text
//! frugal-deadline staggered --delays-ms 100,400
//! frugal-deadline nested --depth 5
//! frugal-deadline flood --threads 150 --per-thread 5 --delay-ms 1000
//! frugal-deadline race --iterations 1000 --delay-us 1000
//! ```

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use serde::Serialize;

use frugal_deadline::config::{load_config, EngineConfig};
use frugal_deadline::observability::{logging, metrics};
use frugal_deadline::{sleep, ContextHandle, DeadlineExceeded, Engine, RequestState, SignalKind};

#[derive(Parser)]
#[command(name = "frugal-deadline")]
#[command(about = "Exercise the single-thread deadline engine", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print Prometheus metrics after the run.
    #[arg(short, long)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// One thread per delay, each blocked until its deadline fires
    Staggered {
        #[arg(long, value_delimiter = ',', default_value = "100,400")]
        delays_ms: Vec<u64>,
    },
    /// Nested deadlines on one thread, all expiring together
    Nested {
        #[arg(long, default_value_t = 5)]
        depth: u32,
        #[arg(long, default_value_t = 100)]
        delay_ms: u64,
    },
    /// Many threads running back-to-back timeouts
    Flood {
        #[arg(long, default_value_t = 50)]
        threads: usize,
        #[arg(long, default_value_t = 5)]
        per_thread: usize,
        #[arg(long, default_value_t = 200)]
        delay_ms: u64,
        #[arg(long, default_value_t = 20)]
        jitter_ms: u64,
    },
    /// Defuse right around the deadline and check exactly one outcome wins
    Race {
        #[arg(long, default_value_t = 1000)]
        iterations: usize,
        #[arg(long, default_value_t = 1000)]
        delay_us: u64,
    },
}

#[derive(Serialize)]
struct StaggeredEntry {
    delay_ms: u64,
    elapsed_ms: f64,
    rank: usize,
    expired: bool,
}

#[derive(Serialize)]
struct NestedReport {
    depth: u32,
    signals_delivered: usize,
    expired: bool,
    elapsed_ms: f64,
}

#[derive(Serialize)]
struct FloodReport {
    timeouts: usize,
    expired: usize,
    max_lateness_ms: f64,
    mean_lateness_ms: f64,
}

#[derive(Serialize)]
struct RaceReport {
    iterations: usize,
    defused: usize,
    enforced: usize,
    violations: usize,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => EngineConfig::default(),
    };
    logging::init_logging(&config.observability)?;

    let prometheus = if cli.metrics || config.observability.metrics_enabled {
        Some(metrics::init_metrics()?)
    } else {
        None
    };

    let engine = Engine::start(&config)?;
    tracing::info!(thread = %config.timer.thread_name, "frugal-deadline starting");

    let report = match cli.command {
        Commands::Staggered { delays_ms } => serde_json::to_value(staggered(&engine, &delays_ms))?,
        Commands::Nested { depth, delay_ms } => serde_json::to_value(nested(&engine, depth, delay_ms))?,
        Commands::Flood {
            threads,
            per_thread,
            delay_ms,
            jitter_ms,
        } => serde_json::to_value(flood(&engine, threads, per_thread, delay_ms, jitter_ms))?,
        Commands::Race {
            iterations,
            delay_us,
        } => serde_json::to_value(race(&engine, iterations, delay_us))?,
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    if let Some(handle) = prometheus {
        println!("{}", handle.render());
    }

    engine.shutdown();
    Ok(())
}

fn ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

fn staggered(engine: &Engine, delays_ms: &[u64]) -> Vec<StaggeredEntry> {
    let finished = Mutex::new(Vec::new());

    thread::scope(|s| {
        for &delay_ms in delays_ms {
            let finished = &finished;
            s.spawn(move || {
                let start = Instant::now();
                let res: Result<(), DeadlineExceeded> =
                    engine.timeout(Duration::from_millis(delay_ms), |_| sleep(Duration::from_secs(3600)));
                let mut finished = finished.lock().unwrap_or_else(|e| e.into_inner());
                let rank = finished.len();
                finished.push(StaggeredEntry {
                    delay_ms,
                    elapsed_ms: ms(start.elapsed()),
                    rank,
                    expired: res.is_err(),
                });
            });
        }
    });

    finished.into_inner().unwrap_or_else(|e| e.into_inner())
}

fn nested(engine: &Engine, depth: u32, delay_ms: u64) -> NestedReport {
    fn descend(engine: &Engine, level: u32, delay: Duration) -> Result<(), DeadlineExceeded> {
        if level == 0 {
            return sleep(Duration::from_secs(3600));
        }
        engine.timeout(delay, |_| descend(engine, level - 1, delay))
    }

    thread::scope(|s| {
        s.spawn(|| {
            let start = Instant::now();
            let res = descend(engine, depth, Duration::from_millis(delay_ms));
            NestedReport {
                depth,
                signals_delivered: ContextHandle::current().signals_delivered(),
                expired: res.is_err(),
                elapsed_ms: ms(start.elapsed()),
            }
        })
        .join()
        .unwrap_or_else(|_| NestedReport {
            depth,
            signals_delivered: 0,
            expired: false,
            elapsed_ms: 0.0,
        })
    })
}

fn flood(engine: &Engine, threads: usize, per_thread: usize, delay_ms: u64, jitter_ms: u64) -> FloodReport {
    let lateness = Arc::new(Mutex::new(Vec::with_capacity(threads * per_thread)));

    thread::scope(|s| {
        for _ in 0..threads {
            let lateness = Arc::clone(&lateness);
            s.spawn(move || {
                for _ in 0..per_thread {
                    let jitter = if jitter_ms > 0 { fastrand::u64(0..jitter_ms) } else { 0 };
                    let delay = Duration::from_millis(delay_ms + jitter);
                    let start = Instant::now();
                    let res: Result<(), DeadlineExceeded> =
                        engine.timeout(delay, |_| sleep(Duration::from_secs(3600)));
                    if res.is_err() {
                        let late = start.elapsed().saturating_sub(delay);
                        lateness.lock().unwrap_or_else(|e| e.into_inner()).push(late);
                    }
                }
            });
        }
    });

    let lateness = lateness.lock().unwrap_or_else(|e| e.into_inner());
    let total: Duration = lateness.iter().sum();
    FloodReport {
        timeouts: threads * per_thread,
        expired: lateness.len(),
        max_lateness_ms: lateness.iter().max().copied().map(ms).unwrap_or(0.0),
        mean_lateness_ms: if lateness.is_empty() {
            0.0
        } else {
            ms(total) / lateness.len() as f64
        },
    }
}

fn race(engine: &Engine, iterations: usize, delay_us: u64) -> RaceReport {
    let mut report = RaceReport {
        iterations,
        defused: 0,
        enforced: 0,
        violations: 0,
    };
    let delay = Duration::from_micros(delay_us);

    for i in 0..iterations {
        let context = ContextHandle::detached();
        let request = engine
            .scheduler()
            .enqueue_for(context.clone(), delay, SignalKind::Timeout);

        // Spread defuse attempts around the deadline.
        let offset = delay.mul_f64((i % 5) as f64 * 0.25 + 0.5);
        thread::sleep(offset);
        request.defuse();

        // Let any late expiry pass run before checking.
        thread::sleep(delay * 2);
        match (request.state(), context.signals_delivered()) {
            (RequestState::Defused, 0) => report.defused += 1,
            (RequestState::Enforced, 1) => report.enforced += 1,
            (state, delivered) => {
                tracing::warn!(?state, delivered, "Defuse race produced an inconsistent outcome");
                report.violations += 1;
            }
        }
    }

    report
}
