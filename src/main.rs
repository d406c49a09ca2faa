use loopwatch::config::SequencerConfig;
use loopwatch::grid;
use loopwatch::monitor::ConsoleMonitor;
use loopwatch::presets;
use loopwatch::publisher::Session;

use clap::Parser;
use log::info;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "loopwatch")]
#[command(about = "Deterministic loop-clock note window resolver")]
struct Cli {
    /// Tempo in beats per minute
    #[arg(long, default_value_t = 120.0)]
    bpm: f64,

    /// Built-in note set: "melody", "pulse", or "full"
    #[arg(long, default_value = "full")]
    preset: String,

    /// JSON configuration file (overrides --bpm/--preset/--arrangement)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Arrangement mask as a 16-character bitstring, e.g. "1111000011110000".
    /// "demo" selects the built-in sparse arrangement.
    #[arg(long)]
    arrangement: Option<String>,

    /// Lookahead window in seconds
    #[arg(long, default_value_t = 2.0)]
    lookahead: f64,

    /// Retention window in seconds
    #[arg(long, default_value_t = 0.5)]
    retention: f64,

    /// Refresh interval in milliseconds
    #[arg(long, default_value_t = 50)]
    refresh_ms: u64,

    /// Print snapshots as JSON lines instead of the dashboard
    #[arg(long)]
    json: bool,

    /// Dashboard redraw rate (Hz)
    #[arg(long, default_value_t = 10)]
    display_hz: u32,

    /// Stop after this many seconds (0 = run until Ctrl+C)
    #[arg(long, default_value_t = 0.0)]
    duration: f64,
}

fn parse_arrangement(bits: &str) -> Result<Vec<bool>, String> {
    if bits == "demo" {
        return Ok(presets::demo_arrangement());
    }
    bits.chars()
        .map(|c| match c {
            '1' => Ok(true),
            '0' => Ok(false),
            other => Err(format!("arrangement bitstring: unexpected '{}'", other)),
        })
        .collect()
}

fn build_config(cli: &Cli) -> Result<SequencerConfig, String> {
    if let Some(path) = &cli.config {
        let json = std::fs::read_to_string(path)
            .map_err(|e| format!("read {}: {}", path.display(), e))?;
        return SequencerConfig::from_json(&json);
    }

    let notes = match cli.preset.as_str() {
        "melody" => presets::demo_melody(),
        "pulse" => presets::four_on_the_floor(),
        "full" => presets::demo_full(),
        other => return Err(format!("unknown preset: {}", other)),
    };

    let arrangement = match &cli.arrangement {
        Some(bits) => Some(parse_arrangement(bits)?),
        None => None,
    };

    let config = SequencerConfig {
        bpm: cli.bpm,
        notes,
        arrangement,
        lookahead_seconds: cli.lookahead,
        retention_seconds: cli.retention,
        refresh_interval_ms: cli.refresh_ms,
    };
    config.validate()?;
    Ok(config)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    let config = match build_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!("═══════════════════════════════════════════════");
    info!("  LOOPWATCH v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "  Tempo: {} bpm  ({:.1}s loop)",
        config.bpm,
        grid::loop_length_seconds(config.bpm)
    );
    info!("  Notes: {}", config.notes.len());
    info!(
        "  Windows: lookahead {:.2}s, retention {:.2}s, refresh {}ms",
        config.lookahead_seconds, config.retention_seconds, config.refresh_interval_ms
    );
    info!("═══════════════════════════════════════════════");

    let refresh_ms = config.refresh_interval_ms;
    let mut session = match Session::new(config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let rx = session.cell().subscribe();
    let mut handles = Vec::new();

    if cli.json {
        handles.push(
            thread::Builder::new()
                .name("json-out".into())
                .spawn(move || {
                    for snap in rx.iter() {
                        match serde_json::to_string(&snap) {
                            Ok(line) => println!("{}", line),
                            Err(e) => log::warn!("serialize snapshot: {}", e),
                        }
                    }
                })
                .unwrap(),
        );
    } else {
        let hz = cli.display_hz;
        handles.push(
            thread::Builder::new()
                .name("monitor".into())
                .spawn(move || {
                    ConsoleMonitor::new(rx, refresh_ms, hz).run();
                })
                .unwrap(),
        );
    }

    if cli.duration > 0.0 {
        thread::sleep(Duration::from_secs_f64(cli.duration));
        info!("duration elapsed, shutting down");
        session.dispose();
    } else {
        info!("Running. Press Ctrl+C to stop.");
        for h in handles {
            let _ = h.join();
        }
    }
}
