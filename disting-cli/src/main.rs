//! Headless runner for the Disting NT emulator core.
//!
//! Loads a Rhai script, restores saved wiring, runs the frame loop in real
//! time and prints the output jacks once per second.

use std::fs::File;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use disting_core::config::{default_state_path, Config};
use disting_core::{
    Emulator, JsonStateStore, NullSink, OscOutputSink, OscSettings, OutputSink, StateStore,
};
use disting_types::EngineAction;

struct Args {
    script: Option<PathBuf>,
    seconds: f64,
    bpm: Option<f64>,
    clock_inputs: Vec<usize>,
    verbose: bool,
    log_file: Option<PathBuf>,
    osc: Option<SocketAddr>,
    state: Option<PathBuf>,
    no_state: bool,
}

fn usage() -> ! {
    eprintln!(
        "usage: disting-emu [SCRIPT] [--seconds N] [--bpm N] [--clock 1,2,..] \
         [--osc HOST:PORT] [--state PATH | --no-state] [--log-file PATH] [--verbose]"
    );
    std::process::exit(2);
}

fn value_of<'a>(args: &'a [String], flag: &str) -> Option<&'a String> {
    args.iter().position(|a| a == flag).and_then(|i| args.get(i + 1))
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        usage();
    }

    let parse_f64 = |flag: &str| -> Option<f64> {
        value_of(&args, flag).map(|v| v.parse().unwrap_or_else(|_| usage()))
    };

    // First argument that is neither a flag nor a flag's value
    let takes_value = [
        "--seconds",
        "--bpm",
        "--clock",
        "--osc",
        "--state",
        "--log-file",
    ];
    let mut script = None;
    let mut skip = false;
    for arg in &args {
        if skip {
            skip = false;
        } else if takes_value.contains(&arg.as_str()) {
            skip = true;
        } else if !arg.starts_with('-') && script.is_none() {
            script = Some(PathBuf::from(arg));
        }
    }

    Args {
        script,
        seconds: parse_f64("--seconds").unwrap_or(10.0),
        bpm: parse_f64("--bpm"),
        clock_inputs: value_of(&args, "--clock")
            .map(|s| {
                s.split(',')
                    .filter_map(|n| n.trim().parse().ok())
                    .collect()
            })
            .unwrap_or_default(),
        verbose: args.iter().any(|a| a == "--verbose" || a == "-v"),
        log_file: value_of(&args, "--log-file").map(PathBuf::from),
        osc: value_of(&args, "--osc").map(|s| s.parse().unwrap_or_else(|_| usage())),
        state: value_of(&args, "--state").map(PathBuf::from),
        no_state: args.iter().any(|a| a == "--no-state"),
    }
}

fn init_logging(verbose: bool, log_file: Option<&PathBuf>) {
    use simplelog::{ColorChoice, LevelFilter, TermLogger, TerminalMode, WriteLogger};

    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };

    let result = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            match File::create(path) {
                Ok(file) => WriteLogger::init(log_level, simplelog::Config::default(), file),
                Err(e) => {
                    eprintln!("cannot create log file {}: {}", path.display(), e);
                    return;
                }
            }
        }
        None => TermLogger::init(
            log_level,
            simplelog::Config::default(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        ),
    };
    if let Err(e) = result {
        eprintln!("failed to initialize logger: {}", e);
        return;
    }

    log::info!("disting-emu starting (log level: {:?})", log_level);
}

fn output_sink(args: &Args, config: &Config) -> Box<dyn OutputSink> {
    let settings = match args.osc {
        Some(target) => Some(OscSettings {
            target,
            address: config
                .osc_settings()
                .map(|s| s.address)
                .unwrap_or_else(|| "/disting/outputs".to_string()),
        }),
        None => config.osc_settings(),
    };
    match settings {
        Some(settings) => match OscOutputSink::spawn(&settings) {
            Ok(sink) => Box::new(sink),
            Err(e) => {
                log::error!("could not open OSC socket: {}", e);
                Box::new(NullSink)
            }
        },
        None => Box::new(NullSink),
    }
}

fn print_outputs(emu: &Emulator) {
    let volts: Vec<String> = emu.outputs().iter().map(|v| format!("{:+6.2}", v)).collect();
    println!("t={:7.2}s  out [{}]", emu.elapsed(), volts.join(" "));
    for note in emu.notifications().iter() {
        if (emu.elapsed() - note.created_at) < 1.0 {
            println!("           {:?}: {}", note.level, note.message);
        }
    }
}

fn main() -> std::io::Result<()> {
    let args = parse_args();
    init_logging(args.verbose, args.log_file.as_ref());

    let config = Config::load();
    let mut emu = Emulator::new(config.engine_settings());

    let store: Option<JsonStateStore> = if args.no_state {
        None
    } else {
        Some(JsonStateStore::new(
            args.state.clone().unwrap_or_else(default_state_path),
        ))
    };
    let saved = store.as_ref().and_then(|s| s.load());

    let script = args
        .script
        .clone()
        .or_else(|| saved.as_ref().and_then(|s| s.script_path.clone()));
    match &script {
        Some(path) => {
            if let Err(e) = emu.load_script_file(path) {
                eprintln!("failed to load {}: {}", path.display(), e);
                std::process::exit(1);
            }
        }
        None => log::warn!("no script given; running inputs only"),
    }
    if let Some(saved) = &saved {
        emu.restore(saved);
    }

    let mut startup = Vec::new();
    if let Some(bpm) = args.bpm {
        startup.push(("--bpm", EngineAction::SetBpm(bpm)));
    }
    for input in &args.clock_inputs {
        startup.push((
            "--clock",
            EngineAction::SetClockEnabled {
                input: *input,
                enabled: true,
            },
        ));
    }
    for (flag, action) in &startup {
        let result = match &store {
            Some(store) => emu.dispatch_with(action, store),
            None => emu.dispatch(action),
        };
        if let Err(e) = result {
            log::warn!("{}: {}", flag, e);
        }
    }

    let mut sink = output_sink(&args, &config);
    let frame = Duration::from_secs_f64(1.0 / config.frame_rate() as f64);
    let start = Instant::now();
    let mut last = start;
    let mut next_report = 0.0;

    while start.elapsed().as_secs_f64() < args.seconds {
        let now = Instant::now();
        let dt = now.duration_since(last).as_secs_f64();
        last = now;

        emu.run_frame(dt, sink.as_mut());
        if emu.elapsed() >= next_report {
            emu.draw();
            print_outputs(&emu);
            next_report += 1.0;
        }

        let spent = now.elapsed();
        if spent < frame {
            std::thread::sleep(frame - spent);
        }
    }

    log::info!(
        "ran {} frames, {} script faults",
        emu.frames(),
        emu.sandbox().fault_count()
    );
    if let Some(store) = &store {
        emu.save_state(store);
        log::info!("state saved to {}", store.path().display());
    }
    Ok(())
}
