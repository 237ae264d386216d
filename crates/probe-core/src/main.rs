//! Crash probe core - event-to-evidence pipeline
//!
//! The main entry point for probe-core, handling:
//! - Config validation (`check`)
//! - One-shot dispatch of a crash, info, uptime, reboot or VM event

use clap::{Args, Parser, Subcommand, ValueEnum};
use probe_config::{load_resolved, ProbeConfig};
use probe_core::classify::CrashSpec;
use probe_core::collect::ToolRunner;
use probe_core::event::{Channel, EventRecord, EventType};
use probe_core::exit_codes::ExitCode;
use probe_core::logging::{generate_run_id, init_logging, LogConfig, LogFormat, LogLevel};
use probe_core::platform::SystemPlatform;
use probe_core::sender::init_senders;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, info_span};

/// Crash probe - collect evidence for crash, info, reboot and VM events
#[derive(Parser)]
#[command(name = "probe-core")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Path to probe.json (default: PROBE_CONFIG, then XDG config home)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Log format (human, jsonl)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate the configuration, then print a summary
    Check(CheckArgs),
    /// Initialize senders and dispatch a single event
    Dispatch(DispatchArgs),
}

#[derive(Args, Debug)]
struct CheckArgs {
    /// Print the summary as a JSON object
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct DispatchArgs {
    /// Event kind
    #[arg(value_enum)]
    kind: DispatchKind,

    /// Crash or info name (required for crash and info)
    #[arg(long)]
    name: Option<String>,

    /// Trigger-relative path reported by the watcher
    #[arg(long, default_value = "")]
    path: String,

    /// Delivery channel (inotify, polling, timer, oneshot)
    #[arg(long, default_value = "inotify")]
    channel: Channel,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DispatchKind {
    Crash,
    Info,
    Uptime,
    Reboot,
    Vm,
}

fn main() {
    let cli = Cli::parse();

    let log_config = LogConfig::from_env(cli.global.log_level, cli.global.log_format);
    init_logging(&log_config);

    let run_id = generate_run_id();
    let span = info_span!("probe", run_id = %run_id);
    let _guard = span.enter();

    let code = run(cli);
    std::process::exit(code.as_i32());
}

fn run(cli: Cli) -> ExitCode {
    let (mut config, resolved) = match load_resolved(cli.global.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            error!(error = %e, "configuration unusable");
            eprintln!("probe-core: {e}");
            return ExitCode::from(&e);
        }
    };
    info!(path = %resolved.path.display(), source = %resolved.source, "configuration loaded");

    match cli.command {
        Commands::Check(args) => {
            print_summary(&config, &resolved.path, args.json);
            ExitCode::Clean
        }
        Commands::Dispatch(args) => dispatch(&mut config, &args),
    }
}

fn print_summary(config: &ProbeConfig, path: &std::path::Path, json: bool) {
    if json {
        let summary = serde_json::json!({
            "config": path,
            "schema": config.schema_version,
            "logs": config.logs.len(),
            "crashes": config.crashes.len(),
            "infos": config.infos.len(),
            "senders": config.senders.iter().map(|s| &s.name).collect::<Vec<_>>(),
            "vms": config.vms.len(),
        });
        println!("{summary}");
        return;
    }
    println!("config: {}", path.display());
    println!("schema: {}", config.schema_version);
    println!("logs: {}", config.logs.len());
    println!("crashes: {}", config.crashes.len());
    println!("infos: {}", config.infos.len());
    println!("senders: {}", config.senders.len());
    println!("vms: {}", config.vms.len());
}

fn dispatch(config: &mut ProbeConfig, args: &DispatchArgs) -> ExitCode {
    let mut event = match build_event(config, args) {
        Ok(event) => event,
        Err(msg) => {
            eprintln!("probe-core: {msg}");
            return ExitCode::ArgsError;
        }
    };

    let platform = Arc::new(SystemPlatform::new(
        config.platform.clone(),
        ToolRunner::with_defaults(),
    ));
    let mut senders = match init_senders(config, platform) {
        Ok(set) => set,
        Err(e) => {
            error!(error = %e, "sender bootstrap failed");
            eprintln!("probe-core: {e}");
            return ExitCode::from(&e);
        }
    };

    senders.dispatch(config, &mut event);
    if let Some(dir) = &event.dir {
        println!("{}", dir.display());
    }
    ExitCode::Clean
}

fn build_event(config: &ProbeConfig, args: &DispatchArgs) -> Result<EventRecord, String> {
    let channel = args.channel;
    match args.kind {
        DispatchKind::Crash => {
            let name = args.name.as_deref().ok_or("crash dispatch requires --name")?;
            let desc = config
                .crash(name)
                .ok_or_else(|| format!("unknown crash: {name}"))?;
            let spec = Arc::new(CrashSpec::from_descriptor(desc));
            Ok(EventRecord::crash(spec, channel, args.path.as_str()))
        }
        DispatchKind::Info => {
            let name = args.name.as_deref().ok_or("info dispatch requires --name")?;
            let spec = config
                .info(name)
                .ok_or_else(|| format!("unknown info: {name}"))?;
            Ok(EventRecord::info(Arc::new(spec.clone()), channel))
        }
        DispatchKind::Uptime => Ok(EventRecord::new(EventType::Uptime, channel)),
        DispatchKind::Reboot => Ok(EventRecord::new(EventType::Reboot, channel)),
        DispatchKind::Vm => Ok(EventRecord::new(EventType::Vm, channel)),
    }
}
