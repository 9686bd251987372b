use anyhow::Result;
use clap::Parser;
use std::io::IsTerminal;
use torchlight::{Backends, Mode, TorchController, TorchlightConfig};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "torchlight")]
#[command(about = "Camera torch controller with timed lighting modes")]
#[command(version)]
#[command(long_about = "Drives a camera flash LED as a flashlight with steady, strobe, SOS, \
Morse, disco, sound-reactive and mood modes. Shaking the device or clapping can toggle the \
light when the motion or sound trigger is enabled.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "torchlight.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Run against in-memory backends
    #[arg(long, help = "Use simulated torch, microphone and motion backends")]
    simulate: bool,

    /// Initial mode
    #[arg(long, value_name = "MODE", default_value = "steady", help = "Initial mode: steady, strobe, sos, morse, disco, sound, mood")]
    mode: Mode,

    /// Start with the light on
    #[arg(long, help = "Start with the torch active")]
    active: bool,

    /// Enable the shake trigger
    #[arg(long, help = "Toggle the torch by shaking the device")]
    motion: bool,

    /// Enable the clap trigger
    #[arg(long, help = "Toggle the torch with loud sounds while sound-reactive is selected")]
    sound_trigger: bool,

    /// Disable terminal key control
    #[arg(long, help = "Do not read keys from the terminal")]
    no_keyboard: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Handle special modes that don't require full initialization
    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    init_logging(&args)?;

    info!("Starting torchlight v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let mut config = match TorchlightConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if args.validate_config {
        match config.validate() {
            Ok(()) => {
                info!("Configuration validation successful");
                println!("✓ Configuration is valid");
                return Ok(());
            }
            Err(e) => {
                error!("Configuration validation failed: {}", e);
                eprintln!("✗ Configuration validation failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    config.validate().map_err(|e| {
        error!("Invalid configuration: {}", e);
        e
    })?;

    if args.motion {
        config.triggers.motion_enabled = true;
    }
    if args.sound_trigger {
        config.triggers.sound_enabled = true;
    }

    let backends = if args.simulate {
        info!("Using simulated backends");
        Backends::simulated()
    } else {
        Backends::from_config(&config)
    };

    let mut controller = TorchController::with_backends(config, backends);
    controller.set_keyboard_enabled(!args.no_keyboard && std::io::stdin().is_terminal());

    controller
        .start(args.mode, args.active)
        .await
        .map_err(|e| {
            error!("Failed to start torchlight: {}", e);
            e
        })?;

    let exit_code = controller.run().await.map_err(|e| {
        error!("System error during execution: {}", e);
        e
    })?;

    info!("Torchlight exited with code: {}", exit_code);
    std::process::exit(exit_code);
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("torchlight={}", log_level)));

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();

    Ok(())
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# Torchlight Configuration File");
    println!("# Every key is optional; TORCHLIGHT_<SECTION>__<KEY> environment variables override the file");
    println!();
    println!("{}", toml::to_string_pretty(&TorchlightConfig::default())?);
    Ok(())
}
