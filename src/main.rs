use anyhow::{bail, Context, Result};
use clap::Parser;
use scanview::{
    Barcode, BarcodeFormat, HostLifecycleEvent, ScannerEvent, ScannerView, ScanviewConfig,
    SimulatedBridge, Size,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "scanview")]
#[command(about = "Barcode scanner view coordinator driven by a simulated camera")]
#[command(version)]
#[command(long_about = "Runs a scripted barcode scanning session against a simulated camera \
bridge: the preview is laid out, a scan window is mapped into texture space, detections are \
delivered, and the host app is backgrounded and resumed before the view is disposed.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "scanview.toml", help = "Path to TOML configuration file")]
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
    #[arg(long, help = "Validate configuration file and exit without scanning")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Preview size in logical pixels
    #[arg(long, value_name = "WxH", default_value = "390x844")]
    widget_size: String,

    /// Camera texture size reported by the simulated bridge
    #[arg(long, value_name = "WxH", default_value = "1080x1920")]
    texture_size: String,

    /// Number of simulated detections to deliver
    #[arg(long, default_value_t = 3)]
    detections: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    init_logging(&args)?;

    info!("Starting scanview v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let config = match ScanviewConfig::load_from_file(&args.config) {
        Ok(config) => {
            info!("Configuration loaded successfully from: {}", args.config);
            config
        }
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

    let widget_size = parse_size(&args.widget_size)?;
    let texture_size = parse_size(&args.texture_size)?;

    run_session(&config, widget_size, texture_size, args.detections).await
}

async fn run_session(
    config: &ScanviewConfig,
    widget_size: Size,
    texture_size: Size,
    detections: usize,
) -> Result<()> {
    let bridge = Arc::new(SimulatedBridge::new(texture_size));
    let mut view = ScannerView::new(config, bridge.clone())?;
    let mut events = view.subscribe_events();

    view.on_layout(widget_size);
    if let Err(e) = view.attach().await {
        error!("Scanner failed to start: {}", e);
        view.dispose().await;
        return Err(e.into());
    }
    if !view.state().is_running() {
        view.start().await?;
    }

    match (view.scan_window(), view.overlay_window()) {
        (Some(window), Some(overlay)) => {
            println!("Scan window (texture-relative): {}", window);
            println!("Visible part for the overlay: {}", overlay);
        }
        _ => println!("Scan window: full frame"),
    }

    for index in 0..detections {
        bridge.emit_detection(vec![Barcode::new(
            BarcodeFormat::QrCode,
            format!("scanview-demo-{}", index),
        )]);
    }

    let mut delivered = 0;
    while delivered < detections {
        match tokio::time::timeout(Duration::from_secs(1), events.recv()).await {
            Ok(Ok(ScannerEvent::BarcodesDetected(detection))) => {
                delivered += 1;
                for barcode in &detection.barcodes {
                    println!(
                        "Detected {:?}: {}",
                        barcode.format,
                        barcode.raw_value.as_deref().unwrap_or("<binary>")
                    );
                }
            }
            Ok(Ok(event)) => info!("Event: {}", event.description()),
            Ok(Err(e)) => {
                warn!("Event stream interrupted: {}", e);
                break;
            }
            Err(_) => {
                warn!("Timed out waiting for detections");
                break;
            }
        }
    }

    view.on_host_lifecycle_change(HostLifecycleEvent::Paused)
        .await?;
    println!("Backgrounded: {}", view.state().lifecycle);
    view.on_host_lifecycle_change(HostLifecycleEvent::Resumed)
        .await?;
    println!("Resumed: {}", view.state().lifecycle);

    view.dispose().await;
    info!(
        "Session finished: {} start(s), {} stop(s)",
        bridge.start_calls(),
        bridge.stop_calls()
    );
    Ok(())
}

fn parse_size(value: &str) -> Result<Size> {
    let Some((width, height)) = value.split_once(['x', 'X']) else {
        bail!("expected WIDTHxHEIGHT, got '{}'", value);
    };
    let width: f64 = width
        .trim()
        .parse()
        .with_context(|| format!("invalid width in '{}'", value))?;
    let height: f64 = height
        .trim()
        .parse()
        .with_context(|| format!("invalid height in '{}'", value))?;
    Ok(Size::new(width, height))
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
        .unwrap_or_else(|_| EnvFilter::new(format!("scanview={}", log_level)));

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
    println!("# Scanview Configuration File");
    println!("# This is the default configuration with all available options");
    println!();
    println!("{}", ScanviewConfig::default().to_toml()?);
    Ok(())
}
