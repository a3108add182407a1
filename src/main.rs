use anyhow::Result;
use clap::{Parser, Subcommand};
use nutriscan::classifier::ClassifiedResult;
use nutriscan::decoder::{ScanMode, Symbology};
use nutriscan::lookup::Product;
use nutriscan::scanner::SessionOutcome;
use nutriscan::source::FacingMode;
use nutriscan::{NutriscanApp, NutriscanConfig, NutriscanError};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "nutriscan")]
#[command(about = "Scan product barcodes and marking codes, then look up nutrition facts")]
#[command(version)]
#[command(long_about = "Decodes retail barcodes, Honest Sign DataMatrix marking codes and QR codes \
from a camera or still images using a chain of barcode engines, classifies the payload, \
looks up nutrition data and keeps a local scan history.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "nutriscan.toml", help = "Path to TOML configuration file")]
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

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify a decoded payload without scanning
    Classify {
        payload: String,
        /// Symbology reported by the decoder (ean13, datamatrix, qr, ...)
        #[arg(long)]
        symbology: Option<Symbology>,
    },
    /// Look up a manually entered barcode
    Lookup {
        code: String,
        /// Add the product to the scan history
        #[arg(long)]
        save: bool,
    },
    /// Decode still images (photo mode)
    ScanImage {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// retail, marking or qr
        #[arg(long)]
        mode: Option<ScanMode>,
        #[arg(long)]
        save: bool,
    },
    /// Scan from the camera until a code is found or Ctrl+C
    Live {
        #[arg(long)]
        mode: Option<ScanMode>,
        /// rear or front
        #[arg(long, default_value = "rear")]
        facing: FacingMode,
        /// Replay images from this directory instead of opening a camera
        #[arg(long, value_name = "DIR")]
        frames_dir: Option<PathBuf>,
        #[arg(long)]
        save: bool,
    },
    /// Show or clear the scan history
    History {
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        clear: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    init_logging(&args)?;

    info!("Starting nutriscan v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let config = match NutriscanConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        eprintln!("✗ Configuration validation failed: {}", e);
        std::process::exit(1);
    }

    if args.validate_config {
        println!("✓ Configuration is valid");
        return Ok(());
    }

    let command = match args.command {
        Some(command) => command,
        None => {
            eprintln!("No command given; see --help");
            std::process::exit(2);
        }
    };

    let default_mode = config.scanner.default_mode;
    let app = NutriscanApp::new(config)?;

    let exit_code = match run_command(&app, command, default_mode).await {
        Ok(code) => code,
        Err(NutriscanError::Scan(e)) => {
            error!("Scan failed: {}", e);
            eprintln!("✗ {}", e);
            eprintln!("  {}", e.user_message());
            1
        }
        Err(NutriscanError::InvalidInput { message }) => {
            eprintln!("✗ {}", message);
            2
        }
        Err(e) => return Err(e.into()),
    };

    std::process::exit(exit_code);
}

async fn run_command(
    app: &NutriscanApp,
    command: Command,
    default_mode: ScanMode,
) -> nutriscan::Result<i32> {
    match command {
        Command::Classify { payload, symbology } => {
            let classified = app.classifier().classify_payload(&payload, symbology);
            print_classification(&classified);
            Ok(0)
        }
        Command::Lookup { code, save } => {
            let (id, product) = app.lookup_manual(&code).await?;
            print_product(&id, &product);
            if save {
                app.remember(&product, &id).await?;
            }
            Ok(0)
        }
        Command::ScanImage { paths, mode, save } => {
            scan_images(app, &paths, mode.unwrap_or(default_mode), save).await
        }
        Command::Live {
            mode,
            facing,
            frames_dir,
            save,
        } => {
            let provider = app.video_provider(frames_dir.as_deref())?;
            let report = app
                .run_live(provider, mode.unwrap_or(default_mode), facing)
                .await?;

            match report.outcome {
                SessionOutcome::Found(code, classified) => {
                    println!("Decoded by {}: {}", code.engine, code.payload);
                    print_classification(&classified);
                    report_product(app, &classified, save).await?;
                    Ok(0)
                }
                SessionOutcome::Cancelled => {
                    println!("Scan stopped");
                    Ok(0)
                }
                SessionOutcome::Failed(e) => Err(e.into()),
            }
        }
        Command::History { limit, clear } => {
            if clear {
                let removed = app.clear_history().await?;
                println!("Cleared {} history entries", removed);
                return Ok(0);
            }

            let history = app.history().await;
            if history.is_empty() {
                println!("History is empty");
                return Ok(0);
            }

            let limit = limit.unwrap_or(app.config().history.display_limit);
            for entry in history.recent(limit) {
                println!(
                    "{}  {:<32} {:>6} kcal  {}P/{}F/{}C  {}",
                    entry.scanned_at.format("%Y-%m-%d %H:%M"),
                    entry.name,
                    entry.calories,
                    entry.protein,
                    entry.fat,
                    entry.carbs,
                    entry.barcode
                );
            }
            Ok(0)
        }
    }
}

#[cfg(feature = "images")]
async fn scan_images(
    app: &NutriscanApp,
    paths: &[PathBuf],
    mode: ScanMode,
    save: bool,
) -> nutriscan::Result<i32> {
    let mut misses = 0;

    for path in paths {
        match app.scan_image(path, mode).await? {
            Some((code, classified)) => {
                println!("{}: decoded by {}: {}", path.display(), code.engine, code.payload);
                print_classification(&classified);
                report_product(app, &classified, save).await?;
            }
            None => {
                println!("{}: no code found", path.display());
                misses += 1;
            }
        }
    }

    Ok(if misses == 0 { 0 } else { 3 })
}

#[cfg(not(feature = "images"))]
async fn scan_images(
    _app: &NutriscanApp,
    _paths: &[PathBuf],
    _mode: ScanMode,
    _save: bool,
) -> nutriscan::Result<i32> {
    Err(NutriscanError::invalid_input(
        "This build cannot read images (images feature disabled)",
    ))
}

async fn report_product(
    app: &NutriscanApp,
    classified: &ClassifiedResult,
    save: bool,
) -> nutriscan::Result<()> {
    if let Some((id, product)) = app.resolve(classified).await {
        print_product(&id, &product);
        if save {
            app.remember(&product, &id).await?;
        }
    }
    Ok(())
}

fn print_classification(classified: &ClassifiedResult) {
    println!("  kind:       {:?}", classified.kind);
    println!(
        "  identifier: {}",
        classified.product_identifier.as_deref().unwrap_or("-")
    );
    if let Some(annotation) = classified.annotation {
        println!("  note:       {:?}", annotation);
    }
}

fn print_product(id: &str, product: &Product) {
    println!("{} ({})", product.name, product.brand);
    println!("  barcode:  {}", id);
    println!("  calories: {} kcal", product.calories);
    println!(
        "  protein {} g / fat {} g / carbs {} g",
        product.protein, product.fat, product.carbs
    );
    println!("  weight:   {}", product.weight);
    println!("  source:   {}", product.source);
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
        .unwrap_or_else(|_| EnvFilter::new(format!("nutriscan={}", log_level)));

    // Logs go to stderr so scan results on stdout stay pipeable
    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("pretty") => fmt::layer()
            .pretty()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some("compact") | None => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
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
    println!("# Nutriscan configuration file");
    println!("# Every option with its default value; NUTRISCAN_<SECTION>__<KEY> overrides");
    println!();
    print!("{}", toml::to_string_pretty(&NutriscanConfig::default())?);
    Ok(())
}
