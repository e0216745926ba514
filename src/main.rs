//! Binary entrypoint for the dtulink CLI.
//!
//! Commands:
//! - `start [--port <path>]` - run the gateway, optionally overriding the serial port
//! - `init` - create a starter `config.toml`
//! - `status` - print the active configuration summary
//!
//! See the library crate docs for module-level details: `dtulink::`.
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{info, warn};

use dtulink::cloud::publish::ReliablePublisher;
use dtulink::cloud::NullCloudClient;
use dtulink::config::{Config, Settings};
use dtulink::registry::HandlerRegistry;
use dtulink::relay::downlink::DownlinkRelay;
use dtulink::relay::ota::OtaOrchestrator;
use dtulink::relay::uplink::UplinkRelay;
use dtulink::relay::PassthroughSegmenter;
use dtulink::watchdog::Watchdog;

#[derive(Parser)]
#[command(name = "dtulink")]
#[command(about = "Serial-to-cloud gateway runtime for DTU devices")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway
    Start {
        /// Serial port of the attached instrument (e.g., /dev/ttyUSB0)
        #[arg(short, long)]
        port: Option<String>,
    },
    /// Initialize a new gateway configuration
    Init,
    /// Show the active configuration summary
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config early to configure logging (except for Init which writes it)
    let pre_config = match cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).await.ok(),
    };
    init_logging(&pre_config, cli.verbose);

    match cli.command {
        Commands::Start { port } => {
            let mut config = match pre_config {
                Some(config) => config,
                None => Config::load(&cli.config).await?,
            };
            if let Some(port) = port {
                config.uart.port = port;
            }
            info!("Starting dtulink v{}", env!("CARGO_PKG_VERSION"));
            run_gateway(config, &cli.config).await?;
        }
        Commands::Init => {
            Config::create_default(&cli.config).await?;
            println!("Created starter configuration at {}", cli.config);
        }
        Commands::Status => {
            let config = Config::load(&cli.config).await?;
            let profile = config
                .cloud_profiles
                .get(&config.system.cloud)
                .cloned()
                .unwrap_or_default();
            println!("dtulink v{}", env!("CARGO_PKG_VERSION"));
            println!("  serial port:   {} @ {} baud", config.uart.port, config.uart.baud_rate);
            println!("  cloud profile: {}", config.system.cloud);
            println!(
                "  topic routes:  {} publish, {} subscribe",
                profile.publish.len(),
                profile.subscribe.len()
            );
            println!("  fota:          {}", config.system.base_function.fota);
            println!(
                "  ota confirm:   {}",
                config.system.base_function.ota_auto_confirm
            );
            println!(
                "  watchdog:      every {}s",
                config.watchdog.interval_secs
            );
        }
    }

    Ok(())
}

/// Wire collaborators, run the startup OTA check, start the supervised
/// uplink loop, and serve until ctrl-c.
async fn run_gateway(config: Config, config_path: &str) -> Result<()> {
    let uart = config.uart.clone();
    let watchdog_interval = Duration::from_secs(config.watchdog.interval_secs);
    let settings = Arc::new(Settings::with_path(config, config_path));

    let mut registry = HandlerRegistry::new();

    #[cfg(feature = "serial")]
    {
        let link = dtulink::serial::UartLink::open(&uart.port, uart.baud_rate)?;
        registry.register_serial(Arc::new(link))?;
    }
    #[cfg(not(feature = "serial"))]
    anyhow::bail!("built without the 'serial' feature; no serial transport available");

    // Until a broker protocol client is wired in, run against the logging
    // stand-in so the relay pipeline stays observable end to end.
    warn!("no broker client configured; using the null cloud client");
    registry.register_cloud(Arc::new(NullCloudClient))?;

    let serial = registry.serial()?;
    let cloud = registry.cloud()?;

    let publisher = Arc::new(ReliablePublisher::new(cloud.clone()));
    let ota = OtaOrchestrator::new(cloud.clone(), settings.clone());
    registry.register_ota_executor(ota.clone())?;
    let downlink = DownlinkRelay::new(serial.clone());
    registry.register_raw_data_executor(downlink)?;

    ota.check_for_update().await;

    let watchdog = Watchdog::new(watchdog_interval);
    let scan_loop = watchdog.spawn_scan_loop();

    let uplink = UplinkRelay::new(
        serial,
        publisher,
        Arc::new(PassthroughSegmenter::default()),
        uart.read_max_bytes,
        Duration::from_millis(uart.read_timeout_ms),
    );
    uplink.start(&watchdog);
    info!("uplink relay started; press ctrl-c to stop");

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    watchdog.shutdown();
    let _ = scan_loop.await;
    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // Base level from CLI verbosity overrides config
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|c| c.logging.level.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);
    if let Some(cfg) = config {
        if let Some(ref file) = cfg.logging.file {
            if let Ok(f) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)
            {
                let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
                builder.format(move |fmt, record| {
                    let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                    let line = format!("{} [{}] {}", ts, record.level(), record.args());
                    if let Ok(mut guard) = write_mutex.lock() {
                        let _ = writeln!(guard, "{}", line);
                    }
                    writeln!(fmt, "{}", line)
                });
                let _ = builder.try_init();
                return;
            }
        }
    }
    builder.format(|fmt, record| {
        writeln!(
            fmt,
            "{} [{}] {}",
            chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
            record.level(),
            record.args()
        )
    });
    let _ = builder.try_init();
}
