mod calibrate;
mod capture;
mod config;
mod error;
mod grid;
mod palette;
mod sampler;

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, Command};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::capture::XcapScreen;
use crate::config::{Config, DEFAULT_CONFIG_PATH};
use crate::grid::Grid;

fn main() -> Result<()> {
    // Parse CLI arguments
    let matches = Command::new("minescan")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Reads a GNOME Mines board straight off the screen")
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("JSON config file")
                .default_value(DEFAULT_CONFIG_PATH)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("display")
                .long("display")
                .value_name("INDEX")
                .help("Display the board is on (overrides config)")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("interval")
                .long("interval")
                .value_name("MS")
                .help("Delay between refresh passes in milliseconds (overrides config)")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("debug-dir")
                .long("debug-dir")
                .value_name("DIR")
                .help("Save the calibration frame with the detected grid drawn on it")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("once")
                .long("once")
                .help("Run a single refresh pass and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("One of off, error, warn, info, debug, trace")
                .default_value("info")
                .value_parser(value_parser!(LevelFilter)),
        )
        .get_matches();

    let log_level = *matches.get_one::<LevelFilter>("log-level").unwrap(); // Safe due to default
    initialize_logging(log_level);

    let config_path = matches.get_one::<PathBuf>("config").unwrap(); // Safe due to default
    let mut config = Config::load(config_path)?;
    if let Some(&display) = matches.get_one::<usize>("display") {
        config.display = display;
    }
    if let Some(&interval) = matches.get_one::<u64>("interval") {
        config.poll_interval_ms = interval;
    }
    if let Some(dir) = matches.get_one::<PathBuf>("debug-dir") {
        config.debug_dir = Some(dir.clone());
    }
    let once = matches.get_flag("once");

    let screen = XcapScreen;
    let geometry = calibrate::calibrate(&screen, config.display, config.debug_dir().as_deref())
        .context("Failed to locate the board. Is an untouched board fully visible?")?;

    let (x, y) = geometry.origin();
    println!(
        "Board: {}x{} cells at ({},{}), cell size {}, spacing {}",
        geometry.columns(),
        geometry.rows(),
        x,
        y,
        geometry.size(),
        geometry.spacing()
    );

    let mut grid = Grid::covered(geometry.rows(), geometry.columns());
    let mut first_pass = true;
    loop {
        let stats = sampler::refresh(&geometry, &mut grid, &screen)
            .context("Failed to read the board")?;

        if first_pass || stats.updated > 0 {
            println!("{}", grid);
        }
        first_pass = false;

        if grid.hazard_exposed() {
            println!("Hazard exposed, game over.");
            break;
        }
        if grid.is_finished() {
            println!("Board cleared.");
            break;
        }
        if once {
            break;
        }
        thread::sleep(Duration::from_millis(config.poll_interval_ms));
    }

    info!("done");
    Ok(())
}

fn initialize_logging(level: LevelFilter) {
    let format = tracing_subscriber::fmt::format()
        .with_target(false)
        .compact();

    let filter = Targets::new().with_default(level);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .event_format(format)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}
