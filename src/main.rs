use std::path::PathBuf;

use structopt::StructOpt;
use tracing::{info, trace};

#[macro_use]
extern crate quick_error;

mod capture;
mod config;
mod notify;
mod trigger;

#[derive(Debug, StructOpt)]
#[structopt(name = "bell_sink", about = "Doorbell button to camera-capture email service.")]
struct CliArgs {
    #[structopt(
        parse(from_os_str),
        short = "c",
        long = "config",
        default_value = "config.toml",
        help = "Path to configuration file. See sample_config.toml for format.",
        env = "BELL_SINK_CONFIG"
    )]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    let args = CliArgs::from_args();
    let cfg = config::load_config(args.config).unwrap();

    let filter = tracing_subscriber::EnvFilter::new(&cfg.system.log_level);
    let stdout_subscriber = tracing_subscriber::fmt()
        // Filter from user
        .with_env_filter(filter)
        .finish();
    tracing::subscriber::set_global_default(stdout_subscriber).unwrap();

    info!("Doorbell capture service running");
    trace!("Config: {:?}", cfg);

    // Sessions assume the image directory exists; create it once here.
    std::fs::create_dir_all(&cfg.capture.image_dir).unwrap();

    // Start the capture loop and bind the button to it
    let trigger_tx = capture::run_capture_loop(&cfg).unwrap();
    let _button = trigger::DoorbellButton::bind(&cfg.button, trigger_tx).unwrap();

    tokio::signal::ctrl_c().await.unwrap();
    info!("Program interrupted, shutting down");
}
