use std::path::PathBuf;

use clap::Parser;
use stardrift::error::AppError;
use stardrift::field::FieldConfig;
use stardrift::window::{self, WindowOptions};

/// Ambient starfield in a window.
#[derive(Parser, Debug)]
#[command(name = "stardrift", version, about)]
struct Args {
    /// JSON file with a particle field configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Initial window width in logical pixels
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Initial window height in logical pixels
    #[arg(long, default_value_t = 720)]
    height: u32,
}

fn run(args: Args) -> Result<(), AppError> {
    let field = match &args.config {
        Some(path) => FieldConfig::load(path)?,
        None => FieldConfig::default(),
    };
    field.validate()?;
    log::info!("starting with {} / {} particles", field.small_count, field.large_count);

    window::run(WindowOptions {
        width: args.width.max(1),
        height: args.height.max(1),
        field,
        ..Default::default()
    })
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Args::parse()) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
