use clap::Parser;
use std::io::{self, Write};

use tiff_to_ome_zarr::convert::{self, ConvertArgs};

#[derive(Parser)]
#[command(
    name = "tiff-to-ome-zarr",
    about = "Convert a multi-page TIFF to a multi-resolution OME-Zarr pyramid"
)]
struct Cli {
    #[command(flatten)]
    args: ConvertArgs,
}

fn progress(progress: f64, message: &str) {
    let _ = writeln!(
        io::stderr(),
        "{}",
        serde_json::json!({ "progress": progress, "message": message })
    );
    let _ = io::stderr().flush();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let summary = convert::run(cli.args, progress)?;
    print!("{}", summary.tree);
    println!("Saved OME-Zarr dataset to {}", summary.output.display());
    Ok(())
}
