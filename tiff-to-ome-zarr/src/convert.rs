use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use log::{info, warn};
use ndarray::Array3;

use crate::dataset::OmeZarrDataset;
use crate::error::{Error, Result};
use crate::pyramid::{Downsample, Pyramid};
use crate::stack::{canonicalize, read_tiff_stack, StackVisitor};
use crate::voxel::Voxel;

/// Extension the output path must carry.
pub const OUTPUT_EXTENSION: &str = "zarr";

#[derive(Args, Debug, Clone)]
pub struct ConvertArgs {
    /// Path to the input multi-page TIFF file
    #[arg(short, long)]
    pub input: PathBuf,
    /// Output .zarr path
    #[arg(short, long)]
    pub output: PathBuf,
    /// Number of resolution levels in the pyramid
    #[arg(short, long, default_value_t = 6)]
    pub levels: usize,
    /// Output channel name
    #[arg(long, default_value = "ch1")]
    pub channel_name: String,
    /// Use an anti-aliasing filter for downsampling instead of striding
    #[arg(long, default_value_t = false)]
    pub proper_downsample: bool,
}

/// What a successful run produced.
#[derive(Debug, Clone)]
pub struct Summary {
    pub output: PathBuf,
    pub tree: String,
}

/// Checks the preconditions that need no I/O besides looking at `input`.
pub fn validate(args: &ConvertArgs) -> Result<()> {
    if args.output.extension().and_then(|ext| ext.to_str()) != Some(OUTPUT_EXTENSION) {
        return Err(Error::invalid_argument(format!(
            "output path must have a .{OUTPUT_EXTENSION} suffix: {}",
            args.output.display()
        )));
    }
    if args.levels < 1 {
        return Err(Error::invalid_argument(format!(
            "levels must be at least 1, got {}",
            args.levels
        )));
    }
    if !args.input.is_file() {
        return Err(Error::NotFound(args.input.clone()));
    }
    Ok(())
}

/// Converts `args.input` into an OME-Zarr pyramid at `args.output`.
///
/// `progress` receives the completed fraction and a message after each level.
/// On failure the levels written so far stay on disk.
pub fn run(args: ConvertArgs, progress: impl Fn(f64, &str)) -> Result<Summary> {
    validate(&args)?;
    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    info!("Reading TIFF: {}", args.input.display());
    let stack = read_tiff_stack(&args.input)?;
    info!("Loaded stack shape: {:?}, dtype: {}", stack.shape(), stack.dtype());

    let mut dataset = OmeZarrDataset::create(&args.output, &[args.channel_name.clone()])?;
    let written = stack.visit(WritePyramid {
        dataset: &mut dataset,
        levels: args.levels,
        method: Downsample::from_proper_flag(args.proper_downsample),
        progress: &progress,
    });
    if let Err(err) = written {
        if err.is_write_error() {
            warn!(
                "Stopped after {} of {} levels; partial dataset left at {}",
                dataset.levels().len(),
                args.levels,
                args.output.display()
            );
        }
        return Err(err);
    }

    let tree = dataset.tree();
    dataset.close()?;
    Ok(Summary {
        output: resolve(&args.output),
        tree,
    })
}

fn resolve(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

struct WritePyramid<'a, F> {
    dataset: &'a mut OmeZarrDataset,
    levels: usize,
    method: Downsample,
    progress: &'a F,
}

impl<F: Fn(f64, &str)> StackVisitor for WritePyramid<'_, F> {
    type Output = Result<()>;

    fn visit<T: Voxel>(self, stack: Array3<T>) -> Result<()> {
        let Self {
            dataset,
            levels,
            method,
            progress,
        } = self;
        let canonical = canonicalize(stack);
        info!("Reshaped to TCZYX: {:?}", canonical.shape());

        let pyramid = Pyramid::new(canonical, levels, method)?;
        info!("Writing {levels} levels ({:?})", pyramid.method());
        for level in pyramid {
            dataset.write_level(&level.name(), level.data.view())?;
            let message = format!("Wrote level {} {:?}", level.index, level.data.shape());
            info!("{message}");
            progress((level.index + 1) as f64 / levels as f64, &message);
        }
        Ok(())
    }
}
