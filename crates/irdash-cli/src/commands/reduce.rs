use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

use irdash_core::cosmic::StaticCrDetector;
use irdash_core::exposure::Exposure;
use irdash_core::frame::{frame_name, trimmed_shape};
use irdash_core::io::flat::{load_flat, load_labels};
use irdash_core::io::ima::load_exposure;
use irdash_core::io::FitsStore;
use irdash_core::mask::{SourceMask, StaticMaskProvider};
use irdash_core::pipeline::config::ReductionConfig;
use irdash_core::pipeline::{run_reduction, ProgressReporter, ReductionStage};

use crate::summary::print_reduction_summary;

#[derive(Args)]
pub struct ReduceArgs {
    /// Input multi-read exposure (IMA FITS file)
    pub file: PathBuf,

    /// Flat-field reference image
    #[arg(long)]
    pub flat: PathBuf,

    /// Directory holding segmentation maps from the external detection stage
    #[arg(long)]
    pub seg_dir: Option<PathBuf>,

    /// Cosmic-ray mask from the external detector (nonzero = hit)
    #[arg(long)]
    pub cr_mask: Option<PathBuf>,

    /// Reduction config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Record sky levels without subtracting them
    #[arg(long)]
    pub no_subtract: bool,

    /// Output directory for difference frames and the association table
    #[arg(short, long, default_value = "diff")]
    pub output: PathBuf,
}

pub fn run(args: &ReduceArgs) -> Result<()> {
    let mut config = if let Some(ref config_path) = args.config {
        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config {}", config_path.display()))?;
        toml::from_str(&contents).context("Invalid reduction config")?
    } else {
        ReductionConfig::default()
    };
    if args.no_subtract {
        config.background.subtract = false;
    }

    let exposure = load_exposure(&args.file)?;
    let flat = load_flat(&args.flat)?;

    let masks = build_mask_provider(&exposure, args.seg_dir.as_deref())?;
    let detector = build_detector(&exposure, args.cr_mask.as_deref())?;

    let mut store = FitsStore::open(&args.output)?;
    let reporter = CliReporter::new();
    let summary = run_reduction(
        &exposure,
        &flat,
        &masks,
        &detector,
        &mut store,
        &config,
        &reporter,
    )?;

    for catalog in &summary.catalogs {
        store.save_catalog(catalog)?;
    }

    print_reduction_summary(&summary, &args.output);
    Ok(())
}

/// Load precomputed segmentation maps into an in-memory provider. Missing
/// maps degrade to empty masks: reduction still runs, with no source
/// protection.
fn build_mask_provider(
    exposure: &Exposure,
    seg_dir: Option<&Path>,
) -> Result<StaticMaskProvider> {
    let root = &exposure.meta.root;
    let mut provider = StaticMaskProvider::new();
    let Some(dir) = seg_dir else {
        warn!("no segmentation directory given; using empty source masks");
        return Ok(provider);
    };

    let exposure_seg = dir.join(format!("{root}_seg.fits"));
    if exposure_seg.exists() {
        let labels = load_labels(&exposure_seg)?;
        provider = provider.with_exposure_mask(root, SourceMask::new(labels));
    } else {
        warn!(path = %exposure_seg.display(), "exposure segmentation map not found");
    }

    for index in 1..=exposure.meta.nsamp.saturating_sub(2) {
        let frame_seg = dir.join(format!("{}_diff_seg.fits", frame_name(root, index)));
        if frame_seg.exists() {
            let labels = load_labels(&frame_seg)?;
            provider = provider.with_frame_mask(root, index, SourceMask::new(labels));
        }
    }
    Ok(provider)
}

/// Wrap an externally-computed cosmic-ray mask; absent input means no new
/// flags will be set.
fn build_detector(exposure: &Exposure, cr_mask: Option<&Path>) -> Result<StaticCrDetector> {
    let shape = trimmed_shape(exposure.reads[0].counts_rate.dim());
    match cr_mask {
        Some(path) => {
            let labels = load_labels(path)?;
            Ok(StaticCrDetector::new(labels.mapv(|v| v > 0)))
        }
        None => {
            warn!("no cosmic-ray mask given; skipping new flags");
            Ok(StaticCrDetector::none(shape))
        }
    }
}

/// Progress bar per pipeline stage.
struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    fn new() -> CliReporter {
        CliReporter {
            bar: Mutex::new(None),
        }
    }
}

impl ProgressReporter for CliReporter {
    fn begin_stage(&self, stage: ReductionStage, total_items: Option<usize>) {
        let pb = match total_items {
            Some(total) => {
                let pb = ProgressBar::new(total as u64);
                if let Ok(style) =
                    ProgressStyle::default_bar().template("{msg:26} [{bar:40}] {pos}/{len}")
                {
                    pb.set_style(style.progress_chars("=> "));
                }
                pb
            }
            None => ProgressBar::new_spinner(),
        };
        pb.set_message(stage.to_string());
        if let Ok(mut slot) = self.bar.lock() {
            *slot = Some(pb);
        }
    }

    fn advance(&self, items_done: usize) {
        if let Ok(slot) = self.bar.lock() {
            if let Some(pb) = slot.as_ref() {
                pb.set_position(items_done as u64);
            }
        }
    }

    fn finish_stage(&self) {
        if let Ok(mut slot) = self.bar.lock() {
            if let Some(pb) = slot.take() {
                pb.finish();
            }
        }
    }
}
