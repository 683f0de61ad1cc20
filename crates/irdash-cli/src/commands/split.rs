use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};

use irdash_core::asn::AsnRecord;
use irdash_core::cube::ReadCube;
use irdash_core::extract::extract;
use irdash_core::io::flat::load_flat;
use irdash_core::io::ima::load_exposure;
use irdash_core::io::FitsStore;
use irdash_core::store::FrameStore;

#[derive(Args)]
pub struct SplitArgs {
    /// Input multi-read exposure (IMA FITS file)
    pub file: PathBuf,

    /// Flat-field reference image
    #[arg(long)]
    pub flat: PathBuf,

    /// Output directory for difference frames and the association table
    #[arg(short, long, default_value = "diff")]
    pub output: PathBuf,
}

pub fn run(args: &SplitArgs) -> Result<()> {
    let exposure = load_exposure(&args.file)?;
    exposure.validate()?;
    let flat = load_flat(&args.flat)?;
    let root = exposure.meta.root.clone();

    let cube = ReadCube::from_exposure(&exposure)?;
    println!(
        "Splitting {} ({} reads, {} difference frames)...",
        root,
        cube.nsamp(),
        cube.pair_count()
    );

    let frames = extract(&cube, &flat, &root)?;

    let pb = ProgressBar::new(frames.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("Writing [{bar:40}] {pos}/{len}")?
            .progress_chars("=> "),
    );

    let mut store = FitsStore::open(&args.output)?;
    for frame in &frames {
        store.save(frame)?;
        pb.inc(1);
    }
    pb.finish();

    let names: Vec<String> = frames.iter().map(|f| f.name()).collect();
    let asn = AsnRecord::build(&names, &root);
    store.save_asn(&asn)?;

    println!(
        "Wrote {} frames and {}_asn.json to {}",
        names.len(),
        root,
        args.output.display()
    );
    Ok(())
}
