use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use irdash_core::io::ima::load_exposure;

#[derive(Args)]
pub struct InfoArgs {
    /// Input multi-read exposure (IMA FITS file)
    pub file: PathBuf,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let exposure = load_exposure(&args.file)?;
    let meta = &exposure.meta;
    let (h, w) = exposure.reads[0].counts_rate.dim();

    println!("File:        {}", args.file.display());
    println!("Root:        {}", meta.root);
    println!("Instrument:  {}/{}", meta.instrument, meta.detector);
    println!("Reads:       {}", meta.nsamp);
    println!("Dimensions:  {}x{}", w, h);
    println!("Units:       {}", meta.bunit);
    println!(
        "Read noise:  A={} B={} C={} D={}",
        meta.readnoise[0], meta.readnoise[1], meta.readnoise[2], meta.readnoise[3]
    );
    println!("Calibrated:  {}", meta.completed_steps.join(", "));

    let mut times: Vec<f32> = exposure.reads.iter().map(|r| r.sample_time).collect();
    times.reverse();
    println!("Sample times: {:?}", times);

    match exposure.validate() {
        Ok(()) => println!("Status:      OK for reduction"),
        Err(e) => println!("Status:      {}", e),
    }

    Ok(())
}
