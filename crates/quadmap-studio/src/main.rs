mod args;
mod label;
mod notice;
mod panel;
mod studio;

use anyhow::Context;
use clap::Parser;

use quadmap_engine::device::GpuInit;
use quadmap_engine::logging::init_logging;
use quadmap_engine::window::Runtime;

use crate::args::Args;
use crate::studio::Studio;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.logging());

    log::info!(
        "quadmap {}: {} file(s), mesh {}x{}",
        env!("CARGO_PKG_VERSION"),
        args.files.len(),
        args.mesh_resolution,
        args.mesh_resolution,
    );

    let mut studio = Studio::new(args.studio(), args.composition(), args.video());
    for path in &args.files {
        studio.open(path.clone());
    }

    Runtime::run(args.runtime(), GpuInit::default(), studio).context("quadmap runtime failed")
}
