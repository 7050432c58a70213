//! Runs link usage experiments end to end: build a topology, route sampled host pairs over it
//! and write the resulting histogram.

use std::path::{Path, PathBuf};

use jellyfish_core::{
    analysis::{self, AnalysisError, Histogram, LinkUsage},
    topo::{BuildError, Topo},
};
pub use jellyfish_utils::ExperimentSpec;
use log::info;

/// Reads an [`ExperimentSpec`] from a JSON or Dhall file and runs it.
pub fn run_from_file(spec: impl AsRef<Path>) -> Result<Outcome, Error> {
    let spec = jellyfish_utils::read_experiment_spec(spec)?;
    run(&spec)
}

/// Runs an experiment and writes its histogram to `spec.out_dir`.
pub fn run(spec: &ExperimentSpec) -> Result<Outcome, Error> {
    let topo = Topo::build(&spec.topology)?;
    let policy = spec.routing.build(topo.network());
    let usage = analysis::analyze(topo.network(), policy, &spec.analysis)?;
    let histogram = usage.histogram();
    let path = jellyfish_utils::write_histogram(
        &spec.out_dir,
        &spec.histogram_file_name(),
        &histogram,
    )?;
    info!("Wrote histogram to {}", path.display());
    Ok(Outcome {
        topo,
        usage,
        histogram,
        path,
    })
}

/// Everything an experiment produced.
#[derive(Debug)]
pub struct Outcome {
    pub topo: Topo,
    pub usage: LinkUsage,
    pub histogram: Histogram,
    /// Where the histogram was written.
    pub path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to build topology")]
    Build(#[from] BuildError),

    #[error("failed to analyze link usage")]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Utils(#[from] jellyfish_utils::Error),
}
