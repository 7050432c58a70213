use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use routing_impls::RoutingKind;

#[derive(Parser, Debug)]
#[command(about = "Measure how routing policies spread paths over data center topologies")]
struct Args {
    /// Experiment spec, in JSON or Dhall
    spec: PathBuf,
    /// Routing policy, overriding the spec (ksp, ecmp, hashed or random)
    #[arg(short, long)]
    routing: Option<RoutingKind>,
    /// Sampling probability, overriding the spec
    #[arg(short, long)]
    p: Option<f64>,
    /// Sampling seed, overriding the spec
    #[arg(long)]
    seed: Option<u64>,
    /// Output directory, overriding the spec
    #[arg(short, long)]
    out_dir: Option<PathBuf>,
    /// Also write the built topology as JSON to this file
    #[arg(long)]
    export: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let mut spec = jellyfish_utils::read_experiment_spec(&args.spec)
        .with_context(|| format!("failed to read {}", args.spec.display()))?;
    if let Some(routing) = args.routing {
        spec.routing = routing;
    }
    if let Some(p) = args.p {
        spec.analysis.p = p;
    }
    if let Some(seed) = args.seed {
        spec.analysis.seed = seed;
    }
    if let Some(out_dir) = args.out_dir {
        spec.out_dir = out_dir;
    }
    let outcome = jellyfish_driver::run(&spec)?;
    if let Some(path) = args.export {
        let export = jellyfish_utils::export_topology(&outcome.topo)?;
        jellyfish_utils::write_topology(&path, &export)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    println!("{}", outcome.path.display());
    Ok(())
}
