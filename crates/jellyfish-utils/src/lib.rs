//! Utilities for interfacing with Jellyfish: experiment specs, histogram files and topology
//! exports.

#![warn(unreachable_pub, missing_debug_implementations, missing_docs)]

use std::path::{Path, PathBuf};

use jellyfish_core::{
    analysis::{AnalysisOpts, Histogram},
    network::{EdgeSpec, Link, Network, Node, NodeSpec, Port},
    topo::{PortError, Topo, TopoKind, TopologySpec},
};
use routing_impls::RoutingKind;

/// Reads an [`ExperimentSpec`] from a file in JSON or Dhall format.
pub fn read_experiment_spec(path: impl AsRef<Path>) -> Result<ExperimentSpec, Error> {
    read_by_extension(path)
}

/// Reads a [`Network`] from a file containing a [`TopologyExport`] in JSON or Dhall format.
pub fn read_network(path: impl AsRef<Path>) -> Result<Network, Error> {
    let export: TopologyExport = read_by_extension(path)?;
    export.into_network()
}

fn read_by_extension<T>(path: impl AsRef<Path>) -> Result<T, Error>
where
    T: serde::de::DeserializeOwned,
{
    let contents = std::fs::read_to_string(path.as_ref())?;
    let value: T = match path.as_ref().extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(&contents)?,
        Some("dhall") => serde_dhall::from_str(&contents).parse().map_err(Box::new)?,
        _ => return Err(Error::UnknownFileType(path.as_ref().into())),
    };
    Ok(value)
}

/// An experiment: which topology to build, how to route over it and how to sample host pairs.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ExperimentSpec {
    /// Topology family and parameters.
    pub topology: TopologySpec,
    /// Routing policy.
    #[serde(default)]
    pub routing: RoutingKind,
    /// Sampling options.
    #[serde(default)]
    pub analysis: AnalysisOpts,
    /// Directory histogram files are written to.
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,
}

fn default_out_dir() -> PathBuf {
    PathBuf::from("results")
}

impl ExperimentSpec {
    /// The name of this experiment's histogram file.
    pub fn histogram_file_name(&self) -> String {
        histogram_file_name(self.topology.kind(), &self.routing, self.analysis.p)
    }
}

/// Returns `"<topology>-<routing>-<p>.txt"`, e.g. `jf-ksp-1.0.txt`.
pub fn histogram_file_name(topology: TopoKind, routing: &RoutingKind, p: f64) -> String {
    format!("{}-{}-{:?}.txt", topology.tag(), routing.tag(), p)
}

/// Writes `histogram` to `dir/name`, creating `dir` if needed. Returns the path written.
pub fn write_histogram(
    dir: impl AsRef<Path>,
    name: &str,
    histogram: &Histogram,
) -> Result<PathBuf, Error> {
    std::fs::create_dir_all(dir.as_ref())?;
    let path = dir.as_ref().join(name);
    std::fs::write(&path, histogram.to_string())?;
    Ok(path)
}

/// A built topology in a form an emulator can consume.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TopologyExport {
    /// Topology family.
    pub kind: TopoKind,
    /// Nodes.
    pub nodes: Vec<ExportNode>,
    /// Links.
    pub links: Vec<ExportLink>,
    /// Per-layer node specs.
    pub node_specs: Vec<NodeSpec>,
    /// Per-layer edge specs.
    pub edge_specs: Vec<EdgeSpec>,
}

impl TopologyExport {
    /// Rebuilds the validated network.
    pub fn into_network(self) -> Result<Network, Error> {
        let nodes = self.nodes.into_iter().map(|n| n.node).collect::<Vec<_>>();
        let links = self.links.into_iter().map(|l| l.link).collect::<Vec<_>>();
        Ok(Network::new(&nodes, &links, self.node_specs, self.edge_specs)?)
    }
}

/// A node together with its dpid string.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ExportNode {
    /// The dpid as 16 hex digits.
    pub dpid: String,
    /// The node.
    #[serde(flatten)]
    pub node: Node,
}

/// A link together with its ports, for topologies that address them.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ExportLink {
    /// The link.
    #[serde(flatten)]
    pub link: Link,
    /// Port on `a` leading to `b`, and port on `b` leading to `a`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ports: Option<(Port, Port)>,
}

/// Exports a built topology, with nodes sorted by id and links by endpoints.
pub fn export_topology(topo: &Topo) -> Result<TopologyExport, Error> {
    let network = topo.network();
    let mut nodes = network
        .nodes()
        .map(|n| ExportNode {
            dpid: n.dpid_str(),
            node: n.clone(),
        })
        .collect::<Vec<_>>();
    nodes.sort_by_key(|n| n.node.id);
    let mut links = network
        .links()
        .map(|&link| {
            let ports = match topo.port(link.a, link.b) {
                Ok(ports) => Some(ports),
                Err(PortError::Unsupported(_)) => None,
                Err(e) => return Err(e),
            };
            Ok(ExportLink { link, ports })
        })
        .collect::<Result<Vec<_>, _>>()?;
    links.sort_by_key(|l| l.link.key());
    Ok(TopologyExport {
        kind: topo.kind(),
        nodes,
        links,
        node_specs: network.node_specs().to_vec(),
        edge_specs: network.edge_specs().to_vec(),
    })
}

/// Writes a topology export as pretty-printed JSON.
pub fn write_topology(path: impl AsRef<Path>, export: &TopologyExport) -> Result<(), Error> {
    if let Some(dir) = path.as_ref().parent() {
        std::fs::create_dir_all(dir)?;
    }
    let contents = serde_json::to_string_pretty(export)?;
    std::fs::write(path, contents)?;
    Ok(())
}

/// Error kinds for specifications and I/O.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Unknown file type.
    #[error("unknown file type: {0}")]
    UnknownFileType(PathBuf),

    /// Error serializing/deserializing Dhall.
    #[error("Dhall error")]
    Dhall(#[from] Box<serde_dhall::Error>),

    /// Error serializing/deserializing JSON.
    #[error("JSON error")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("IO error")]
    Io(#[from] std::io::Error),

    /// Error constructing a valid topology.
    #[error("invalid topology")]
    Topology(#[from] jellyfish_core::network::TopologyError),

    /// Error addressing ports.
    #[error("invalid port mapping")]
    Port(#[from] PortError),
}

#[cfg(test)]
mod tests {
    use jellyfish_core::{FatTreeOpts, JellyfishOpts};

    use super::*;

    #[test]
    fn file_names_follow_tags() {
        assert_eq!(
            histogram_file_name(TopoKind::Jellyfish, &RoutingKind::default(), 1.0),
            "jf-ksp-1.0.txt"
        );
        assert_eq!(
            histogram_file_name(TopoKind::FatTree, &RoutingKind::Ecmp, 0.25),
            "ft-ecmp-0.25.txt"
        );
    }

    #[test]
    fn read_json_spec_with_defaults() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("spec.json");
        std::fs::write(&path, r#"{ "topology": { "FatTree": { "k": 6 } } }"#)?;
        let spec = read_experiment_spec(&path)?;
        assert_eq!(
            spec.topology,
            TopologySpec::FatTree(FatTreeOpts::builder().k(6).build())
        );
        assert_eq!(spec.routing, RoutingKind::default());
        assert_eq!(spec.analysis, AnalysisOpts::default());
        assert_eq!(spec.out_dir, PathBuf::from("results"));
        assert_eq!(spec.histogram_file_name(), "ft-ksp-1.0.txt");
        Ok(())
    }

    #[test]
    fn read_dhall_spec() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("spec.dhall");
        std::fs::write(
            &path,
            r#"
            let Routing = < Ksp : { k : Natural } | Ecmp | Hashed | Random : { seed : Natural } >
            in  { topology =
                    < FatTree : { k : Natural, speed : Natural }
                    | Jellyfish :
                        { n_servers : Natural
                        , n_switches : Natural
                        , n_ports : Natural
                        , seed : Natural
                        , speed : Natural
                        }
                    >.Jellyfish
                      { n_servers = 8, n_switches = 10, n_ports = 3, seed = 1, speed = 10 }
                , routing = Routing.Random { seed = 2 }
                , analysis = { p = 0.5, seed = 3, flow_index = 0 }
                , out_dir = "out"
                }
            "#,
        )?;
        let spec = read_experiment_spec(&path)?;
        let TopologySpec::Jellyfish(opts) = spec.topology else {
            anyhow::bail!("wrong topology kind");
        };
        assert_eq!((opts.n_servers, opts.n_switches, opts.n_ports), (8, 10, 3));
        assert_eq!(spec.routing, RoutingKind::Random { seed: 2 });
        assert_eq!(spec.analysis.p, 0.5);
        assert_eq!(spec.out_dir, PathBuf::from("out"));
        Ok(())
    }

    #[test]
    fn unknown_extension_is_rejected() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("spec.yaml");
        std::fs::write(&path, "topology: {}")?;
        assert!(matches!(
            read_experiment_spec(&path),
            Err(Error::UnknownFileType(_))
        ));
        Ok(())
    }

    #[test]
    fn histogram_is_written_in_rows() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut counts = jellyfish_core::LinkCounts::default();
        let [a, b, c] = [1, 2, 3].map(jellyfish_core::NodeId::new);
        counts.add_route(&[a, b, c]);
        counts.add_route(&[a, b]);
        let out = dir.path().join("nested");
        let path = write_histogram(&out, "jf-ksp-1.0.txt", &counts.histogram())?;
        assert_eq!(path, out.join("jf-ksp-1.0.txt"));
        assert_eq!(std::fs::read_to_string(path)?, "1 1\n2 1\n");
        Ok(())
    }

    #[test]
    fn fat_tree_export_carries_ports() -> anyhow::Result<()> {
        let topo = Topo::build(&TopologySpec::FatTree(FatTreeOpts::default()))?;
        let export = export_topology(&topo)?;
        assert_eq!(export.nodes.len(), 16 + 8 + 8 + 4);
        assert_eq!(export.links.len(), 48);
        assert!(export.links.iter().all(|l| l.ports.is_some()));
        let host = export
            .nodes
            .iter()
            .find(|n| n.node.name == "0_0_2")
            .ok_or_else(|| anyhow::anyhow!("missing host"))?;
        assert_eq!(host.dpid, "0000000000000002");
        Ok(())
    }

    #[test]
    fn jellyfish_export_round_trips() -> anyhow::Result<()> {
        let topo = Topo::build(&TopologySpec::Jellyfish(JellyfishOpts::default()))?;
        let export = export_topology(&topo)?;
        assert!(export.links.iter().all(|l| l.ports.is_none()));
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("topo.json");
        write_topology(&path, &export)?;
        let network = read_network(&path)?;
        assert_eq!(network.nr_nodes(), topo.network().nr_nodes());
        assert_eq!(network.nr_links(), topo.network().nr_links());
        for link in topo.network().links() {
            assert!(network.is_linked(link.a, link.b));
        }
        Ok(())
    }
}
