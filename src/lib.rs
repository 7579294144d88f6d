pub mod config;
pub mod error;
pub mod db;
pub mod records;
pub mod store;
pub mod graph;
pub mod enrich;
pub mod pipeline;
pub mod audit;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::Config;
pub use error::{QrgraphError, Result};
pub use graph::{GraphEdge, GraphNode, KnowledgeGraph};
pub use pipeline::{build_graph, GraphOptions, GraphOutput, KnowledgeGraphService};
pub use records::{DateRange, EdgeKind, GraphRequest, RecordId, RecordSource};
