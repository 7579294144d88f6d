//! End-to-end graph build: seeds -> traversal -> {tree, knowledge graph}.

use std::time::Instant;

use crate::audit;
use crate::config::GraphConfig;
use crate::db::Db;
use crate::enrich::{AttachmentSource, FtsAttachmentIndex, NoAttachments};
use crate::graph::{assemble, build_spanning_tree, render_forest, traverse, KnowledgeGraph};
use crate::records::{GraphRequest, RecordId};
use crate::store::{RecordStore, SqliteRecordStore};
use crate::{QrgraphError, Result};

/// Per-build knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphOptions {
    /// Maximum attachment hits per node
    pub attachment_limit: usize,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self { attachment_limit: 5 }
    }
}

/// Counts describing one build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub visited: usize,
    pub nodes: usize,
    pub edges: usize,
    pub roots: usize,
}

/// Both renderings of one build.
#[derive(Debug, Clone)]
pub struct GraphOutput {
    pub graph: KnowledgeGraph,
    /// Indented tree, one tree per seed that survived detail fetch
    pub tree: String,
    pub stats: RunStats,
}

/// Run the whole build against a store and an attachment source.
pub fn build_graph<S, A>(
    store: &S,
    attachments: &A,
    request: &GraphRequest,
    options: &GraphOptions,
) -> Result<GraphOutput>
where
    S: RecordStore + ?Sized,
    A: AttachmentSource + ?Sized,
{
    if request.seeds().is_empty() {
        return Err(QrgraphError::NoSeedsResolved(
            "request contains no valid record identifiers".to_string(),
        ));
    }

    let traversal = traverse(store, request)?;
    let spanning = build_spanning_tree(&traversal.adjacency, request.seeds());

    let visited: Vec<RecordId> = traversal.visited.iter().cloned().collect();
    let detail = store
        .fetch_detail(&visited)
        .map_err(|e| QrgraphError::data_source("record detail", e))?;

    // Records without detail are dropped from the graph; skip their lookups
    let resolved: Vec<RecordId> = visited.into_iter().filter(|id| detail.contains_key(id)).collect();
    let hits = attachments.fetch_attachments(&resolved, options.attachment_limit);

    let graph = assemble(
        &traversal.visited,
        &traversal.adjacency,
        request.seeds(),
        &detail,
        &hits,
    )?;

    let roots: Vec<RecordId> = request
        .seeds()
        .iter()
        .filter(|seed| detail.contains_key(*seed))
        .cloned()
        .collect();
    if roots.is_empty() {
        return Err(QrgraphError::NoSeedsResolved(format!(
            "none of {} seed(s) matched a record",
            request.seeds().len()
        )));
    }

    let tree = render_forest(&detail, &spanning, &roots);
    let stats = RunStats {
        visited: traversal.visited.len(),
        nodes: graph.nodes.len(),
        edges: graph.edges.len(),
        roots: roots.len(),
    };

    Ok(GraphOutput { graph, tree, stats })
}

/// Runs builds against a SQLite database, one scoped connection per build.
pub struct KnowledgeGraphService {
    db: Db,
    options: GraphOptions,
    enrich_attachments: bool,
    record_runs: bool,
}

impl KnowledgeGraphService {
    pub fn new(db: Db, config: &GraphConfig) -> Self {
        Self {
            db,
            options: GraphOptions { attachment_limit: config.attachment_limit },
            enrich_attachments: config.enrich_attachments,
            record_runs: config.record_runs,
        }
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    pub async fn run(&self, request: GraphRequest) -> Result<GraphOutput> {
        let start = Instant::now();
        let options = self.options;
        let enrich = self.enrich_attachments;
        let req = request.clone();

        let result = self
            .db
            .with_connection(move |conn| {
                let store = SqliteRecordStore::new(conn);
                if enrich {
                    build_graph(&store, &FtsAttachmentIndex::new(conn), &req, &options)
                } else {
                    build_graph(&store, &NoAttachments, &req, &options)
                }
            })
            .await;

        let latency_ms = start.elapsed().as_millis() as i64;
        match &result {
            Ok(output) => log::info!(
                "Graph built: {} node(s), {} edge(s) in {}ms",
                output.stats.nodes,
                output.stats.edges,
                latency_ms
            ),
            Err(e) => log::error!("Graph build failed after {}ms: {}", latency_ms, e),
        }

        if self.record_runs {
            let outcome = audit::RunOutcome::from_result(&result, latency_ms);
            if let Err(e) = audit::record_run(&self.db, request.seeds(), outcome).await {
                log::warn!("Failed to record graph run: {}", e);
            }
        }

        result
    }
}
