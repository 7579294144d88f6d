//! BFS relationship discovery across the NCe, MRBe and 8D views.

use std::collections::VecDeque;

use crate::graph::{AdjacencyGraph, Traversal, VisitedSet};
use crate::records::{EdgeKind, GraphRequest, RecordId, RecordSource};
use crate::store::{RecordStore, ViewFilters, ViewPredicate};
use crate::{QrgraphError, Result};

/// Discover every record transitively related to the request's seeds.
///
/// Each dequeued candidate issues one query per view; rows contribute symmetric
/// `parent` and `related` edges and enqueue their endpoints. Any store failure
/// aborts the whole traversal.
pub fn traverse<S>(store: &S, request: &GraphRequest) -> Result<Traversal>
where
    S: RecordStore + ?Sized,
{
    let mut visited = VisitedSet::new();
    let mut adjacency = AdjacencyGraph::new();
    let mut queue: VecDeque<RecordId> = request.seeds().iter().cloned().collect();

    while let Some(candidate) = queue.pop_front() {
        if !visited.insert(candidate.clone()) {
            continue;
        }

        for view in RecordSource::ALL {
            let predicate = ViewPredicate::for_candidate(view, &candidate);
            let filters = ViewFilters::for_view(view, request.date_range(), request.part_revisions());

            let rows = store
                .query_view(view, &predicate, &filters)
                .map_err(|e| {
                    QrgraphError::data_source(format!("{} id={}", view.view_name(), candidate), e)
                })?;

            for row in rows {
                let Some(child) = row.child else {
                    continue;
                };

                if let Some(parent) = &row.parent {
                    adjacency.link(&child, parent, EdgeKind::Parent);
                    if !visited.contains(parent) {
                        queue.push_back(parent.clone());
                    }
                }

                for related in &row.related {
                    adjacency.link(&child, related, EdgeKind::Related);
                    if !visited.contains(related) {
                        queue.push_back(related.clone());
                    }
                }

                if !visited.contains(&child) {
                    queue.push_back(child);
                }
            }
        }

        log::debug!("Visited {} (frontier: {})", candidate, queue.len());
    }

    log::info!(
        "Traversal from {} seed(s) visited {} record(s), {} edge(s)",
        request.seeds().len(),
        visited.len(),
        adjacency.edge_count()
    );

    Ok(Traversal { adjacency, visited })
}
