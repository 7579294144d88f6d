//! Knowledge-graph payload assembly: `{nodes, edges}`.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::enrich::AttachmentRef;
use crate::graph::{prune, AdjacencyGraph, VisitedSet};
use crate::records::{EdgeKind, RawFields, RecordId, RecordSource};
use crate::Result;

/// A record in the payload: its pruned detail fields plus `id`, `project` and `attachments`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: RecordId,
    pub project: RecordSource,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl GraphNode {
    fn build(fields: &RawFields, attachments: &[AttachmentRef]) -> Result<Self> {
        let source = fields.source();
        let mut map = match fields.to_value()? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        // The kind-specific primary key is replaced by `id`
        map.remove(source.primary_key());
        map.insert("attachments".to_string(), serde_json::to_value(attachments)?);

        let fields_map = match prune(Value::Object(map)) {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };

        Ok(Self {
            id: fields.record_id().clone(),
            project: source,
            fields: fields_map,
        })
    }

    /// Attachment hits kept after pruning
    pub fn attachments(&self) -> &[Value] {
        self.fields
            .get("attachments")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// An undirected, typed edge between two payload nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphEdge {
    pub source: RecordId,
    pub source_project: RecordSource,
    pub target: RecordId,
    pub target_project: RecordSource,
    #[serde(rename = "type")]
    pub kind: EdgeKind,
}

/// Payload handed to downstream presentation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KnowledgeGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl KnowledgeGraph {
    pub fn node(&self, id: &RecordId) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Build the payload from a traversal and the fetched detail.
///
/// Visited ids without detail are dropped along with every edge touching them.
/// Edges are keyed by `(min id, max id, kind)`, so each relationship appears
/// once whichever direction it was stored in. Roots left without any edge get a
/// `root` self-loop.
pub fn assemble(
    visited: &VisitedSet,
    adjacency: &AdjacencyGraph,
    roots: &[RecordId],
    detail: &HashMap<RecordId, RawFields>,
    attachments: &HashMap<RecordId, Vec<AttachmentRef>>,
) -> Result<KnowledgeGraph> {
    let mut nodes = Vec::new();
    let mut projects: HashMap<&RecordId, RecordSource> = HashMap::new();

    for id in visited {
        let Some(fields) = detail.get(id) else {
            log::debug!("No detail for {}; dropping it from the graph", id);
            continue;
        };
        let hits = attachments.get(id).map(Vec::as_slice).unwrap_or(&[]);
        nodes.push(GraphNode::build(fields, hits)?);
        projects.insert(id, fields.source());
    }

    let mut keyed: BTreeMap<(&RecordId, &RecordId, EdgeKind), GraphEdge> = BTreeMap::new();
    for (source, neighbors) in adjacency.iter() {
        let Some(&source_project) = projects.get(source) else {
            continue;
        };
        for (target, kind) in neighbors {
            let Some(&target_project) = projects.get(target) else {
                continue;
            };
            let (a, a_project, b, b_project) = if source <= target {
                (source, source_project, target, target_project)
            } else {
                (target, target_project, source, source_project)
            };
            keyed.entry((a, b, *kind)).or_insert_with(|| GraphEdge {
                source: a.clone(),
                source_project: a_project,
                target: b.clone(),
                target_project: b_project,
                kind: *kind,
            });
        }
    }

    let connected: BTreeSet<&RecordId> = keyed.keys().flat_map(|(a, b, _)| [*a, *b]).collect();
    let mut edges: Vec<GraphEdge> = keyed.into_values().collect();

    let mut seen_roots = BTreeSet::new();
    for root in roots {
        if !seen_roots.insert(root) || connected.contains(root) {
            continue;
        }
        if let Some(&project) = projects.get(root) {
            edges.push(GraphEdge {
                source: root.clone(),
                source_project: project,
                target: root.clone(),
                target_project: project,
                kind: EdgeKind::Root,
            });
        }
    }

    log::debug!("Assembled {} node(s), {} edge(s)", nodes.len(), edges.len());
    Ok(KnowledgeGraph { nodes, edges })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{EightDFields, MrbeFields, NceFields};
    use crate::testutil::rid;
    use serde_json::json;

    fn nce(id: &str) -> RawFields {
        RawFields::Nce(NceFields {
            nce_id: rid(id),
            parent_id: None,
            opened_date: Some("2024-01-10".to_string()),
            customer: Some("".to_string()),
            part_number: Some("P-1".to_string()),
            part_revision: Some("A".to_string()),
            description: None,
            quantity_affected: Some(f64::NAN),
            status: Some("open".to_string()),
        })
    }

    fn mrbe(id: &str, parent: &str) -> RawFields {
        RawFields::Mrbe(MrbeFields {
            mrbe_id: rid(id),
            parent_id: Some(parent.to_string()),
            opened_date: None,
            part_number: None,
            disposition: Some("rework".to_string()),
            finding: None,
            quantity_rejected: Some(3.0),
            status: None,
        })
    }

    fn eightd(id: &str) -> RawFields {
        RawFields::EightD(EightDFields {
            eightd_id: rid(id),
            parent_id: None,
            related_records: Some("100".to_string()),
            opened_date: None,
            part_number: None,
            problem_statement: Some("burr".to_string()),
            root_cause: None,
            summary: None,
            status: None,
        })
    }

    fn detail(list: Vec<RawFields>) -> HashMap<RecordId, RawFields> {
        list.into_iter().map(|r| (r.record_id().clone(), r)).collect()
    }

    fn visited(ids: &[&str]) -> VisitedSet {
        ids.iter().map(|s| rid(s)).collect()
    }

    #[test]
    fn test_isolated_root_gets_self_loop() {
        let graph = assemble(
            &visited(&["100"]),
            &AdjacencyGraph::new(),
            &[rid("100")],
            &detail(vec![nce("100")]),
            &HashMap::new(),
        )
        .unwrap();

        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.nodes[0].id, rid("100"));
        assert_eq!(
            graph.edges,
            vec![GraphEdge {
                source: rid("100"),
                source_project: RecordSource::Nce,
                target: rid("100"),
                target_project: RecordSource::Nce,
                kind: EdgeKind::Root,
            }]
        );
    }

    #[test]
    fn test_node_fields_pruned_and_renamed() {
        let hits = HashMap::from([(
            rid("100"),
            vec![AttachmentRef {
                attachment_id: "a1".to_string(),
                file_name: "report.pdf".to_string(),
                score: 0.9,
                snippet: None,
            }],
        )]);
        let graph = assemble(
            &visited(&["100"]),
            &AdjacencyGraph::new(),
            &[rid("100")],
            &detail(vec![nce("100")]),
            &hits,
        )
        .unwrap();

        let value = serde_json::to_value(&graph.nodes[0]).unwrap();
        assert_eq!(value["id"], "100");
        assert_eq!(value["project"], "NCe");
        assert_eq!(value["status"], "open");
        assert!(value.get("nce_id").is_none());
        assert!(value.get("customer").is_none());
        assert!(value.get("description").is_none());
        assert!(value.get("quantity_affected").is_none());
        assert_eq!(
            value["attachments"],
            json!([{"attachment_id": "a1", "file_name": "report.pdf", "score": 0.9f32}])
        );
    }

    #[test]
    fn test_edges_deduplicated_and_consistent() {
        let mut adjacency = AdjacencyGraph::new();
        adjacency.link(&rid("200"), &rid("100"), EdgeKind::Parent);
        adjacency.link(&rid("300"), &rid("100"), EdgeKind::Related);
        adjacency.link(&rid("300"), &rid("404"), EdgeKind::Related);

        let graph = assemble(
            &visited(&["100", "200", "300", "404"]),
            &adjacency,
            &[rid("100")],
            &detail(vec![nce("100"), mrbe("200", "100"), eightd("300")]),
            &HashMap::new(),
        )
        .unwrap();

        assert_eq!(graph.nodes.len(), 3);
        assert!(graph.node(&rid("404")).is_none());
        assert_eq!(graph.edges.len(), 2);

        let parent = &graph.edges[0];
        assert_eq!((parent.source.as_str(), parent.target.as_str()), ("100", "200"));
        assert_eq!(parent.source_project, RecordSource::Nce);
        assert_eq!(parent.target_project, RecordSource::Mrbe);
        assert_eq!(parent.kind, EdgeKind::Parent);
        assert_eq!(graph.edges[1].kind, EdgeKind::Related);

        for edge in &graph.edges {
            assert!(graph.node(&edge.source).is_some());
            assert!(graph.node(&edge.target).is_some());
        }
        assert!(graph.edges.iter().all(|e| e.kind != EdgeKind::Root));
    }

    #[test]
    fn test_root_whose_only_neighbor_is_dropped() {
        let mut adjacency = AdjacencyGraph::new();
        adjacency.link(&rid("100"), &rid("404"), EdgeKind::Parent);

        let graph = assemble(
            &visited(&["100", "404"]),
            &adjacency,
            &[rid("100"), rid("100")],
            &detail(vec![nce("100")]),
            &HashMap::new(),
        )
        .unwrap();

        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].kind, EdgeKind::Root);
    }

    #[test]
    fn test_assembly_is_idempotent() {
        let mut forward = AdjacencyGraph::new();
        forward.link(&rid("100"), &rid("200"), EdgeKind::Parent);
        forward.link(&rid("100"), &rid("300"), EdgeKind::Related);
        let mut backward = AdjacencyGraph::new();
        backward.link(&rid("300"), &rid("100"), EdgeKind::Related);
        backward.link(&rid("200"), &rid("100"), EdgeKind::Parent);

        let records = detail(vec![nce("100"), mrbe("200", "100"), eightd("300")]);
        let ids = visited(&["100", "200", "300"]);
        let a = assemble(&ids, &forward, &[rid("100")], &records, &HashMap::new()).unwrap();
        let b = assemble(&ids, &backward, &[rid("100")], &records, &HashMap::new()).unwrap();
        let c = assemble(&ids, &forward, &[rid("100")], &records, &HashMap::new()).unwrap();

        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn test_root_without_detail_is_absent() {
        let graph = assemble(
            &visited(&["100"]),
            &AdjacencyGraph::new(),
            &[rid("100")],
            &HashMap::new(),
            &HashMap::new(),
        )
        .unwrap();
        assert!(graph.is_empty());
        assert!(graph.edges.is_empty());
    }
}
