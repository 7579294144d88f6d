//! Box-drawing tree rendering of a spanning tree.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;

use crate::graph::SpanningTree;
use crate::records::{EdgeKind, RawFields, RecordId};

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const PIPE: &str = "│   ";
const SPACE: &str = "    ";

fn label(records: &HashMap<RecordId, RawFields>, id: &RecordId, kind: Option<EdgeKind>) -> String {
    let mut out = match records.get(id) {
        Some(fields) => match fields.part_number() {
            Some(part) => format!("{} ({}) part={}", id, fields.source(), part),
            None => format!("{} ({})", id, fields.source()),
        },
        None => format!("{} (unknown)", id),
    };
    if kind == Some(EdgeKind::Related) {
        out.push_str(" [related]");
    }
    out
}

/// Children grouped by parent: parent-edge children first, then related, each sorted by id.
fn children_index(tree: &SpanningTree) -> BTreeMap<&RecordId, Vec<&RecordId>> {
    let mut grouped: BTreeMap<&RecordId, (Vec<&RecordId>, Vec<&RecordId>)> = BTreeMap::new();
    for (child, parent) in &tree.parent {
        let Some(parent) = parent else {
            continue;
        };
        let entry = grouped.entry(parent).or_default();
        match tree.edge_kind.get(child).copied().flatten() {
            Some(EdgeKind::Related) => entry.1.push(child),
            _ => entry.0.push(child),
        }
    }

    grouped
        .into_iter()
        .map(|(parent, (mut structural, mut related))| {
            structural.sort();
            related.sort();
            structural.extend(related);
            (parent, structural)
        })
        .collect()
}

fn render_children(
    records: &HashMap<RecordId, RawFields>,
    tree: &SpanningTree,
    children: &BTreeMap<&RecordId, Vec<&RecordId>>,
    node: &RecordId,
    prefix: &str,
    out: &mut String,
) {
    let Some(kids) = children.get(node) else {
        return;
    };
    for (i, child) in kids.iter().enumerate() {
        let last = i + 1 == kids.len();
        let kind = tree.edge_kind.get(*child).copied().flatten();
        let _ = writeln!(
            out,
            "{}{}{}",
            prefix,
            if last { LAST_BRANCH } else { BRANCH },
            label(records, child, kind)
        );
        let next_prefix = format!("{}{}", prefix, if last { SPACE } else { PIPE });
        render_children(records, tree, children, child, &next_prefix, out);
    }
}

/// Render the subtree rooted at `root`, one line per node, newline-terminated.
pub fn render_tree(
    records: &HashMap<RecordId, RawFields>,
    tree: &SpanningTree,
    root: &RecordId,
) -> String {
    let children = children_index(tree);
    let mut out = String::new();
    let _ = writeln!(out, "{}", label(records, root, None));
    render_children(records, tree, &children, root, "", &mut out);
    out
}

/// One tree per root, separated by a blank line.
pub fn render_forest(
    records: &HashMap<RecordId, RawFields>,
    tree: &SpanningTree,
    roots: &[RecordId],
) -> String {
    roots
        .iter()
        .map(|root| render_tree(records, tree, root))
        .collect::<Vec<_>>()
        .join("\n")
}
