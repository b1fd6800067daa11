//! Graph Export: serialize a filtered node/edge snapshot
//! into one of the canonical visualization shapes.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use serde_json::{json, Value};

use crate::docs::{DocId, DocumentStore, SectionId};
use crate::error::HierarchResult;
use crate::graph::{expand_graph, EdgeType, ExpandConfig, GraphStore};

/// Which output shape `exportGraphFormat` should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Cytoscape,
    D3,
    Vis,
    Graphml,
}

/// Export filters. `doc_ids` restricts which documents'
/// nodes are walked; empty means every document. `min_degree` and
/// `max_nodes` are applied in that order.
#[derive(Debug, Clone, Default)]
pub struct ExportConfig {
    pub doc_ids: Vec<DocId>,
    pub edge_types: Vec<EdgeType>,
    pub min_degree: usize,
    pub max_nodes: Option<usize>,
    pub include_document_nodes: bool,
}

#[derive(Debug, Clone)]
pub struct ExportNode {
    pub id: SectionId,
    pub label: String,
    pub doc_id: DocId,
    pub level: u32,
    pub node_type: &'static str,
}

#[derive(Debug, Clone)]
pub struct ExportEdge {
    pub from: SectionId,
    pub to: SectionId,
    pub edge_type: EdgeType,
    pub weight: Option<f32>,
}

#[derive(Debug, Clone, Default)]
pub struct ExportStats {
    pub node_count: usize,
    pub edge_count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct GraphSnapshot {
    pub nodes: Vec<ExportNode>,
    pub edges: Vec<ExportEdge>,
    pub stats: ExportStats,
}

/// Assemble a filtered `{nodes[], edges[], stats}` snapshot.
pub fn export_graph(
    doc_store: &dyn DocumentStore,
    graph_store: &dyn GraphStore,
    cfg: &ExportConfig,
) -> HierarchResult<GraphSnapshot> {
    let mut nodes: Vec<ExportNode> = Vec::new();
    for summary in doc_store.list()? {
        if !cfg.doc_ids.is_empty() && !cfg.doc_ids.contains(&summary.doc_id) {
            continue;
        }
        let Some(doc) = doc_store.load(&summary.doc_id)? else {
            continue;
        };
        for node in doc.root.flatten() {
            let is_document = node.id == doc.root.id;
            if is_document && !cfg.include_document_nodes {
                continue;
            }
            nodes.push(ExportNode {
                id: node.id.clone(),
                label: node.title.clone(),
                doc_id: doc.doc_id.clone(),
                level: node.level,
                node_type: if is_document { "document" } else { "section" },
            });
        }
    }

    let mut edges: Vec<ExportEdge> = Vec::new();
    let types: Vec<EdgeType> = if cfg.edge_types.is_empty() {
        EdgeType::ALL.to_vec()
    } else {
        cfg.edge_types.clone()
    };
    let mut seen: HashSet<(SectionId, SectionId, EdgeType)> = HashSet::new();
    for edge_type in types {
        for edge in graph_store.get_edges_by_type(edge_type)? {
            let key = (edge.from.clone(), edge.to.clone(), edge.edge_type);
            if seen.insert(key) {
                edges.push(ExportEdge {
                    from: edge.from,
                    to: edge.to,
                    edge_type: edge.edge_type,
                    weight: edge.weight,
                });
            }
        }
    }

    // Degree filter: drop nodes below `min_degree`, then their incident edges.
    if cfg.min_degree > 0 {
        let mut degree: HashMap<SectionId, usize> = HashMap::new();
        for edge in &edges {
            *degree.entry(edge.from.clone()).or_insert(0) += 1;
            *degree.entry(edge.to.clone()).or_insert(0) += 1;
        }
        nodes.retain(|n| degree.get(&n.id).copied().unwrap_or(0) >= cfg.min_degree);
        let kept: HashSet<&SectionId> = nodes.iter().map(|n| &n.id).collect();
        edges.retain(|e| kept.contains(&e.from) && kept.contains(&e.to));
    }

    // Node cap: keep the highest-degree nodes, then their incident edges.
    if let Some(max_nodes) = cfg.max_nodes {
        if nodes.len() > max_nodes {
            let mut degree: HashMap<SectionId, usize> = HashMap::new();
            for edge in &edges {
                *degree.entry(edge.from.clone()).or_insert(0) += 1;
                *degree.entry(edge.to.clone()).or_insert(0) += 1;
            }
            nodes.sort_by(|a, b| {
                degree
                    .get(&b.id)
                    .copied()
                    .unwrap_or(0)
                    .cmp(&degree.get(&a.id).copied().unwrap_or(0))
            });
            nodes.truncate(max_nodes);
            let kept: HashSet<&SectionId> = nodes.iter().map(|n| &n.id).collect();
            edges.retain(|e| kept.contains(&e.from) && kept.contains(&e.to));
        }
    }

    let stats = ExportStats {
        node_count: nodes.len(),
        edge_count: edges.len(),
    };
    Ok(GraphSnapshot { nodes, edges, stats })
}

/// Expand from `seeds` first, then export just that sub-graph
/// (`exportSubgraph`).
pub fn export_subgraph(
    doc_store: &dyn DocumentStore,
    graph_store: &dyn GraphStore,
    seeds: &[SectionId],
    max_hops: u32,
    max_nodes: usize,
    format: ExportFormat,
) -> HierarchResult<Value> {
    let cfg = ExpandConfig {
        max_hops,
        max_nodes,
        edge_types: EdgeType::ALL.to_vec(),
        min_weight: 0.0,
    };
    let expanded = expand_graph(graph_store, seeds, &cfg)?;
    let node_ids: HashSet<SectionId> = expanded.iter().map(|n| n.node_id.clone()).collect();

    let full_export = ExportConfig {
        max_nodes: None,
        ..Default::default()
    };
    let snapshot = export_graph(doc_store, graph_store, &full_export)?;
    let filtered = GraphSnapshot {
        nodes: snapshot
            .nodes
            .into_iter()
            .filter(|n| node_ids.contains(&n.id))
            .collect(),
        edges: snapshot
            .edges
            .into_iter()
            .filter(|e| node_ids.contains(&e.from) && node_ids.contains(&e.to))
            .collect(),
        stats: ExportStats::default(),
    };
    Ok(serialize(&filtered, format))
}

pub fn export_graph_format(snapshot: &GraphSnapshot, format: ExportFormat) -> Value {
    serialize(snapshot, format)
}

fn serialize(snapshot: &GraphSnapshot, format: ExportFormat) -> Value {
    match format {
        ExportFormat::Cytoscape => to_cytoscape(snapshot),
        ExportFormat::D3 => to_d3(snapshot),
        ExportFormat::Vis => to_vis(snapshot),
        ExportFormat::Graphml => Value::String(to_graphml(snapshot)),
    }
}

fn to_cytoscape(snapshot: &GraphSnapshot) -> Value {
    let nodes: Vec<Value> = snapshot
        .nodes
        .iter()
        .map(|n| {
            json!({"data": {
                "id": n.id.as_str(),
                "label": n.label,
                "docId": n.doc_id.as_str(),
                "level": n.level,
                "nodeType": n.node_type,
            }})
        })
        .collect();
    let edges: Vec<Value> = snapshot
        .edges
        .iter()
        .map(|e| {
            json!({"data": {
                "id": format!("{}->{}:{}", e.from.as_str(), e.to.as_str(), e.edge_type.as_str()),
                "source": e.from.as_str(),
                "target": e.to.as_str(),
                "type": e.edge_type.as_str(),
                "weight": e.weight,
            }})
        })
        .collect();
    json!({"elements": {"nodes": nodes, "edges": edges}})
}

fn to_d3(snapshot: &GraphSnapshot) -> Value {
    #[derive(Serialize)]
    struct D3Node<'a> {
        id: &'a str,
        label: &'a str,
        #[serde(rename = "docId")]
        doc_id: &'a str,
        level: u32,
    }
    #[derive(Serialize)]
    struct D3Link<'a> {
        source: &'a str,
        target: &'a str,
        #[serde(rename = "type")]
        edge_type: &'a str,
        weight: Option<f32>,
    }
    let nodes: Vec<D3Node> = snapshot
        .nodes
        .iter()
        .map(|n| D3Node { id: n.id.as_str(), label: &n.label, doc_id: n.doc_id.as_str(), level: n.level })
        .collect();
    let links: Vec<D3Link> = snapshot
        .edges
        .iter()
        .map(|e| D3Link { source: e.from.as_str(), target: e.to.as_str(), edge_type: e.edge_type.as_str(), weight: e.weight })
        .collect();
    json!({"nodes": nodes, "links": links})
}

fn to_vis(snapshot: &GraphSnapshot) -> Value {
    let nodes: Vec<Value> = snapshot
        .nodes
        .iter()
        .map(|n| {
            json!({
                "id": n.id.as_str(),
                "label": n.label,
                "group": n.doc_id.as_str(),
                "level": n.level,
                "title": n.label,
            })
        })
        .collect();
    let edges: Vec<Value> = snapshot
        .edges
        .iter()
        .map(|e| {
            json!({
                "id": format!("{}->{}:{}", e.from.as_str(), e.to.as_str(), e.edge_type.as_str()),
                "from": e.from.as_str(),
                "to": e.to.as_str(),
                "label": e.edge_type.as_str(),
                "value": e.weight,
            })
        })
        .collect();
    json!({"nodes": nodes, "edges": edges})
}

fn to_graphml(snapshot: &GraphSnapshot) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<graphml xmlns=\"http://graphml.graphdrawing.org/xmlns\">\n");
    out.push_str("  <key id=\"label\" for=\"node\" attr.name=\"label\" attr.type=\"string\"/>\n");
    out.push_str("  <key id=\"type\" for=\"edge\" attr.name=\"type\" attr.type=\"string\"/>\n");
    out.push_str("  <key id=\"weight\" for=\"edge\" attr.name=\"weight\" attr.type=\"double\"/>\n");
    out.push_str("  <graph id=\"G\" edgedefault=\"directed\">\n");
    for node in &snapshot.nodes {
        out.push_str(&format!(
            "    <node id=\"{}\"><data key=\"label\">{}</data></node>\n",
            xml_escape(node.id.as_str()),
            xml_escape(&node.label)
        ));
    }
    for (i, edge) in snapshot.edges.iter().enumerate() {
        out.push_str(&format!(
            "    <edge id=\"e{i}\" source=\"{}\" target=\"{}\"><data key=\"type\">{}</data><data key=\"weight\">{}</data></edge>\n",
            xml_escape(edge.from.as_str()),
            xml_escape(edge.to.as_str()),
            xml_escape(edge.edge_type.as_str()),
            edge.weight.unwrap_or(0.0)
        ));
    }
    out.push_str("  </graph>\n</graphml>\n");
    out
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}
