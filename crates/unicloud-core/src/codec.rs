//! Conversion between the service's line-oriented component format and
//! the canvas graph.
//!
//! A descriptor looks like
//! `1 aws:rds:postgres x2 multi-az | region=us-west-2; cost=80/mo`
//! and a connection like `0->1`, where the numbers index into the
//! component list of the same response.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::catalog::{provider_to_cloud, service_to_node_type};
use crate::error::{ComponentError, GraphError};
use crate::graph::{Graph, Position, Props, UEdge, UNode};
use crate::wire::{ChatResponse, TerraformRequest};

pub const EDGE_LABEL: &str = "connects to";
pub const DEFAULT_NOTES: &str = "Generated from UnifiedCloud designer";

const GRID_SPACING: f64 = 400.0;
const GRID_OFFSET_X: f64 = 150.0;
const GRID_OFFSET_Y: f64 = 150.0;

// Optional numbering hint, provider, lazily-matched service path,
// optional `x<n>` multiplier, then ignored trailing words. Digits are
// ASCII only; other numerals fall through to the trailing words.
static SERVICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[0-9]+\s+)?([^:]+):(.+?)(?:\s*x([0-9]+))?(?:\s+.*)?$")
        .expect("component pattern is valid")
});

/// One decoded descriptor line.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedComponent {
    pub id: String,
    pub provider: String,
    pub service: String,
    /// `None` means a single instance.
    pub multiplier: Option<u64>,
    pub region: Option<String>,
    pub cost: Option<String>,
    pub scale: Option<String>,
    pub desc: Option<String>,
    pub props: BTreeMap<String, String>,
}

/// Decode one descriptor. `index` is its position in the response and
/// becomes part of the component id.
pub fn parse_component(input: &str, index: usize) -> Result<ParsedComponent, ComponentError> {
    let mut segments = input.split('|').map(str::trim);
    let service_part = segments.next().unwrap_or_default();
    let props_part = segments.next();

    let invalid = || ComponentError::InvalidFormat {
        input: input.to_string(),
    };

    let caps = SERVICE_RE.captures(service_part).ok_or_else(invalid)?;
    let provider = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
    let service_path = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
    // Nested paths like `rds:postgres` resolve to their most specific part.
    let service = service_path.rsplit(':').next().unwrap_or_default().trim();
    if provider.is_empty() || service.is_empty() {
        return Err(invalid());
    }

    // The capture is ASCII digits, so parsing only fails on overflow.
    let multiplier = caps
        .get(3)
        .map(|m| m.as_str().parse::<u64>().unwrap_or(u64::MAX))
        .filter(|n| *n > 1);

    let mut parsed = ParsedComponent {
        id: format!("component-{}", index),
        provider: provider.to_string(),
        service: service.to_string(),
        multiplier,
        ..Default::default()
    };

    if let Some(props_part) = props_part {
        for pair in props_part.split(';') {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            let (key, value) = (key.trim(), value.trim());
            if key.is_empty() || value.is_empty() {
                continue;
            }
            match key {
                "region" => parsed.region = Some(value.to_string()),
                "cost" => parsed.cost = Some(value.to_string()),
                "scale" => parsed.scale = Some(value.to_string()),
                "desc" => parsed.desc = Some(value.to_string()),
                _ => {}
            }
            parsed.props.insert(key.to_string(), value.to_string());
        }
    }

    Ok(parsed)
}

/// Human-readable node label, e.g. `AWS ECS SERVICE (2x)`.
pub fn generate_label(parsed: &ParsedComponent) -> String {
    let mut label = format!(
        "{} {}",
        parsed.provider.to_uppercase(),
        parsed.service.replace('_', " ").to_uppercase()
    );
    if let Some(m) = parsed.multiplier.filter(|m| *m > 1) {
        label.push_str(&format!(" ({}x)", m));
    }
    label
}

/// Initial grid placement for the node at `index` of `total`.
pub fn calculate_position(index: usize, total: usize) -> Position {
    let cols = ((total as f64).sqrt().ceil() as usize).max(1);
    let col = index % cols;
    let row = index / cols;
    Position {
        x: GRID_OFFSET_X + col as f64 * GRID_SPACING,
        y: GRID_OFFSET_Y + row as f64 * GRID_SPACING,
    }
}

fn parse_connection(raw: &str) -> Option<(usize, usize)> {
    let (source, target) = raw.split_once("->")?;
    Some((source.trim().parse().ok()?, target.trim().parse().ok()?))
}

/// Resolve `a->b` index pairs into edges between `component_ids`.
/// Malformed or out-of-range pairs are dropped, never fatal.
pub fn parse_connections<S: AsRef<str>>(connections: &[S], component_ids: &[String]) -> Vec<UEdge> {
    let mut edges = Vec::with_capacity(connections.len());
    for raw in connections {
        let raw = raw.as_ref();
        let (source_idx, target_idx) = match parse_connection(raw) {
            Some((s, t)) if s < component_ids.len() && t < component_ids.len() => (s, t),
            _ => {
                warn!(
                    connection = raw,
                    component_count = component_ids.len(),
                    "dropping invalid connection"
                );
                continue;
            }
        };
        let source = &component_ids[source_idx];
        let target = &component_ids[target_idx];
        edges.push(UEdge {
            id: format!("{}-{}", source, target),
            source: source.clone(),
            target: target.clone(),
            label: Some(EDGE_LABEL.to_string()),
        });
    }
    edges
}

fn component_node(parsed: &ParsedComponent, index: usize, total: usize) -> UNode {
    let mut props: Props = parsed
        .props
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    props.insert("provider".into(), json!(parsed.provider));
    props.insert("service".into(), json!(parsed.service));
    match parsed.multiplier {
        Some(m) => {
            props.insert("multiplier".into(), json!(m));
        }
        // The descriptor marker wins over any `multiplier=` property.
        None => {
            props.remove("multiplier");
        }
    }
    for (key, value) in [
        ("cost", &parsed.cost),
        ("scale", &parsed.scale),
        ("desc", &parsed.desc),
    ] {
        if let Some(v) = value {
            props.insert(key.into(), json!(v));
        }
    }

    UNode {
        id: parsed.id.clone(),
        node_type: service_to_node_type(&parsed.service),
        label: generate_label(parsed),
        props,
        outputs: None,
        terraform_refs: None,
        position: Some(calculate_position(index, total)),
        cloud: provider_to_cloud(&parsed.provider),
    }
}

/// Build a fresh graph from a chat reply, stamped with the current time.
pub fn chat_response_to_graph(response: &ChatResponse) -> Result<Graph, GraphError> {
    chat_response_to_graph_at(response, Utc::now())
}

/// Build a fresh graph from a chat reply. Any malformed component fails
/// the whole conversion; bad connections are skipped.
pub fn chat_response_to_graph_at(
    response: &ChatResponse,
    generated_at: DateTime<Utc>,
) -> Result<Graph, GraphError> {
    let parsed = response
        .components
        .iter()
        .enumerate()
        .map(|(index, raw)| -> Result<ParsedComponent, GraphError> {
            let component = parse_component(raw, index)
                .map_err(|source| GraphError::Component { index, source })?;
            debug!(index, provider = %component.provider, service = %component.service, "parsed component");
            Ok(component)
        })
        .collect::<Result<Vec<_>, GraphError>>()?;

    let total = parsed.len();
    let nodes: Vec<UNode> = parsed
        .iter()
        .enumerate()
        .map(|(index, p)| component_node(p, index, total))
        .collect();

    let ids: Vec<String> = parsed.iter().map(|p| p.id.clone()).collect();
    let edges = parse_connections(&response.connections, &ids);

    let mut variables = BTreeMap::new();
    variables.insert("generated_at".to_string(), json!(generated_at.to_rfc3339()));
    variables.insert("notes".to_string(), json!(response.notes));

    info!(
        nodes = nodes.len(),
        edges = edges.len(),
        dropped = response.connections.len() - edges.len(),
        "decoded chat response"
    );

    Ok(Graph {
        nodes,
        edges,
        variables,
    })
}

fn encode_node(node: &UNode) -> String {
    let provider = node.prop_text("provider").unwrap_or_else(|| "aws".to_string());
    let service = node
        .prop_text("service")
        .unwrap_or_else(|| node.node_type.as_str().to_string());

    let mut out = format!("{}:{}", provider, service);
    if let Some(m) = node.prop_u64("multiplier").filter(|m| *m > 1) {
        out.push_str(&format!(" x{}", m));
    }

    // Only these three survive the trip; other props are not re-emitted.
    let props: Vec<String> = ["region", "cost", "scale"]
        .iter()
        .filter_map(|key| node.prop_text(key).map(|v| format!("{}={}", key, v)))
        .collect();
    if !props.is_empty() {
        out.push_str(" | ");
        out.push_str(&props.join("; "));
    }
    out
}

/// Encode a graph into the request body of the export endpoint.
/// Fails if an edge references a node that is not in the graph.
pub fn graph_to_chat_format(graph: &Graph) -> Result<TerraformRequest, GraphError> {
    let components: Vec<String> = graph.nodes.iter().map(encode_node).collect();

    let index_of: HashMap<&str, usize> = graph
        .nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id.as_str(), i))
        .collect();

    let connections = graph
        .edges
        .iter()
        .map(|edge| {
            match (
                index_of.get(edge.source.as_str()),
                index_of.get(edge.target.as_str()),
            ) {
                (Some(s), Some(t)) => Ok(format!("{}->{}", s, t)),
                _ => Err(GraphError::DanglingEdge {
                    from: edge.source.clone(),
                    to: edge.target.clone(),
                }),
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    let notes = match graph.variables.get("notes") {
        Some(Value::String(s)) => s.clone(),
        _ => DEFAULT_NOTES.to_string(),
    };

    info!(
        components = components.len(),
        connections = connections.len(),
        "encoded graph for export"
    );

    Ok(TerraformRequest {
        components,
        connections,
        notes,
    })
}
