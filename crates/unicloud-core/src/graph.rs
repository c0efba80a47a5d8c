use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Free-form node properties. Values are whatever the designer or the
/// decoder put there (strings from descriptors, numbers from samples).
pub type Props = BTreeMap<String, Value>;

/// Coarse resource type used to pick an icon and a Terraform template.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Vpc,
    Subnet,
    EcsService,
    Eks,
    Lambda,
    Alb,
    Rds,
    Elasticache,
    S3,
    Cloudfront,
    IamRole,
    Monitoring,
    Secret,
    Queue,
    Topic,
    Gke,
    Cloudrun,
    Sql,
    Vm,
    #[default]
    Custom,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Vpc => "vpc",
            NodeType::Subnet => "subnet",
            NodeType::EcsService => "ecs_service",
            NodeType::Eks => "eks",
            NodeType::Lambda => "lambda",
            NodeType::Alb => "alb",
            NodeType::Rds => "rds",
            NodeType::Elasticache => "elasticache",
            NodeType::S3 => "s3",
            NodeType::Cloudfront => "cloudfront",
            NodeType::IamRole => "iam_role",
            NodeType::Monitoring => "monitoring",
            NodeType::Secret => "secret",
            NodeType::Queue => "queue",
            NodeType::Topic => "topic",
            NodeType::Gke => "gke",
            NodeType::Cloudrun => "cloudrun",
            NodeType::Sql => "sql",
            NodeType::Vm => "vm",
            NodeType::Custom => "custom",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Cloud {
    Aws,
    Gcp,
    Azure,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A node on the design canvas.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UNode {
    pub id: String,
    #[serde(rename = "type", default)]
    pub node_type: NodeType,
    pub label: String,
    #[serde(default)]
    pub props: Props,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terraform_refs: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud: Option<Cloud>,
}

impl UNode {
    pub fn new(id: impl Into<String>, node_type: NodeType, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type,
            label: label.into(),
            props: Props::new(),
            outputs: None,
            terraform_refs: None,
            position: None,
            cloud: None,
        }
    }

    /// Render a property as text if it holds a "truthy" scalar.
    /// Empty strings, zero, `false` and `null` count as absent.
    pub fn prop_text(&self, key: &str) -> Option<String> {
        match self.props.get(key)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
            Value::Bool(true) => Some("true".to_string()),
            _ => None,
        }
    }

    /// Read a numeric property, accepting numbers and numeric strings.
    pub fn prop_u64(&self, key: &str) -> Option<u64> {
        match self.props.get(key)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// A directed edge. `source` and `target` are node ids, not indices.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl UEdge {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            label: None,
        }
    }
}

/// The whole design. Node order is significant: the wire format
/// addresses nodes by their position in `nodes`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Graph {
    #[serde(default)]
    pub nodes: Vec<UNode>,
    #[serde(default)]
    pub edges: Vec<UEdge>,
    #[serde(default)]
    pub variables: BTreeMap<String, Value>,
}

impl Graph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&UNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn has_node(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }
}
