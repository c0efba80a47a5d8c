//! Session state containers. Each store is a plain value; its methods are
//! the only transitions, and readers borrow a consistent snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::graph::{Cloud, Graph, NodeType, Position, Props, UEdge, UNode};
use crate::intake::{
    Intake, Priorities, PriorityKey, ProductType, TechStack, TechStackField, PRIORITY_MAX,
    PRIORITY_MIN,
};

// --- Graph ---

/// Partial node edit. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeUpdate {
    pub node_type: Option<NodeType>,
    pub label: Option<String>,
    pub props: Option<Props>,
    pub position: Option<Position>,
    pub cloud: Option<Option<Cloud>>,
}

#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    graph: Graph,
    selected_node_id: Option<String>,
    is_dirty: bool,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn selected_node_id(&self) -> Option<&str> {
        self.selected_node_id.as_deref()
    }

    pub fn selected_node(&self) -> Option<&UNode> {
        self.graph.node(self.selected_node_id.as_deref()?)
    }

    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    /// Replace the whole graph. A freshly loaded graph has no unsaved edits.
    pub fn set_graph(&mut self, graph: Graph) {
        self.graph = graph;
        self.is_dirty = false;
    }

    pub fn select_node(&mut self, node_id: Option<&str>) {
        self.selected_node_id = node_id.map(str::to_string);
    }

    /// Apply a partial edit. Returns false if no node has that id.
    pub fn update_node(&mut self, node_id: &str, update: NodeUpdate) -> bool {
        let Some(node) = self.graph.nodes.iter_mut().find(|n| n.id == node_id) else {
            return false;
        };
        if let Some(t) = update.node_type {
            node.node_type = t;
        }
        if let Some(label) = update.label {
            node.label = label;
        }
        if let Some(props) = update.props {
            node.props = props;
        }
        if let Some(position) = update.position {
            node.position = Some(position);
        }
        if let Some(cloud) = update.cloud {
            node.cloud = cloud;
        }
        self.is_dirty = true;
        true
    }

    pub fn move_node(&mut self, node_id: &str, position: Position) -> bool {
        self.update_node(
            node_id,
            NodeUpdate {
                position: Some(position),
                ..Default::default()
            },
        )
    }

    /// Set or overwrite a single property, keeping the others.
    pub fn set_node_prop(&mut self, node_id: &str, key: &str, value: serde_json::Value) -> bool {
        let Some(node) = self.graph.nodes.iter_mut().find(|n| n.id == node_id) else {
            return false;
        };
        node.props.insert(key.to_string(), value);
        self.is_dirty = true;
        true
    }

    pub fn add_node(&mut self, node: UNode) {
        self.graph.nodes.push(node);
        self.is_dirty = true;
    }

    /// Remove a node together with every edge touching it.
    pub fn remove_node(&mut self, node_id: &str) {
        self.graph.nodes.retain(|n| n.id != node_id);
        self.graph
            .edges
            .retain(|e| e.source != node_id && e.target != node_id);
        if self.selected_node_id.as_deref() == Some(node_id) {
            self.selected_node_id = None;
        }
        self.is_dirty = true;
    }

    pub fn add_edge(&mut self, edge: UEdge) {
        self.graph.edges.push(edge);
        self.is_dirty = true;
    }

    pub fn remove_edge(&mut self, edge_id: &str) {
        self.graph.edges.retain(|e| e.id != edge_id);
        self.is_dirty = true;
    }

    /// Patches from the assistant are recorded but not yet interpreted.
    pub fn apply_patch(&mut self, patch: &serde_json::Value) {
        debug!(%patch, "applying patch");
        self.is_dirty = true;
    }

    pub fn mark_clean(&mut self) {
        self.is_dirty = false;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

// --- Intake ---

pub const INTAKE_STEPS: usize = 3;

#[derive(Debug, Clone, Default)]
pub struct IntakeStore {
    intake: Intake,
    current_step: usize,
}

impl IntakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intake(&self) -> &Intake {
        &self.intake
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn set_product_type(&mut self, product_type: ProductType) {
        self.intake.product_type = product_type;
    }

    pub fn set_tech_stack(&mut self, tech_stack: TechStack) {
        self.intake.tech_stack = tech_stack;
    }

    pub fn set_tech_stack_field(&mut self, field: TechStackField, value: impl Into<String>) {
        *self.intake.tech_stack.field_mut(field) = value.into();
    }

    pub fn set_priorities(&mut self, priorities: Priorities) {
        self.intake.priorities = priorities;
    }

    /// Values are clamped to the 1..=10 dial range.
    pub fn set_priority(&mut self, key: PriorityKey, value: u8) {
        *self.intake.priorities.get_mut(key) = value.clamp(PRIORITY_MIN, PRIORITY_MAX);
    }

    pub fn set_current_step(&mut self, step: usize) {
        self.current_step = step.min(INTAKE_STEPS - 1);
    }

    /// Whether the wizard may leave the current step.
    /// The tech stack step needs at least a frontend or a backend.
    pub fn can_advance(&self) -> bool {
        match self.current_step {
            1 => self.is_complete(),
            _ => true,
        }
    }

    pub fn next_step(&mut self) -> bool {
        if self.current_step + 1 < INTAKE_STEPS && self.can_advance() {
            self.current_step += 1;
            true
        } else {
            false
        }
    }

    pub fn previous_step(&mut self) -> bool {
        if self.current_step > 0 {
            self.current_step -= 1;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_complete(&self) -> bool {
        let stack = &self.intake.tech_stack;
        !stack.frontend.trim().is_empty() || !stack.backend.trim().is_empty()
    }
}

// --- Chat ---

const GREETING: &str = "Hello! I'm here to help you design and optimize your cloud infrastructure. What would you like to work on today?";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patches: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct ChatStore {
    messages: Vec<ChatMessage>,
    is_typing: bool,
    next_id: u64,
}

impl Default for ChatStore {
    fn default() -> Self {
        let mut store = Self {
            messages: Vec::new(),
            is_typing: false,
            next_id: 1,
        };
        store.add_message(GREETING, Role::Assistant, None);
        store
    }
}

impl ChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_typing(&self) -> bool {
        self.is_typing
    }

    pub fn add_message(
        &mut self,
        content: impl Into<String>,
        role: Role,
        patches: Option<Vec<String>>,
    ) -> &ChatMessage {
        let id = self.next_id.to_string();
        self.next_id += 1;
        self.messages.push(ChatMessage {
            id,
            role,
            content: content.into(),
            timestamp: Utc::now(),
            patches,
        });
        &self.messages[self.messages.len() - 1]
    }

    pub fn set_typing(&mut self, is_typing: bool) {
        self.is_typing = is_typing;
    }

    pub fn find_message(&self, id: &str) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// Contents of every message so far, oldest first.
    pub fn history(&self) -> Vec<String> {
        self.messages.iter().map(|m| m.content.clone()).collect()
    }

    /// Drop the conversation and start again from the greeting.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn two_node_store() -> GraphStore {
        let mut graph = Graph::default();
        graph.nodes.push(UNode::new("a", NodeType::Alb, "A"));
        graph.nodes.push(UNode::new("b", NodeType::Rds, "B"));
        graph.edges.push(UEdge::new("a-b", "a", "b"));
        let mut store = GraphStore::new();
        store.set_graph(graph);
        store
    }

    #[test]
    fn set_graph_is_clean_and_edits_are_dirty() {
        let mut store = two_node_store();
        assert!(!store.is_dirty());
        assert!(store.move_node("a", Position { x: 1.0, y: 2.0 }));
        assert!(store.is_dirty());
        assert_eq!(
            store.graph().node("a").unwrap().position,
            Some(Position { x: 1.0, y: 2.0 })
        );
        store.mark_clean();
        assert!(!store.is_dirty());
    }

    #[test]
    fn update_of_missing_node_changes_nothing() {
        let mut store = two_node_store();
        assert!(!store.update_node(
            "zzz",
            NodeUpdate {
                label: Some("x".into()),
                ..Default::default()
            }
        ));
        assert!(!store.is_dirty());
    }

    #[test]
    fn update_node_replaces_given_fields_only() {
        let mut store = two_node_store();
        store.set_node_prop("b", "engine", json!("postgres"));
        store.update_node(
            "b",
            NodeUpdate {
                label: Some("Primary DB".into()),
                cloud: Some(Some(Cloud::Gcp)),
                ..Default::default()
            },
        );
        let b = store.graph().node("b").unwrap();
        assert_eq!(b.label, "Primary DB");
        assert_eq!(b.cloud, Some(Cloud::Gcp));
        assert_eq!(b.node_type, NodeType::Rds);
        assert_eq!(b.props["engine"], json!("postgres"));
    }

    #[test]
    fn remove_node_drops_edges_and_selection() {
        let mut store = two_node_store();
        store.select_node(Some("a"));
        assert_eq!(store.selected_node().map(|n| n.label.as_str()), Some("A"));
        store.remove_node("a");
        assert_eq!(store.graph().nodes.len(), 1);
        assert!(store.graph().edges.is_empty());
        assert_eq!(store.selected_node_id(), None);
    }

    #[test]
    fn remove_other_node_keeps_selection() {
        let mut store = two_node_store();
        store.select_node(Some("a"));
        store.remove_node("b");
        assert_eq!(store.selected_node_id(), Some("a"));
    }

    #[test]
    fn edges_can_be_added_and_removed() {
        let mut store = two_node_store();
        store.add_edge(UEdge::new("b-a", "b", "a"));
        assert_eq!(store.graph().edges.len(), 2);
        store.remove_edge("a-b");
        assert_eq!(store.graph().edges.len(), 1);
        assert_eq!(store.graph().edges[0].id, "b-a");
    }

    #[test]
    fn patch_marks_dirty_and_reset_clears() {
        let mut store = two_node_store();
        store.select_node(Some("b"));
        store.apply_patch(&json!({"op": "add"}));
        assert!(store.is_dirty());
        store.reset();
        assert!(store.graph().is_empty());
        assert_eq!(store.selected_node_id(), None);
        assert!(!store.is_dirty());
    }

    #[test]
    fn intake_completion_needs_frontend_or_backend() {
        let mut store = IntakeStore::new();
        assert!(!store.is_complete());
        store.set_tech_stack_field(TechStackField::Database, "Postgres");
        assert!(!store.is_complete());
        store.set_tech_stack_field(TechStackField::Backend, "Go");
        assert!(store.is_complete());
    }

    #[test]
    fn wizard_blocks_on_tech_stack_step() {
        let mut store = IntakeStore::new();
        assert!(store.next_step());
        assert_eq!(store.current_step(), 1);
        assert!(!store.next_step());
        store.set_tech_stack_field(TechStackField::Frontend, "React");
        assert!(store.next_step());
        assert!(!store.next_step());
        assert_eq!(store.current_step(), 2);
        assert!(store.previous_step());
        store.reset();
        assert_eq!(store.current_step(), 0);
        assert!(!store.previous_step());
    }

    #[test]
    fn priorities_are_clamped() {
        let mut store = IntakeStore::new();
        store.set_priority(PriorityKey::Cost, 42);
        store.set_priority(PriorityKey::Latency, 0);
        assert_eq!(store.intake().priorities.cost, 10);
        assert_eq!(store.intake().priorities.latency, 1);
        assert_eq!(store.intake().priorities.security, 5);
    }

    #[test]
    fn chat_starts_with_greeting_and_tracks_history() {
        let mut chat = ChatStore::new();
        assert_eq!(chat.messages().len(), 1);
        assert_eq!(chat.messages()[0].role, Role::Assistant);
        let id = chat.add_message("add redis", Role::User, None).id.clone();
        assert_eq!(chat.find_message(&id).unwrap().content, "add redis");
        assert_eq!(chat.history().len(), 2);
        assert_eq!(chat.history()[1], "add redis");
    }

    #[test]
    fn chat_ids_are_unique_and_clear_restores_greeting() {
        let mut chat = ChatStore::new();
        let a = chat.add_message("one", Role::User, None).id.clone();
        let b = chat.add_message("two", Role::Assistant, Some(vec!["p".into()])).id.clone();
        assert_ne!(a, b);
        chat.set_typing(true);
        chat.clear();
        assert_eq!(chat.messages().len(), 1);
        assert!(!chat.is_typing());
        assert!(chat.find_message(&b).is_none());
    }
}
