use serde_json::json;

use crate::graph::{Cloud, Graph, NodeType, Position, UEdge, UNode};
use crate::intake::{Intake, ProductType};

fn node(id: &str, node_type: NodeType, label: String, x: f64, y: f64) -> UNode {
    let mut n = UNode::new(id, node_type, label);
    n.position = Some(Position { x, y });
    n.cloud = Some(Cloud::Aws);
    n
}

fn or_default<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() {
        fallback
    } else {
        value
    }
}

/// Local starter design used when the design service cannot produce one.
pub fn create_sample_graph(intake: &Intake) -> Graph {
    let stack = &intake.tech_stack;
    let mut graph = Graph::default();

    let mut vpc = node("vpc-1", NodeType::Vpc, "Main VPC".into(), 100.0, 100.0);
    vpc.props.insert("cidr".into(), json!("10.0.0.0/16"));
    graph.nodes.push(vpc);

    for (id, label, cidr, az, y) in [
        ("subnet-1", "Public Subnet", "10.0.1.0/24", "a", 100.0),
        ("subnet-2", "Private Subnet", "10.0.2.0/24", "b", 200.0),
    ] {
        let mut subnet = node(id, NodeType::Subnet, label.into(), 300.0, y);
        subnet.props.insert("cidr".into(), json!(cidr));
        subnet.props.insert("availability_zone".into(), json!(az));
        graph.nodes.push(subnet);
    }

    let has_app = intake.product_type == ProductType::Webapp
        && (!stack.frontend.is_empty() || !stack.backend.is_empty());
    if has_app {
        let mut alb = node("alb-1", NodeType::Alb, "Load Balancer".into(), 500.0, 100.0);
        alb.props.insert("scheme".into(), json!("internet-facing"));
        graph.nodes.push(alb);

        let label = format!("{} Service", or_default(&stack.backend, "Web"));
        let mut ecs = node("ecs-1", NodeType::EcsService, label, 700.0, 150.0);
        ecs.props.insert("desired_count".into(), json!(2));
        ecs.props.insert("cpu".into(), json!("256"));
        ecs.props.insert("memory".into(), json!("512"));
        graph.nodes.push(ecs);
    }

    if !stack.database.is_empty() {
        let label = format!("{} Database", stack.database);
        let mut db = node("db-1", NodeType::Rds, label, 700.0, 300.0);
        db.props.insert("engine".into(), json!("postgres"));
        db.props.insert("instance_class".into(), json!("db.t3.micro"));
        db.props.insert("allocated_storage".into(), json!(20));
        graph.nodes.push(db);
    }

    graph.edges.push(UEdge::new("vpc-subnet1", "vpc-1", "subnet-1"));
    graph.edges.push(UEdge::new("vpc-subnet2", "vpc-1", "subnet-2"));

    if graph.has_node("alb-1") {
        graph.edges.push(UEdge::new("subnet-alb", "subnet-1", "alb-1"));
        if graph.has_node("ecs-1") {
            graph.edges.push(UEdge::new("alb-ecs", "alb-1", "ecs-1"));
        }
    }

    if graph.has_node("db-1") {
        let app_id = graph
            .nodes
            .iter()
            .find(|n| matches!(n.node_type, NodeType::EcsService | NodeType::Cloudrun))
            .map(|n| n.id.clone());
        if let Some(app_id) = app_id {
            graph
                .edges
                .push(UEdge::new(format!("{}-db", app_id), app_id, "db-1"));
        }
    }

    graph.variables.insert("environment".into(), json!("production"));
    graph.variables.insert("region".into(), json!("us-west-2"));
    graph
        .variables
        .insert("frontend".into(), json!(or_default(&stack.frontend, "React")));
    graph
        .variables
        .insert("backend".into(), json!(or_default(&stack.backend, "Node.js")));

    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::graph_to_chat_format;

    fn webapp(frontend: &str, backend: &str, database: &str) -> Intake {
        let mut intake = Intake::default();
        intake.tech_stack.frontend = frontend.into();
        intake.tech_stack.backend = backend.into();
        intake.tech_stack.database = database.into();
        intake
    }

    #[test]
    fn full_webapp_sample() {
        let graph = create_sample_graph(&webapp("React", "Django", "PostgreSQL"));
        let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["vpc-1", "subnet-1", "subnet-2", "alb-1", "ecs-1", "db-1"]);
        assert_eq!(graph.node("ecs-1").unwrap().label, "Django Service");
        assert_eq!(graph.node("db-1").unwrap().label, "PostgreSQL Database");
        assert_eq!(graph.edges.len(), 5);
        assert!(graph.edges.iter().any(|e| e.id == "ecs-1-db"));
        assert_eq!(graph.variables["backend"], json!("Django"));
    }

    #[test]
    fn non_webapp_without_database_is_network_only() {
        let mut intake = webapp("", "Go", "");
        intake.product_type = ProductType::Batch;
        let graph = create_sample_graph(&intake);
        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.edges.len(), 2);
        assert_eq!(graph.variables["frontend"], json!("React"));
    }

    #[test]
    fn database_without_app_has_no_app_edge() {
        let mut intake = webapp("", "", "MySQL");
        intake.product_type = ProductType::Api;
        let graph = create_sample_graph(&intake);
        assert!(graph.has_node("db-1"));
        assert!(!graph.edges.iter().any(|e| e.target == "db-1"));
    }

    #[test]
    fn sample_graph_encodes_cleanly() {
        let graph = create_sample_graph(&webapp("Vue", "", "Postgres"));
        let req = graph_to_chat_format(&graph).unwrap();
        assert_eq!(req.components[0], "aws:vpc");
        assert_eq!(req.components[4], "aws:ecs_service");
        assert_eq!(req.connections.len(), graph.edges.len());
    }
}
