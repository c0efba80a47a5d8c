//! Local HCL rendering, used when the export service is unavailable.

use crate::graph::{Graph, NodeType, UNode};

const VARIABLES: &str = r#"# Variables
variable "region" {
  description = "AWS region"
  type        = string
  default     = "us-west-2"
}

variable "environment" {
  description = "Environment name"
  type        = string
  default     = "production"
}

variable "db_password" {
  description = "Database password"
  type        = string
  sensitive   = true
}
"#;

const OUTPUTS: &str = r#"# Outputs
output "vpc_id" {
  description = "ID of the VPC"
  value       = try(aws_vpc.vpc-1.id, null)
}

output "load_balancer_dns" {
  description = "DNS name of the load balancer"
  value       = try(aws_lb.alb-1.dns_name, null)
}
"#;

/// Escape text for the inside of an HCL quoted string, so user input can
/// neither close the literal nor start an interpolation or directive.
fn hcl_string(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '$' | '%' if chars.peek() == Some(&'{') => {
                out.push(c);
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// Property value as an escaped HCL string body.
fn prop_or(node: &UNode, key: &str, fallback: &str) -> String {
    hcl_string(&node.prop_text(key).unwrap_or_else(|| fallback.to_string()))
}

/// Render one node as an HCL resource block, or a commented stub for
/// types without a template.
pub fn render_node_terraform(node: &UNode) -> String {
    let id = &node.id;
    let label = hcl_string(&node.label);
    match node.node_type {
        NodeType::Vpc => format!(
            r#"resource "aws_vpc" "{id}" {{
  cidr_block           = "{cidr}"
  enable_dns_hostnames = true
  enable_dns_support   = true

  tags = {{
    Name = "{label}"
  }}
}}"#,
            cidr = prop_or(node, "cidr", "10.0.0.0/16"),
        ),
        NodeType::Subnet => format!(
            r#"resource "aws_subnet" "{id}" {{
  vpc_id            = aws_vpc.vpc-1.id
  cidr_block        = "{cidr}"
  availability_zone = "${{var.region}}{az}"

  tags = {{
    Name = "{label}"
  }}
}}"#,
            cidr = prop_or(node, "cidr", "10.0.1.0/24"),
            az = prop_or(node, "availability_zone", "a"),
        ),
        NodeType::Rds => {
            let engine = prop_or(node, "engine", "postgres");
            let version = if engine == "postgres" { "13.7" } else { "8.0" };
            format!(
                r#"resource "aws_db_instance" "{id}" {{
  identifier     = "{id}"
  engine         = "{engine}"
  engine_version = "{version}"
  instance_class = "{class}"

  allocated_storage = {storage}
  storage_encrypted = true

  db_name  = "{db_name}"
  username = "{username}"
  password = "${{var.db_password}}"

  vpc_security_group_ids = [aws_security_group.db.id]
  db_subnet_group_name   = aws_db_subnet_group.main.name

  skip_final_snapshot = true

  tags = {{
    Name = "{label}"
  }}
}}"#,
                class = prop_or(node, "instance_class", "db.t3.micro"),
                storage = node.prop_u64("allocated_storage").unwrap_or(20),
                db_name = prop_or(node, "db_name", "main"),
                username = prop_or(node, "username", "admin"),
            )
        }
        NodeType::EcsService => format!(
            r#"resource "aws_ecs_service" "{id}" {{
  name            = "{id}"
  cluster         = aws_ecs_cluster.main.id
  task_definition = aws_ecs_task_definition.{id}.arn
  desired_count   = {count}

  deployment_configuration {{
    maximum_percent         = 200
    minimum_healthy_percent = 100
  }}

  network_configuration {{
    subnets         = [aws_subnet.subnet-2.id]
    security_groups = [aws_security_group.app.id]
  }}

  load_balancer {{
    target_group_arn = aws_lb_target_group.app.arn
    container_name   = "{id}"
    container_port   = 80
  }}

  depends_on = [aws_lb_listener.app]

  tags = {{
    Name = "{label}"
  }}
}}"#,
            count = node
                .prop_u64("desired_count")
                .or_else(|| node.prop_u64("multiplier"))
                .unwrap_or(2),
        ),
        other => {
            let props = serde_json::to_string_pretty(&node.props).unwrap_or_default();
            let props = props.replace('\n', "\n# ");
            format!(
                "# {kind} \"{id}\" configuration\n# Label: {label}\n# Props: {props}",
                kind = other.as_str(),
                label = node.label.replace(['\r', '\n'], " "),
            )
        }
    }
}

/// Render the whole graph: variables, one block per node, then outputs.
pub fn render_terraform(graph: &Graph) -> String {
    let blocks: Vec<String> = graph.nodes.iter().map(render_node_terraform).collect();
    format!("{}\n{}\n\n{}", VARIABLES, blocks.join("\n\n"), OUTPUTS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn vpc_uses_cidr_prop() {
        let mut node = UNode::new("vpc-1", NodeType::Vpc, "Main VPC");
        node.props.insert("cidr".into(), json!("10.1.0.0/16"));
        let hcl = render_node_terraform(&node);
        assert!(hcl.starts_with(r#"resource "aws_vpc" "vpc-1" {"#));
        assert!(hcl.contains(r#"cidr_block           = "10.1.0.0/16""#));
        assert!(hcl.contains(r#"Name = "Main VPC""#));
    }

    #[test]
    fn subnet_keeps_terraform_interpolation() {
        let node = UNode::new("subnet-1", NodeType::Subnet, "Public");
        let hcl = render_node_terraform(&node);
        assert!(hcl.contains(r#"availability_zone = "${var.region}a""#));
    }

    #[test]
    fn rds_picks_engine_version() {
        let mut node = UNode::new("db-1", NodeType::Rds, "DB");
        node.props.insert("engine".into(), json!("mysql"));
        node.props.insert("allocated_storage".into(), json!(50));
        let hcl = render_node_terraform(&node);
        assert!(hcl.contains(r#"engine_version = "8.0""#));
        assert!(hcl.contains("allocated_storage = 50"));
        assert!(hcl.contains(r#"password = "${var.db_password}""#));
    }

    #[test]
    fn ecs_desired_count_falls_back_to_multiplier() {
        let mut node = UNode::new("component-3", NodeType::EcsService, "App");
        node.props.insert("multiplier".into(), json!(4));
        assert!(render_node_terraform(&node).contains("desired_count   = 4"));
    }

    #[test]
    fn unknown_types_render_as_comments() {
        let node = UNode::new("q", NodeType::Queue, "Jobs");
        let hcl = render_node_terraform(&node);
        assert!(hcl.lines().all(|l| l.starts_with('#')));
        assert!(hcl.contains(r#"queue "q""#));
    }

    #[test]
    fn labels_and_props_are_escaped_in_strings() {
        let mut node = UNode::new("vpc-1", NodeType::Vpc, r#"Prod "edge" ${var.x} C:\net"#);
        node.props.insert("cidr".into(), json!("10.0.0.0/16\" # %{if}"));
        let hcl = render_node_terraform(&node);
        assert!(hcl.contains(r#"Name = "Prod \"edge\" $${var.x} C:\\net""#));
        assert!(hcl.contains(r#"cidr_block           = "10.0.0.0/16\" # %%{if}""#));
    }

    #[test]
    fn lone_dollar_and_percent_pass_through() {
        assert_eq!(hcl_string("$5 for 10%"), "$5 for 10%");
        assert_eq!(hcl_string("a\nb"), "a\\nb");
    }

    #[test]
    fn multiline_label_stays_inside_comment() {
        let node = UNode::new("q", NodeType::Queue, "Jobs\nresource \"x\" \"y\" {}");
        let hcl = render_node_terraform(&node);
        assert!(hcl.lines().all(|l| l.starts_with('#')));
    }

    #[test]
    fn full_render_wraps_nodes() {
        let mut graph = Graph::default();
        graph.nodes.push(UNode::new("vpc-1", NodeType::Vpc, "VPC"));
        let hcl = render_terraform(&graph);
        assert!(hcl.starts_with("# Variables"));
        assert!(hcl.contains(r#"resource "aws_vpc""#));
        assert!(hcl.trim_end().ends_with('}'));
        assert!(hcl.contains("output \"load_balancer_dns\""));
    }
}
