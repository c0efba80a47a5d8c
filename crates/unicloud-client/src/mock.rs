//! Offline stand-in for the design service.
//!
//! Replies are canned architectures chosen by keywords in the request, so
//! the whole design and export flow can run without a backend.

use std::collections::BTreeMap;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};

use unicloud_core::{ChatRequest, ChatResponse, TerraformRequest};

use crate::api::{DesignBackend, TerraformArchive, ZIP_CONTENT_TYPE};
use crate::error::ClientError;

static COST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"cost=([0-9]+)/mo").expect("cost pattern is valid"));
static PROVIDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^:]+):").expect("provider pattern is valid"));

pub struct Scenario {
    pub key: &'static str,
    pub title: &'static str,
    pub components: &'static [&'static str],
    pub connections: &'static [&'static str],
    pub notes: &'static str,
}

impl Scenario {
    fn response(&self) -> ChatResponse {
        ChatResponse {
            components: self.components.iter().map(|s| s.to_string()).collect(),
            connections: self.connections.iter().map(|s| s.to_string()).collect(),
            notes: self.notes.to_string(),
        }
    }
}

pub const SCENARIOS: [Scenario; 5] = [
    Scenario {
        key: "default",
        title: "Default Web Application",
        components: &[
            "aws:vpc | region=us-west-2; cost=0/mo; scale=high",
            "aws:subnet | region=us-west-2; cost=0/mo; scale=high",
            "aws:alb | region=us-west-2; cost=25/mo; scale=med",
            "aws:ecs_service x2 | region=us-west-2; cost=120/mo; scale=high",
            "aws:rds | region=us-west-2; cost=80/mo; scale=med",
        ],
        connections: &["0->1", "1->2", "2->3", "3->4"],
        notes: "Basic scalable web application with load balancer and database",
    },
    Scenario {
        key: "low cost",
        title: "Low Cost Architecture",
        components: &[
            "aws:s3 | region=us-west-2; cost=2/mo; scale=low",
            "cloudfront:cdn | region=global; cost=15/mo; scale=high",
            "aws:lambda | region=us-west-2; cost=5/mo; scale=med",
            "supabase:postgres | region=us-west-2; cost=25/mo; scale=med",
        ],
        connections: &["1->0", "1->2", "2->3"],
        notes: "Cost-optimized serverless architecture with CDN and managed database",
    },
    Scenario {
        key: "scalable",
        title: "High Scalability Setup",
        components: &[
            "cloudflare:cdn | region=global; cost=20/mo; scale=high",
            "aws:alb | region=us-west-2; cost=25/mo; scale=med",
            "aws:ecs_service x3 | region=us-west-2; cost=180/mo; scale=high",
            "aws:elasticache | region=us-west-2; cost=45/mo; scale=high",
            "aws:rds x2 | region=us-west-2; cost=160/mo; scale=high",
            "aws:s3 | region=us-west-2; cost=5/mo; scale=low",
        ],
        connections: &["0->1", "1->2", "2->3", "2->4", "2->5"],
        notes: "Highly scalable architecture with CDN, load balancer, multiple app instances, caching, and replicated database",
    },
    Scenario {
        key: "monitoring",
        title: "Security & Monitoring Focused",
        components: &[
            "aws:vpc | region=us-west-2; cost=0/mo; scale=high",
            "aws:alb | region=us-west-2; cost=25/mo; scale=med",
            "aws:ecs_service | region=us-west-2; cost=60/mo; scale=med",
            "aws:rds | region=us-west-2; cost=80/mo; scale=med",
            "aws:monitoring | region=us-west-2; cost=30/mo; scale=med",
            "aws:secret | region=us-west-2; cost=1/mo; scale=low",
        ],
        connections: &["0->1", "1->2", "2->3", "4->2", "4->3", "5->2"],
        notes: "Security-focused setup with monitoring, secrets management, and proper VPC isolation",
    },
    Scenario {
        key: "microservices",
        title: "Microservices Architecture",
        components: &[
            "aws:eks | region=us-west-2; cost=150/mo; scale=high",
            "aws:alb | region=us-west-2; cost=25/mo; scale=med",
            "aws:rds | region=us-west-2; cost=80/mo; scale=med",
            "aws:elasticache | region=us-west-2; cost=45/mo; scale=high",
            "aws:s3 | region=us-west-2; cost=10/mo; scale=med",
            "aws:monitoring | region=us-west-2; cost=50/mo; scale=med",
        ],
        connections: &["1->0", "0->2", "0->3", "0->4", "5->0"],
        notes: "Kubernetes-based microservices architecture with managed services",
    },
];

fn scenario(key: &str) -> &'static Scenario {
    SCENARIOS
        .iter()
        .find(|s| s.key == key)
        .unwrap_or(&SCENARIOS[0])
}

/// Pick a canned reply from keywords in the message, then the context.
pub fn select_scenario(request: &ChatRequest) -> &'static Scenario {
    let message = request.message.to_lowercase();
    let context = request.context.to_lowercase();
    let mentions = |words: &[&str]| words.iter().any(|w| message.contains(w));

    let key = if mentions(&["cost", "cheap", "budget"]) {
        "low cost"
    } else if mentions(&["scale", "scalable", "performance"]) {
        "scalable"
    } else if mentions(&["monitor", "security", "observability"]) {
        "monitoring"
    } else if mentions(&["microservice", "kubernetes", "k8s"]) {
        "microservices"
    } else if context.contains("api service") || context.contains("microservice") {
        "microservices"
    } else {
        "default"
    };
    scenario(key)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioInfo {
    pub key: &'static str,
    pub description: &'static str,
    pub component_count: usize,
}

pub fn mock_scenarios() -> Vec<ScenarioInfo> {
    SCENARIOS
        .iter()
        .map(|s| ScenarioInfo {
            key: s.key,
            description: s.notes,
            component_count: s.components.len(),
        })
        .collect()
}

/// Sum of every `cost=<n>/mo` annotation, in dollars per month.
pub fn estimate_monthly_cost<S: AsRef<str>>(components: &[S]) -> u64 {
    components
        .iter()
        .filter_map(|c| COST_RE.captures(c.as_ref()))
        .filter_map(|caps| caps.get(1)?.as_str().parse::<u64>().ok())
        .sum()
}

/// Number of components per provider prefix.
pub fn provider_stats<S: AsRef<str>>(components: &[S]) -> BTreeMap<String, usize> {
    let mut stats = BTreeMap::new();
    for component in components {
        if let Some(caps) = PROVIDER_RE.captures(component.as_ref()) {
            *stats.entry(caps[1].to_string()).or_insert(0) += 1;
        }
    }
    stats
}

fn render_bundle(request: &TerraformRequest) -> String {
    let mut resources = String::new();
    for (index, component) in request.components.iter().enumerate() {
        resources.push_str(&format!(
            "\n# Component {index}: {component}\nresource \"aws_instance\" \"component_{index}\" {{\n  # This would be generated based on the component type\n  # {component}\n}}\n"
        ));
    }

    let component_list: Vec<String> = request
        .components
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{}. {}", i + 1, c))
        .collect();
    let connection_list: Vec<String> = request
        .connections
        .iter()
        .map(|c| format!("- {}", c))
        .collect();

    let n_components = request.components.len();
    let n_connections = request.connections.len();
    let notes = &request.notes;

    format!(
        r#"=== TERRAFORM EXPORT ===
Generated by UnifiedCloud (Mock Mode)
Date: {date}

=== main.tf ===
# Generated Terraform Configuration
# Components: {n_components}
# Connections: {n_connections}
# Notes: {notes}

terraform {{
  required_version = ">= 1.0"
  required_providers {{
    aws = {{
      source  = "hashicorp/aws"
      version = "~> 5.0"
    }}
  }}
}}

provider "aws" {{
  region = var.region
}}
{resources}
output "deployment_info" {{
  description = "Deployment information"
  value = {{
    components  = {n_components}
    connections = {n_connections}
    notes       = "{notes}"
  }}
}}

=== variables.tf ===
variable "region" {{
  description = "AWS region"
  type        = string
  default     = "us-west-2"
}}

variable "environment" {{
  description = "Environment name"
  type        = string
  default     = "production"
}}

=== outputs.tf ===
output "infrastructure_summary" {{
  value = "Generated {n_components} components with {n_connections} connections"
}}

=== README.md ===
# Infrastructure Export

This terraform configuration was generated by UnifiedCloud.

## Components
{components}

## Connections
{connections}

## Notes
{notes}

## Usage
```bash
terraform init
terraform plan
terraform apply
```
"#,
        date = Utc::now().to_rfc3339(),
        components = component_list.join("\n"),
        connections = connection_list.join("\n"),
    )
}

/// Artificial delay and failure injection for one endpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MockTiming {
    pub base: Duration,
    pub jitter: Duration,
    pub failure_rate: f64,
}

impl MockTiming {
    pub const INSTANT: MockTiming = MockTiming {
        base: Duration::ZERO,
        jitter: Duration::ZERO,
        failure_rate: 0.0,
    };

    /// Decide the delay and whether this call fails. The RNG is dropped
    /// before the caller awaits anything.
    fn roll(&self) -> (Duration, bool) {
        let mut rng = rand::thread_rng();
        let jitter_ms = self.jitter.as_millis() as u64;
        let extra = if jitter_ms > 0 {
            Duration::from_millis(rng.gen_range(0..=jitter_ms))
        } else {
            Duration::ZERO
        };
        let fails = rng.gen_bool(self.failure_rate.clamp(0.0, 1.0));
        (self.base + extra, fails)
    }

    async fn simulate(&self, failure: &str) -> Result<(), ClientError> {
        let (delay, fails) = self.roll();
        if !delay.is_zero() {
            debug!(?delay, "simulating network delay");
            tokio::time::sleep(delay).await;
        }
        if fails {
            warn!(failure, "simulated mock failure");
            return Err(ClientError::Mock(failure.to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct MockBackend {
    chat: MockTiming,
    terraform: MockTiming,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Instant, never-failing replies.
    pub fn new() -> Self {
        Self {
            chat: MockTiming::INSTANT,
            terraform: MockTiming::INSTANT,
        }
    }

    /// Realistic delays with an occasional failure, for demos.
    pub fn simulated() -> Self {
        Self {
            chat: MockTiming {
                base: Duration::from_millis(800),
                jitter: Duration::from_millis(1200),
                failure_rate: 0.05,
            },
            terraform: MockTiming {
                base: Duration::from_millis(1500),
                jitter: Duration::from_millis(2000),
                failure_rate: 0.03,
            },
        }
    }

    pub fn with_chat_timing(mut self, timing: MockTiming) -> Self {
        self.chat = timing;
        self
    }

    pub fn with_terraform_timing(mut self, timing: MockTiming) -> Self {
        self.terraform = timing;
        self
    }
}

#[async_trait]
impl DesignBackend for MockBackend {
    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError> {
        self.chat
            .simulate("Mock API error: Service temporarily unavailable")
            .await?;

        let scenario = select_scenario(request);
        let response = scenario.response();
        info!(
            scenario = scenario.title,
            components = response.components.len(),
            connections = response.connections.len(),
            estimated_monthly_cost = estimate_monthly_cost(&response.components),
            providers = ?provider_stats(&response.components),
            "mock chat reply"
        );
        Ok(response)
    }

    async fn generate_terraform(
        &self,
        request: &TerraformRequest,
    ) -> Result<TerraformArchive, ClientError> {
        info!(
            components = request.components.len(),
            connections = request.connections.len(),
            estimated_monthly_cost = estimate_monthly_cost(&request.components),
            providers = ?provider_stats(&request.components),
            "mock terraform export"
        );
        self.terraform
            .simulate("Mock terraform generation failed: Invalid configuration")
            .await?;

        let bundle = render_bundle(request);
        debug!(kb = bundle.len() / 1024, "mock bundle generated");
        Ok(TerraformArchive {
            content_type: ZIP_CONTENT_TYPE.to_string(),
            bytes: bundle.into_bytes(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use unicloud_core::chat_response_to_graph;

    fn request(message: &str, context: &str) -> ChatRequest {
        ChatRequest {
            context: context.into(),
            history: vec![],
            message: message.into(),
        }
    }

    #[test]
    fn keywords_select_scenarios() {
        assert_eq!(select_scenario(&request("keep it cheap", "")).key, "low cost");
        assert_eq!(select_scenario(&request("Needs to SCALE", "")).key, "scalable");
        assert_eq!(select_scenario(&request("add observability", "")).key, "monitoring");
        assert_eq!(select_scenario(&request("use k8s", "")).key, "microservices");
        assert_eq!(select_scenario(&request("hello", "")).key, "default");
    }

    #[test]
    fn message_keywords_win_over_context() {
        let ctx = "Product type: API Service";
        assert_eq!(select_scenario(&request("hello", ctx)).key, "microservices");
        assert_eq!(select_scenario(&request("lower my budget", ctx)).key, "low cost");
    }

    #[test]
    fn every_scenario_decodes_without_dropped_edges() {
        for s in &SCENARIOS {
            let graph = chat_response_to_graph(&s.response()).unwrap();
            assert_eq!(graph.nodes.len(), s.components.len(), "{}", s.key);
            assert_eq!(graph.edges.len(), s.connections.len(), "{}", s.key);
        }
    }

    #[test]
    fn cost_and_provider_summaries() {
        let comps = ["cloudflare:cdn | cost=20/mo", "aws:alb | cost=25/mo", "aws:s3", "x"];
        assert_eq!(estimate_monthly_cost(&comps), 45);
        let stats = provider_stats(&comps);
        assert_eq!(stats.get("aws"), Some(&2));
        assert_eq!(stats.get("cloudflare"), Some(&1));
        assert_eq!(stats.len(), 2);
    }

    #[test]
    fn scenario_listing_matches_table() {
        let infos = mock_scenarios();
        assert_eq!(infos.len(), SCENARIOS.len());
        assert_eq!(infos[2].key, "scalable");
        assert_eq!(infos[2].component_count, 6);
    }

    #[tokio::test]
    async fn instant_mock_answers_chat() {
        let backend = MockBackend::new();
        let response = backend.send_chat(&request("microservices please", "")).await.unwrap();
        assert_eq!(response.components[0], "aws:eks | region=us-west-2; cost=150/mo; scale=high");
    }

    #[tokio::test]
    async fn certain_failure_is_reported() {
        let backend = MockBackend::new().with_chat_timing(MockTiming {
            failure_rate: 1.0,
            ..MockTiming::INSTANT
        });
        let err = backend.send_chat(&request("hi", "")).await.unwrap_err();
        assert!(matches!(err, ClientError::Mock(_)));
    }

    #[tokio::test]
    async fn terraform_failure_is_reported() {
        let backend = MockBackend::new().with_terraform_timing(MockTiming {
            failure_rate: 1.0,
            ..MockTiming::INSTANT
        });
        let err = backend
            .generate_terraform(&TerraformRequest::default())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Mock terraform generation failed: Invalid configuration"
        );
        assert!(backend.send_chat(&request("hi", "")).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn simulated_delay_elapses_on_tokio_clock() {
        let backend = MockBackend::new().with_terraform_timing(MockTiming {
            base: Duration::from_millis(1500),
            ..MockTiming::INSTANT
        });
        let started = tokio::time::Instant::now();
        backend
            .generate_terraform(&TerraformRequest::default())
            .await
            .unwrap();
        assert!(started.elapsed() >= Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn terraform_bundle_lists_components() {
        let backend = MockBackend::new();
        let archive = backend
            .generate_terraform(&TerraformRequest {
                components: vec!["aws:vpc".into(), "aws:alb | cost=25/mo".into()],
                connections: vec!["0->1".into()],
                notes: "tiny".into(),
            })
            .await
            .unwrap();
        assert_eq!(archive.content_type, ZIP_CONTENT_TYPE);
        let text = String::from_utf8(archive.bytes).unwrap();
        assert!(text.contains("resource \"aws_instance\" \"component_1\""));
        assert!(text.contains("2. aws:alb | cost=25/mo"));
        assert!(text.contains("- 0->1"));
        assert!(text.contains("Generated 2 components with 1 connections"));
    }
}
