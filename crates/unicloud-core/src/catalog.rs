//! Static lookups from descriptor vocabulary to canvas vocabulary.

use crate::graph::{Cloud, NodeType};

/// Map a service name to a node type. Unknown services become `Custom`.
pub fn service_to_node_type(service: &str) -> NodeType {
    match service {
        "cdn" | "cloudfront" => NodeType::Cloudfront,
        "alb" => NodeType::Alb,
        "ecs_service" => NodeType::EcsService,
        "postgres" | "rds" => NodeType::Rds,
        "redis" | "elasticache" => NodeType::Elasticache,
        "static" | "s3" => NodeType::S3,
        "lambda" => NodeType::Lambda,
        "vpc" => NodeType::Vpc,
        "subnet" => NodeType::Subnet,
        "eks" => NodeType::Eks,
        "iam_role" => NodeType::IamRole,
        "monitoring" => NodeType::Monitoring,
        "secret" => NodeType::Secret,
        "queue" => NodeType::Queue,
        "topic" => NodeType::Topic,
        "gke" => NodeType::Gke,
        "cloudrun" => NodeType::Cloudrun,
        "sql" => NodeType::Sql,
        "vm" => NodeType::Vm,
        _ => NodeType::Custom,
    }
}

/// Map a provider name to the cloud it is drawn under.
///
/// Third-party platforms are grouped under AWS for display only; this says
/// nothing about where they actually run. Unknown providers get no cloud.
pub fn provider_to_cloud(provider: &str) -> Option<Cloud> {
    match provider.to_lowercase().as_str() {
        "aws" => Some(Cloud::Aws),
        "gcp" | "google" => Some(Cloud::Gcp),
        "azure" | "microsoft" => Some(Cloud::Azure),
        "cloudflare" | "supabase" | "vercel" | "netlify" | "digitalocean" => Some(Cloud::Aws),
        _ => None,
    }
}
