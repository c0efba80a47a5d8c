pub mod catalog;
pub mod codec;
pub mod error;
pub mod graph;
pub mod intake;
pub mod sample;
pub mod store;
pub mod terraform;
pub mod wire;

pub use catalog::{provider_to_cloud, service_to_node_type};
pub use codec::{
    calculate_position, chat_response_to_graph, chat_response_to_graph_at, generate_label,
    graph_to_chat_format, parse_component, parse_connections, ParsedComponent,
};
pub use error::{ComponentError, GraphError, SettingsError};
pub use graph::{Cloud, Graph, NodeType, Position, Props, UEdge, UNode};
pub use intake::{Intake, Priorities, PriorityKey, ProductType, TechStack, TechStackField};
pub use wire::{ApiError, ChatRequest, ChatResponse, TerraformRequest};

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
pub const ENV_API_BASE_URL: &str = "UNICLOUD_API_BASE_URL";
pub const ENV_ENABLE_MOCK_MODE: &str = "UNICLOUD_ENABLE_MOCK_MODE";

// --- Settings ---

/// Where to find the design service, and whether to skip it entirely.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default)]
    pub enable_mock_mode: bool,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            enable_mock_mode: false,
        }
    }
}

impl AppConfig {
    /// Settings file first, then environment overrides.
    pub fn load() -> Self {
        let mut config = read_settings();
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Apply overrides from a variable lookup. Mock mode is only enabled by
    /// the literal value `true`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_BASE_URL).filter(|u| !u.trim().is_empty()) {
            self.api_base_url = url.trim().to_string();
        }
        if let Some(flag) = lookup(ENV_ENABLE_MOCK_MODE) {
            self.enable_mock_mode = flag == "true";
        }
    }
}

/// Resolve the settings directory (~/.unicloud/).
pub fn settings_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".unicloud")
}

fn settings_path() -> PathBuf {
    settings_dir().join("settings.json")
}

/// Read saved settings. A missing or unreadable file yields defaults.
pub fn read_settings() -> AppConfig {
    let path = settings_path();
    if !path.exists() {
        return AppConfig::default();
    }
    fs::read_to_string(&path)
        .ok()
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

pub fn write_settings(settings: &AppConfig) -> Result<(), SettingsError> {
    fs::create_dir_all(settings_dir())?;
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(settings_path(), json)?;
    Ok(())
}
