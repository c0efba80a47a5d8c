use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const PRIORITY_MIN: u8 = 1;
pub const PRIORITY_MAX: u8 = 10;
const PRIORITY_DEFAULT: u8 = 5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ProductType {
    #[default]
    Webapp,
    Api,
    DataPipeline,
    Realtime,
    Batch,
}

impl ProductType {
    pub const ALL: [ProductType; 5] = [
        ProductType::Webapp,
        ProductType::Api,
        ProductType::DataPipeline,
        ProductType::Realtime,
        ProductType::Batch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::Webapp => "webapp",
            ProductType::Api => "api",
            ProductType::DataPipeline => "data-pipeline",
            ProductType::Realtime => "realtime",
            ProductType::Batch => "batch",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ProductType::Webapp => "Web Application",
            ProductType::Api => "API Service",
            ProductType::DataPipeline => "Data Pipeline",
            ProductType::Realtime => "Real-time App",
            ProductType::Batch => "Batch Processing",
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProductType::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown product type: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TechStackField {
    Frontend,
    Backend,
    Database,
    Authentication,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TechStack {
    #[serde(default)]
    pub frontend: String,
    #[serde(default)]
    pub backend: String,
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub authentication: String,
    #[serde(default)]
    pub other: String,
}

impl TechStack {
    pub fn field_mut(&mut self, field: TechStackField) -> &mut String {
        match field {
            TechStackField::Frontend => &mut self.frontend,
            TechStackField::Backend => &mut self.backend,
            TechStackField::Database => &mut self.database,
            TechStackField::Authentication => &mut self.authentication,
            TechStackField::Other => &mut self.other,
        }
    }

    fn entries(&self) -> [(&'static str, &str); 5] {
        [
            ("frontend", &self.frontend),
            ("backend", &self.backend),
            ("database", &self.database),
            ("authentication", &self.authentication),
            ("other", &self.other),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityKey {
    Security,
    Scalability,
    Cost,
    Latency,
    DeveloperExperience,
    Availability,
}

impl FromStr for PriorityKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "security" => Ok(PriorityKey::Security),
            "scalability" => Ok(PriorityKey::Scalability),
            "cost" => Ok(PriorityKey::Cost),
            "latency" => Ok(PriorityKey::Latency),
            "developer_experience" => Ok(PriorityKey::DeveloperExperience),
            "availability" => Ok(PriorityKey::Availability),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

/// Weights from 1 (don't care) to 10 (critical).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Priorities {
    pub security: u8,
    pub scalability: u8,
    pub cost: u8,
    pub latency: u8,
    pub developer_experience: u8,
    pub availability: u8,
}

impl Default for Priorities {
    fn default() -> Self {
        Self {
            security: PRIORITY_DEFAULT,
            scalability: PRIORITY_DEFAULT,
            cost: PRIORITY_DEFAULT,
            latency: PRIORITY_DEFAULT,
            developer_experience: PRIORITY_DEFAULT,
            availability: PRIORITY_DEFAULT,
        }
    }
}

impl Priorities {
    pub fn get_mut(&mut self, key: PriorityKey) -> &mut u8 {
        match key {
            PriorityKey::Security => &mut self.security,
            PriorityKey::Scalability => &mut self.scalability,
            PriorityKey::Cost => &mut self.cost,
            PriorityKey::Latency => &mut self.latency,
            PriorityKey::DeveloperExperience => &mut self.developer_experience,
            PriorityKey::Availability => &mut self.availability,
        }
    }

    fn entries(&self) -> [(&'static str, u8); 6] {
        [
            ("security", self.security),
            ("scalability", self.scalability),
            ("cost", self.cost),
            ("latency", self.latency),
            ("developer_experience", self.developer_experience),
            ("availability", self.availability),
        ]
    }
}

/// Answers collected by the intake wizard.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Intake {
    pub product_type: ProductType,
    pub tech_stack: TechStack,
    pub priorities: Priorities,
}

impl Intake {
    /// Render the answers as the free-text context sent with every chat turn.
    pub fn to_context(&self) -> String {
        let mut out = String::with_capacity(256);
        out.push_str("Product type: ");
        out.push_str(self.product_type.title());
        out.push('\n');

        let stack: Vec<String> = self
            .tech_stack
            .entries()
            .iter()
            .filter(|(_, v)| !v.trim().is_empty())
            .map(|(k, v)| format!("{}={}", k, v.trim()))
            .collect();
        out.push_str("Tech stack: ");
        if stack.is_empty() {
            out.push_str("(unspecified)");
        } else {
            out.push_str(&stack.join("; "));
        }
        out.push('\n');

        let priorities: Vec<String> = self
            .priorities
            .entries()
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        out.push_str(&format!(
            "Priorities ({}-{}): {}",
            PRIORITY_MIN,
            PRIORITY_MAX,
            priorities.join(", ")
        ));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_type_round_trips_through_str() {
        for p in ProductType::ALL {
            assert_eq!(p.as_str().parse::<ProductType>().unwrap(), p);
        }
        assert!("desktop".parse::<ProductType>().is_err());
        assert_eq!(
            serde_json::to_value(ProductType::DataPipeline).unwrap(),
            serde_json::json!("data-pipeline")
        );
    }

    #[test]
    fn context_lists_filled_fields_and_priorities() {
        let mut intake = Intake::default();
        intake.product_type = ProductType::Api;
        intake.tech_stack.backend = "Rust".into();
        intake.tech_stack.database = " PostgreSQL ".into();
        let ctx = intake.to_context();
        assert!(ctx.contains("Product type: API Service"));
        assert!(ctx.contains("Tech stack: backend=Rust; database=PostgreSQL"));
        assert!(!ctx.contains("frontend="));
        assert!(ctx.contains("security=5"));
        assert!(ctx.contains("developer_experience=5"));
    }

    #[test]
    fn empty_stack_is_marked_unspecified() {
        assert!(Intake::default().to_context().contains("Tech stack: (unspecified)"));
    }
}
