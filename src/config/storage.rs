//! Storage configuration types.

use serde::Deserialize;

/// Default table name.
pub const DEFAULT_TABLE_NAME: &str = "events";

/// Storage type discriminator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    /// In-process table. Nothing survives the process.
    #[default]
    Memory,
    /// AWS DynamoDB (or DynamoDB Local via `endpoint_url`).
    Dynamo,
}

/// Storage configuration (discriminated union).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage type discriminator.
    #[serde(rename = "type")]
    pub storage_type: StorageType,
    /// Table holding every event row.
    pub table_name: String,
    /// DynamoDB-specific configuration.
    pub dynamo: DynamoConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_type: StorageType::Memory,
            table_name: DEFAULT_TABLE_NAME.to_string(),
            dynamo: DynamoConfig::default(),
        }
    }
}

/// DynamoDB-specific configuration.
///
/// Credentials come from the standard AWS provider chain.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DynamoConfig {
    /// Endpoint override, e.g. `http://localhost:8000` for DynamoDB Local.
    pub endpoint_url: Option<String>,
    /// Region override. Falls back to the provider chain.
    pub region: Option<String>,
}
