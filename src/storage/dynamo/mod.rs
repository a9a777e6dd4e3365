//! DynamoDB table backend.
//!
//! Table schema:
//! - `pk`: partition key (String, HASH)
//! - `sk`: sort key, the event id (String, RANGE)
//! - `event`: the event envelope (Map)
//!
//! Writes go through `TransactWriteItems`, so the rows of one event become
//! visible together. Reads are `Query` calls scanning forward.

mod attribute;

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, AttributeValue, BillingMode, KeySchemaElement, KeyType, Put,
    ScalarAttributeType, TransactWriteItem,
};
use aws_sdk_dynamodb::Client;
use tracing::{debug, info};

use self::attribute::{item_to_key, item_to_row, key_to_item, row_to_item, PK, SK};
use super::{validate_transaction, EventTable, Page, PageRequest, Result, StorageError, StoredRow};
use crate::config::DynamoConfig;

/// DynamoDB implementation of [`EventTable`].
#[derive(Debug, Clone)]
pub struct DynamoTable {
    client: Client,
}

impl DynamoTable {
    /// Wrap an existing client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the AWS provider chain plus any overrides.
    pub async fn connect(config: &DynamoConfig) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        let sdk_config = loader.load().await;

        let client = if let Some(endpoint) = &config.endpoint_url {
            let dynamo_config = aws_sdk_dynamodb::config::Builder::from(&sdk_config)
                .endpoint_url(endpoint)
                .build();
            Client::from_conf(dynamo_config)
        } else {
            Client::new(&sdk_config)
        };

        info!(endpoint = ?config.endpoint_url, region = ?config.region, "Connected to DynamoDB");
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Create `table` with the `pk`/`sk` key schema. An existing table is left alone.
    pub async fn create_table(&self, table: &str) -> Result<()> {
        let attribute = |name: &str| {
            AttributeDefinition::builder()
                .attribute_name(name)
                .attribute_type(ScalarAttributeType::S)
                .build()
                .map_err(|e| StorageError::InvalidRequest(format!("invalid attribute definition: {}", e)))
        };
        let key = |name: &str, key_type: KeyType| {
            KeySchemaElement::builder()
                .attribute_name(name)
                .key_type(key_type)
                .build()
                .map_err(|e| StorageError::InvalidRequest(format!("invalid key schema: {}", e)))
        };

        let result = self
            .client
            .create_table()
            .table_name(table)
            .attribute_definitions(attribute(PK)?)
            .attribute_definitions(attribute(SK)?)
            .key_schema(key(PK, KeyType::Hash)?)
            .key_schema(key(SK, KeyType::Range)?)
            .billing_mode(BillingMode::PayPerRequest)
            .send()
            .await;

        match result {
            Ok(_) => {
                info!(table = %table, "Created DynamoDB table");
                Ok(())
            }
            Err(e)
                if e.as_service_error()
                    .is_some_and(|err| err.is_resource_in_use_exception()) =>
            {
                debug!(table = %table, "DynamoDB table already exists");
                Ok(())
            }
            Err(e) => Err(StorageError::InvalidRequest(format!(
                "DynamoDB create_table failed: {}",
                e
            ))),
        }
    }
}

#[async_trait]
impl EventTable for DynamoTable {
    async fn transact_put(&self, table: &str, rows: &[StoredRow]) -> Result<()> {
        validate_transaction(rows)?;

        let items = rows
            .iter()
            .map(|row| {
                Put::builder()
                    .table_name(table)
                    .set_item(Some(row_to_item(row)))
                    .build()
                    .map(|put| TransactWriteItem::builder().put(put).build())
                    .map_err(|e| StorageError::InvalidItem(format!("invalid put: {}", e)))
            })
            .collect::<Result<Vec<_>>>()?;

        self.client
            .transact_write_items()
            .set_transact_items(Some(items))
            .send()
            .await
            .map_err(|e| {
                StorageError::Transaction(format!("DynamoDB transact_write_items failed: {}", e))
            })?;

        debug!(table = %table, rows = rows.len(), "Stored rows in DynamoDB");
        Ok(())
    }

    async fn query_page(&self, table: &str, request: PageRequest<'_>) -> Result<Page> {
        if request.limit == 0 {
            return Err(StorageError::Query("limit must be at least 1".to_string()));
        }

        let mut values = HashMap::from([(
            ":pk".to_string(),
            AttributeValue::S(request.partition_key.to_string()),
        )]);
        let condition = match request.after {
            Some(after) => {
                values.insert(":after".to_string(), AttributeValue::S(after.to_string()));
                "pk = :pk AND sk > :after"
            }
            None => "pk = :pk",
        };

        let output = self
            .client
            .query()
            .table_name(table)
            .key_condition_expression(condition)
            .set_expression_attribute_values(Some(values))
            .scan_index_forward(true)
            .limit(i32::try_from(request.limit).unwrap_or(i32::MAX))
            .set_exclusive_start_key(request.start_key.as_ref().map(key_to_item))
            .send()
            .await
            .map_err(|e| StorageError::Query(format!("DynamoDB query failed: {}", e)))?;

        let rows = output
            .items
            .unwrap_or_default()
            .iter()
            .map(item_to_row)
            .collect::<Result<Vec<_>>>()?;
        let continuation = output
            .last_evaluated_key
            .as_ref()
            .map(item_to_key)
            .transpose()?;

        debug!(
            table = %table,
            pk = %request.partition_key,
            rows = rows.len(),
            more = continuation.is_some(),
            "Queried DynamoDB page"
        );

        Ok(Page { rows, continuation })
    }
}
