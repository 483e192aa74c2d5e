//! DynamoDB implementation of the attendee store.
//!
//! Single table, partition key `user_id`, sort key `collection_id`.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use facefind_models::AttendeeRecord;

use crate::error::{StoreError, StoreResult};
use crate::repo::{apply_update, AttendeeStore, MatchUpdate};

/// Configuration for the record store.
#[derive(Debug, Clone)]
pub struct RecordsConfig {
    /// Table holding attendee records.
    pub table_name: String,
}

impl RecordsConfig {
    /// Create config from environment variables.
    pub fn from_env() -> StoreResult<Self> {
        Ok(Self {
            table_name: std::env::var("FACEFIND_RECORDS_TABLE")
                .map_err(|_| StoreError::config_error("FACEFIND_RECORDS_TABLE not set"))?,
        })
    }
}

/// DynamoDB-backed [`AttendeeStore`].
#[derive(Clone)]
pub struct DynamoAttendeeStore {
    client: Client,
    table: String,
}

impl DynamoAttendeeStore {
    /// Create a new store over an already-loaded AWS config.
    pub fn new(sdk_config: &aws_config::SdkConfig, config: RecordsConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
            table: config.table_name,
        }
    }

    /// Create from environment variables.
    pub async fn from_env() -> StoreResult<Self> {
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .load()
            .await;
        Ok(Self::new(&sdk_config, RecordsConfig::from_env()?))
    }
}

#[async_trait]
impl AttendeeStore for DynamoAttendeeStore {
    async fn replace_matches(&self, update: MatchUpdate) -> StoreResult<AttendeeRecord> {
        let existing = self.get(&update.user_id, &update.collection_id).await?;
        let record = apply_update(existing, update);

        self.client
            .put_item()
            .table_name(&self.table)
            .set_item(Some(record_to_item(&record)))
            .send()
            .await
            .map_err(|e| StoreError::request_failed(e.to_string()))?;

        info!(
            user_id = %record.user_id,
            collection_id = %record.collection_id,
            images = record.matched_images.len(),
            videos = record.matched_videos.len(),
            "Replaced attendee matches"
        );
        Ok(record)
    }

    async fn get(
        &self,
        user_id: &str,
        collection_id: &str,
    ) -> StoreResult<Option<AttendeeRecord>> {
        let response = self
            .client
            .get_item()
            .table_name(&self.table)
            .key("user_id", AttributeValue::S(user_id.to_string()))
            .key("collection_id", AttributeValue::S(collection_id.to_string()))
            .send()
            .await
            .map_err(|e| StoreError::request_failed(e.to_string()))?;

        match response.item() {
            Some(item) => Ok(Some(item_to_record(item)?)),
            None => Ok(None),
        }
    }

    async fn list_for_user(&self, user_id: &str) -> StoreResult<Vec<AttendeeRecord>> {
        let mut records = Vec::new();
        let mut start_key: Option<HashMap<String, AttributeValue>> = None;

        loop {
            let mut request = self
                .client
                .query()
                .table_name(&self.table)
                .key_condition_expression("user_id = :uid")
                .expression_attribute_values(":uid", AttributeValue::S(user_id.to_string()));

            if let Some(key) = start_key.take() {
                request = request.set_exclusive_start_key(Some(key));
            }

            let response = request
                .send()
                .await
                .map_err(|e| StoreError::request_failed(e.to_string()))?;

            for item in response.items() {
                records.push(item_to_record(item)?);
            }

            match response.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        debug!("Listed {} attendee record(s) for {}", records.len(), user_id);
        Ok(records)
    }

    async fn mark_uploaded(&self, user_id: &str, collection_id: &str) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();

        self.client
            .update_item()
            .table_name(&self.table)
            .key("user_id", AttributeValue::S(user_id.to_string()))
            .key("collection_id", AttributeValue::S(collection_id.to_string()))
            .update_expression(
                "SET has_uploads = :t, updated_at = :now, \
                 created_at = if_not_exists(created_at, :now), \
                 selfie_key = if_not_exists(selfie_key, :empty), \
                 display_name = if_not_exists(display_name, :empty), \
                 matched_images = if_not_exists(matched_images, :empty_list), \
                 matched_videos = if_not_exists(matched_videos, :empty_list)",
            )
            .expression_attribute_values(":t", AttributeValue::Bool(true))
            .expression_attribute_values(":now", AttributeValue::S(now))
            .expression_attribute_values(":empty", AttributeValue::S(String::new()))
            .expression_attribute_values(":empty_list", AttributeValue::L(Vec::new()))
            .send()
            .await
            .map_err(|e| StoreError::request_failed(e.to_string()))?;

        debug!(
            "Marked uploads for user {} in collection {}",
            user_id, collection_id
        );
        Ok(())
    }
}

// Item conversion helpers

fn string_list(values: &[String]) -> AttributeValue {
    AttributeValue::L(
        values
            .iter()
            .map(|v| AttributeValue::S(v.clone()))
            .collect(),
    )
}

fn record_to_item(record: &AttendeeRecord) -> HashMap<String, AttributeValue> {
    let mut item = HashMap::new();
    item.insert(
        "user_id".to_string(),
        AttributeValue::S(record.user_id.clone()),
    );
    item.insert(
        "collection_id".to_string(),
        AttributeValue::S(record.collection_id.clone()),
    );
    item.insert(
        "selfie_key".to_string(),
        AttributeValue::S(record.selfie_key.clone()),
    );
    item.insert(
        "display_name".to_string(),
        AttributeValue::S(record.display_name.clone()),
    );
    if let Some(cover) = &record.cover_key {
        item.insert("cover_key".to_string(), AttributeValue::S(cover.clone()));
    }
    item.insert(
        "matched_images".to_string(),
        string_list(&record.matched_images),
    );
    item.insert(
        "matched_videos".to_string(),
        string_list(&record.matched_videos),
    );
    item.insert(
        "has_uploads".to_string(),
        AttributeValue::Bool(record.has_uploads),
    );
    item.insert(
        "created_at".to_string(),
        AttributeValue::S(record.created_at.to_rfc3339()),
    );
    item.insert(
        "updated_at".to_string(),
        AttributeValue::S(record.updated_at.to_rfc3339()),
    );
    item
}

fn item_to_record(item: &HashMap<String, AttributeValue>) -> StoreResult<AttendeeRecord> {
    let get_string = |key: &str| -> String {
        item.get(key)
            .and_then(|v| v.as_s().ok())
            .cloned()
            .unwrap_or_default()
    };

    let get_list = |key: &str| -> Vec<String> {
        item.get(key)
            .and_then(|v| v.as_l().ok())
            .map(|l| {
                l.iter()
                    .filter_map(|v| v.as_s().ok())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    };

    let get_time = |key: &str| -> StoreResult<chrono::DateTime<Utc>> {
        let raw = get_string(key);
        DateTime::parse_from_rfc3339(&raw)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|_| StoreError::invalid_item(format!("bad timestamp in {}: {:?}", key, raw)))
    };

    let user_id = get_string("user_id");
    if user_id.is_empty() {
        return Err(StoreError::invalid_item("missing user_id"));
    }

    Ok(AttendeeRecord {
        user_id,
        collection_id: get_string("collection_id"),
        selfie_key: get_string("selfie_key"),
        display_name: get_string("display_name"),
        cover_key: item.get("cover_key").and_then(|v| v.as_s().ok()).cloned(),
        matched_images: get_list("matched_images"),
        matched_videos: get_list("matched_videos"),
        has_uploads: item
            .get("has_uploads")
            .and_then(|v| v.as_bool().ok())
            .copied()
            .unwrap_or(false),
        created_at: get_time("created_at")?,
        updated_at: get_time("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_round_trip() {
        let mut record = AttendeeRecord::new("user-1", "wedding", "selfies/u1.jpg");
        record.display_name = "Wedding".to_string();
        record.matched_images = vec!["a.jpg".to_string(), "b.jpg".to_string()];
        record.matched_videos = vec!["v.mp4".to_string()];
        record.has_uploads = true;

        let item = record_to_item(&record);
        let back = item_to_record(&item).unwrap();

        assert_eq!(back.user_id, record.user_id);
        assert_eq!(back.matched_images, record.matched_images);
        assert_eq!(back.matched_videos, record.matched_videos);
        assert!(back.has_uploads);
        assert!(back.cover_key.is_none());
    }

    #[test]
    fn test_item_missing_user_id_rejected() {
        let item = HashMap::new();
        assert!(item_to_record(&item).is_err());
    }
}
