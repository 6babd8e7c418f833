//! Firestore REST 文档存储

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::config::FirestoreSettings;
use crate::infrastructure::auth::{AccessTokenSource, DATASTORE_SCOPE};
use crate::domain::model::{Document, FetchResult};
use crate::domain::repository::DocumentStore;
use crate::error::{ReminderError, Result};

pub struct FirestoreDocumentStore {
    client: Client,
    base_url: Url,
    project_id: String,
    tokens: AccessTokenSource,
}

impl FirestoreDocumentStore {
    pub fn new(settings: &FirestoreSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| ReminderError::Config(format!("failed to build http client: {e}")))?;
        let base_url = Url::parse(&settings.base_url).map_err(|e| {
            ReminderError::Config(format!("invalid firestore base url `{}`: {e}", settings.base_url))
        })?;

        let tokens = AccessTokenSource::from_credentials(
            &settings.credentials,
            DATASTORE_SCOPE,
            client.clone(),
        )?;

        Ok(Self {
            client,
            base_url,
            project_id: settings.project_id.clone(),
            tokens,
        })
    }

    /// `{base}/v1/projects/{p}/databases/(default)/documents/{collection}/{id}`
    fn document_url(&self, collection: &str, id: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ReminderError::lookup(collection, id, "firestore base url cannot be a base"))?
            .pop_if_empty()
            .extend([
                "v1",
                "projects",
                self.project_id.as_str(),
                "databases",
                "(default)",
                "documents",
                collection,
                id,
            ]);
        Ok(url)
    }
}

#[async_trait]
impl DocumentStore for FirestoreDocumentStore {
    #[instrument(skip(self))]
    async fn get(&self, collection: &str, id: &str) -> Result<FetchResult> {
        let url = self.document_url(collection, id)?;

        let bearer = self
            .tokens
            .bearer()
            .await
            .map_err(|e| ReminderError::lookup(collection, id, e.to_string()))?;

        let mut request = self.client.get(url);
        if let Some(bearer) = bearer {
            request = request.bearer_auth(bearer);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ReminderError::lookup(collection, id, e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!("Document not found");
            return Ok(FetchResult::NotFound);
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            self.tokens.invalidate().await;
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReminderError::lookup(
                collection,
                id,
                format!("firestore returned {status}: {}", truncate(&body, 256)),
            ));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ReminderError::lookup(collection, id, format!("invalid response body: {e}")))?;

        Ok(FetchResult::Found(decode_document(&body)))
    }
}

/// 解码 REST 文档中的 `fields`
pub fn decode_document(body: &Value) -> Document {
    body.get("fields")
        .and_then(Value::as_object)
        .map(decode_fields)
        .unwrap_or_default()
}

fn decode_fields(fields: &Map<String, Value>) -> Document {
    fields
        .iter()
        .map(|(name, value)| (name.clone(), decode_value(value)))
        .collect()
}

/// Firestore 类型化值 → JSON 值
pub fn decode_value(value: &Value) -> Value {
    let Some(typed) = value.as_object() else {
        return Value::Null;
    };
    let Some((kind, inner)) = typed.iter().next() else {
        return Value::Null;
    };

    match kind.as_str() {
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner.clone(),
        "integerValue" => match inner {
            // int64 以字符串编码
            Value::String(raw) => raw
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or_else(|_| inner.clone()),
            other => other.clone(),
        },
        "doubleValue" | "booleanValue" | "geoPointValue" => inner.clone(),
        "nullValue" => Value::Null,
        "arrayValue" => Value::Array(
            inner
                .get("values")
                .and_then(Value::as_array)
                .map(|values| values.iter().map(decode_value).collect())
                .unwrap_or_default(),
        ),
        "mapValue" => Value::Object(
            inner
                .get("fields")
                .and_then(Value::as_object)
                .map(decode_fields)
                .unwrap_or_default(),
        ),
        _ => Value::Null,
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GoogleCredentials;
    use crate::infrastructure::http_stub::{HttpStub, unreachable_base_url};
    use serde_json::json;
    use std::time::Duration;

    fn store(base_url: &str) -> FirestoreDocumentStore {
        FirestoreDocumentStore::new(&FirestoreSettings {
            project_id: "demo".into(),
            base_url: base_url.into(),
            credentials: GoogleCredentials::Anonymous,
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    /// U1 存在，U404 不存在，其余返回 500
    async fn firestore_stub() -> HttpStub {
        HttpStub::start(|request| {
            if request.path.ends_with("/documents/users/U1") {
                (
                    200,
                    json!({
                        "name": "projects/demo/databases/(default)/documents/users/U1",
                        "fields": {"name": {"stringValue": "Alice"}, "fcmToken": {"stringValue": "tok1"}}
                    })
                    .to_string(),
                )
            } else if request.path.ends_with("/documents/users/U404") {
                (404, json!({"error": {"code": 404, "status": "NOT_FOUND"}}).to_string())
            } else {
                (500, json!({"error": {"code": 500, "status": "INTERNAL"}}).to_string())
            }
        })
        .await
    }

    #[test]
    fn document_url_addresses_default_database() {
        let url = store("http://localhost:8080")
            .document_url("users", "U1")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/v1/projects/demo/databases/(default)/documents/users/U1"
        );
    }

    #[test]
    fn document_id_is_encoded_as_single_segment() {
        let url = store("https://firestore.googleapis.com")
            .document_url("users", "a/b c")
            .unwrap();
        assert!(url.as_str().ends_with("/documents/users/a%2Fb%20c"));
    }

    #[test]
    fn decode_reminder_and_user_documents() {
        let body = json!({
            "name": "projects/demo/databases/(default)/documents/users/U1",
            "fields": {
                "name": {"stringValue": "Alice"},
                "fcmToken": {"stringValue": "tok1"},
                "age": {"integerValue": "31"},
                "verified": {"booleanValue": true},
                "participants": {"arrayValue": {"values": [
                    {"stringValue": "U1"}, {"stringValue": "U2"}
                ]}},
                "settings": {"mapValue": {"fields": {"mute": {"booleanValue": false}}}},
                "deleted": {"nullValue": null},
                "tags": {"arrayValue": {}}
            }
        });

        let document = decode_document(&body);
        assert_eq!(document["name"], json!("Alice"));
        assert_eq!(document["fcmToken"], json!("tok1"));
        assert_eq!(document["age"], json!(31));
        assert_eq!(document["verified"], json!(true));
        assert_eq!(document["participants"], json!(["U1", "U2"]));
        assert_eq!(document["settings"], json!({"mute": false}));
        assert_eq!(document["deleted"], Value::Null);
        assert_eq!(document["tags"], json!([]));
    }

    #[test]
    fn document_without_fields_decodes_empty() {
        let document = decode_document(&json!({"name": "projects/demo/.../splits/S1"}));
        assert!(document.is_empty());
    }

    #[tokio::test]
    async fn found_document_is_decoded() {
        let stub = firestore_stub().await;
        let result = store(&stub.base_url).get("users", "U1").await.unwrap();

        let document = result.require("users", "U1").unwrap();
        assert_eq!(document["name"], json!("Alice"));
        assert_eq!(document["fcmToken"], json!("tok1"));

        let requests = stub.requests();
        assert_eq!(requests[0].method, "GET");
        assert_eq!(requests[0].header("authorization"), None);
    }

    #[tokio::test]
    async fn not_found_status_maps_to_not_found() {
        let stub = firestore_stub().await;
        let result = store(&stub.base_url).get("users", "U404").await.unwrap();
        assert_eq!(result, FetchResult::NotFound);
    }

    #[tokio::test]
    async fn error_status_is_a_lookup_failure() {
        let stub = firestore_stub().await;
        let err = store(&stub.base_url).get("splits", "S1").await.unwrap_err();
        assert!(matches!(
            err,
            ReminderError::Lookup { ref collection, ref message, .. }
                if collection == "splits" && message.contains("500")
        ));
    }

    #[tokio::test]
    async fn static_token_is_sent_as_bearer() {
        let stub = firestore_stub().await;
        let store = FirestoreDocumentStore::new(&FirestoreSettings {
            project_id: "demo".into(),
            base_url: stub.base_url.clone(),
            credentials: GoogleCredentials::AccessToken("ya29.static".into()),
            timeout: Duration::from_secs(5),
        })
        .unwrap();

        store.get("users", "U1").await.unwrap();
        assert_eq!(
            stub.requests()[0].header("authorization"),
            Some("Bearer ya29.static")
        );
    }

    #[tokio::test]
    async fn unreachable_store_is_a_lookup_failure() {
        let err = store(&unreachable_base_url().await)
            .get("users", "U1")
            .await
            .unwrap_err();
        assert!(matches!(err, ReminderError::Lookup { .. }));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("hi", 10), "hi");
    }
}
