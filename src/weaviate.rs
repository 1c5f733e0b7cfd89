use crate::error::CoachError;
use crate::services::{KnowledgeMatch, KnowledgeSearch};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_WEAVIATE_URL: &str = "http://localhost:8080";
pub const DEFAULT_COLLECTION: &str = "Philosophy";

#[derive(Debug, Serialize)]
struct GraphQLRequest {
    query: String,
}

/// Vector search over a Weaviate instance through its GraphQL `nearText` API
pub struct WeaviateClient {
    client: Client,
    base_url: String,
}

impl WeaviateClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CoachError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl KnowledgeSearch for WeaviateClient {
    async fn query(&self, collection: &str, concept: &str) -> Result<Vec<KnowledgeMatch>, CoachError> {
        let request = GraphQLRequest {
            query: build_near_text_query(collection, concept, 1)?,
        };

        let response = self.client
            .post(format!("{}/v1/graphql", self.base_url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(CoachError::Retrieval(format!("Weaviate error ({}): {}", status, error_text)));
        }

        let body: Value = response.json().await?;
        parse_matches(&body, collection)
    }
}

/// Build the `Get { <collection>(nearText: ...) { content } }` query.
/// The collection becomes a GraphQL identifier, so it is restricted to
/// alphanumerics and underscores; the concept is emitted as a JSON string,
/// which is also a valid GraphQL string literal.
fn build_near_text_query(collection: &str, concept: &str, limit: usize) -> Result<String, CoachError> {
    let valid_name = !collection.is_empty()
        && collection.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid_name {
        return Err(CoachError::Retrieval(format!("invalid collection name '{}'", collection)));
    }

    let concept_literal = serde_json::to_string(concept)?;
    Ok(format!(
        "{{ Get {{ {}(nearText: {{concepts: [{}]}}, limit: {}) {{ content }} }} }}",
        collection, concept_literal, limit
    ))
}

fn parse_matches(body: &Value, collection: &str) -> Result<Vec<KnowledgeMatch>, CoachError> {
    if let Some(errors) = body.get("errors").and_then(|e| e.as_array()) {
        if !errors.is_empty() {
            let messages: Vec<&str> = errors
                .iter()
                .filter_map(|e| e.get("message").and_then(|m| m.as_str()))
                .collect();
            return Err(CoachError::Retrieval(format!("GraphQL error: {}", messages.join("; "))));
        }
    }

    let hits = body
        .pointer(&format!("/data/Get/{}", collection))
        .ok_or_else(|| CoachError::Retrieval("malformed response: missing data.Get".into()))?;

    // Weaviate reports an empty class as null
    let Some(top) = hits.as_array().and_then(|hits| hits.first()) else {
        return Ok(Vec::new());
    };

    let content = top
        .get("content")
        .and_then(|c| c.as_str())
        .ok_or_else(|| CoachError::Retrieval("malformed response: top match has no content".into()))?;

    Ok(vec![KnowledgeMatch { content: content.to_string() }])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_escapes_concept() {
        let query = build_near_text_query("Philosophy", "data \"analysis\"", 1).unwrap();
        assert_eq!(
            query,
            r#"{ Get { Philosophy(nearText: {concepts: ["data \"analysis\""]}, limit: 1) { content } } }"#
        );
    }

    #[test]
    fn test_query_rejects_odd_collection() {
        assert!(build_near_text_query("Philosophy) { x }", "ethics", 1).is_err());
        assert!(build_near_text_query("", "ethics", 1).is_err());
    }

    #[test]
    fn test_parse_keeps_top_match() {
        let body = json!({"data": {"Get": {"Philosophy": [
            {"content": "Double bind theory"},
            {"content": "Creative evolution"}
        ]}}});
        let matches = parse_matches(&body, "Philosophy").unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].content, "Double bind theory");
    }

    #[test]
    fn test_parse_top_without_content_is_error() {
        let body = json!({"data": {"Get": {"Philosophy": [
            {"title": "Untitled"},
            {"content": "Creative evolution"}
        ]}}});
        assert!(matches!(parse_matches(&body, "Philosophy"), Err(CoachError::Retrieval(_))));
    }

    #[test]
    fn test_parse_empty_and_null() {
        let empty = json!({"data": {"Get": {"Philosophy": []}}});
        assert!(parse_matches(&empty, "Philosophy").unwrap().is_empty());

        let null = json!({"data": {"Get": {"Philosophy": null}}});
        assert!(parse_matches(&null, "Philosophy").unwrap().is_empty());
    }

    #[test]
    fn test_parse_graphql_errors() {
        let body = json!({"errors": [{"message": "no module with name near-text"}]});
        let err = parse_matches(&body, "Philosophy").unwrap_err();
        assert!(err.to_string().contains("near-text"));
    }

    #[test]
    fn test_parse_malformed() {
        let body = json!({"unexpected": true});
        assert!(matches!(parse_matches(&body, "Philosophy"), Err(CoachError::Retrieval(_))));
    }
}
