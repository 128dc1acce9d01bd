//! Secret backing stores.
//!
//! # Responsibilities
//! - Fetch the complete secret set in one call
//! - Decode the JSON payload into a flat `name → value` map
//!
//! # Payload
//! ```text
//! { "<item>": { "API_TOKEN": "...", ... } }
//! { "<item>": "{\"API_TOKEN\": \"...\"}" }   (item holding JSON text)
//! ```

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::secrets::SecretError;

/// Source of the full secret set.
#[async_trait]
pub trait SecretBackend: Send + Sync {
    async fn load_all(&self) -> Result<HashMap<String, String>, SecretError>;
}

/// Reads the payload from a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
    item: String,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>, item: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            item: item.into(),
        }
    }
}

#[async_trait]
impl SecretBackend for JsonFileBackend {
    async fn load_all(&self) -> Result<HashMap<String, String>, SecretError> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            SecretError::Unreachable(format!("{}: {}", self.path.display(), e))
        })?;
        parse_payload(&raw, &self.item)
    }
}

/// Reads the payload from an environment variable.
#[derive(Debug, Clone)]
pub struct EnvJsonBackend {
    var: String,
    item: String,
}

impl EnvJsonBackend {
    pub fn new(var: impl Into<String>, item: impl Into<String>) -> Self {
        Self {
            var: var.into(),
            item: item.into(),
        }
    }
}

#[async_trait]
impl SecretBackend for EnvJsonBackend {
    async fn load_all(&self) -> Result<HashMap<String, String>, SecretError> {
        let raw = std::env::var(&self.var).map_err(|e| match e {
            std::env::VarError::NotPresent => {
                SecretError::Unreachable(format!("environment variable {} is not set", self.var))
            }
            std::env::VarError::NotUnicode(_) => {
                SecretError::Malformed(format!("environment variable {} is not UTF-8", self.var))
            }
        })?;
        parse_payload(&raw, &self.item)
    }
}

/// Decode a payload and extract the map stored under `item`.
pub fn parse_payload(raw: &str, item: &str) -> Result<HashMap<String, String>, SecretError> {
    let document: Value =
        serde_json::from_str(raw).map_err(|e| SecretError::Malformed(e.to_string()))?;

    let entry = document
        .get(item)
        .ok_or_else(|| SecretError::NotFound(item.to_string()))?;

    let map = match entry {
        Value::String(text) => serde_json::from_str(text),
        other => serde_json::from_value(other.clone()),
    };
    map.map_err(|e| SecretError::Malformed(format!("{item}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_object_payload() {
        let map = parse_payload(r#"{"secrets": {"API_TOKEN": "t0k3n", "OTHER": "x"}}"#, "secrets")
            .unwrap();
        assert_eq!(map.get("API_TOKEN").map(String::as_str), Some("t0k3n"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_parse_string_encoded_payload() {
        let raw = r#"{"secrets": "{\"API_TOKEN\": \"abc\"}"}"#;
        let map = parse_payload(raw, "secrets").unwrap();
        assert_eq!(map.get("API_TOKEN").map(String::as_str), Some("abc"));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse_payload("not json", "secrets"),
            Err(SecretError::Malformed(_))
        ));
        assert_eq!(
            parse_payload(r#"{"other": {}}"#, "secrets"),
            Err(SecretError::NotFound("secrets".into()))
        );
        assert!(matches!(
            parse_payload(r#"{"secrets": {"API_TOKEN": 42}}"#, "secrets"),
            Err(SecretError::Malformed(_))
        ));
        assert!(matches!(
            parse_payload(r#"{"secrets": "{broken"}"#, "secrets"),
            Err(SecretError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_file_backend() {
        let path = std::env::temp_dir().join(format!("edge-secrets-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, r#"{"secrets": {"API_TOKEN": "from-file"}}"#).unwrap();

        let backend = JsonFileBackend::new(&path, "secrets");
        let map = backend.load_all().await.unwrap();
        assert_eq!(map.get("API_TOKEN").map(String::as_str), Some("from-file"));

        std::fs::remove_file(&path).unwrap();

        let missing = backend.load_all().await;
        assert!(matches!(missing, Err(SecretError::Unreachable(_))));
    }

    #[tokio::test]
    async fn test_env_backend() {
        let var = format!("EDGE_SECRETS_TEST_{}", uuid::Uuid::new_v4().simple());
        let backend = EnvJsonBackend::new(&var, "secrets");
        assert!(matches!(
            backend.load_all().await,
            Err(SecretError::Unreachable(_))
        ));

        std::env::set_var(&var, r#"{"secrets": {"API_TOKEN": "from-env"}}"#);
        let map = backend.load_all().await.unwrap();
        assert_eq!(map.get("API_TOKEN").map(String::as_str), Some("from-env"));
        std::env::remove_var(&var);
    }
}
