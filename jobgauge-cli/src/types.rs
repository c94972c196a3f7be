//! CLI-local types

use serde::{Deserialize, Serialize};

/// One entry of a backends file (`backends.json`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSpec {
    /// Display name, also used for the per-backend output directory
    pub name: String,
    /// Base URL of the backend API
    pub url: String,
    /// Optional bearer token for this backend
    #[serde(default)]
    pub token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_spec_token_is_optional() {
        let spec: BackendSpec =
            serde_json::from_str(r#"{"name": "cdse", "url": "https://backend.example.eu"}"#)
                .unwrap();
        assert_eq!(spec.name, "cdse");
        assert!(spec.token.is_none());
    }
}
