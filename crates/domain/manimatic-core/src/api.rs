use serde::{Deserialize, Serialize};

pub type FeatureKey = String;

/// Feature key guarding user-initiated recompilation.
pub const USER_COMPILE: &str = "user-compile";
/// Feature key for 4K rendering. Advertised by the backend; the client only displays it.
pub const HIGH_QUALITY: &str = "high-quality";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerateRequest {
    pub prompt: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompileRequest {
    pub script: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Feature {
    pub key: FeatureKey,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeaturesResponse {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelsResponse {
    #[serde(default)]
    pub models: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl ModelsResponse {
    /// The model a fresh session should start with: the server default when it
    /// is non-empty, otherwise the first advertised model.
    pub fn preferred(&self) -> Option<&str> {
        self.default_model
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .or_else(|| self.models.first().map(String::as_str))
    }
}
