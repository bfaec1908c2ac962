use std::collections::HashMap;

use manimatic_core::FeaturesResponse;

/// Fetched-once feature flags.
///
/// Keeps "not loaded yet" distinct from "loaded and disabled" for callers
/// that want to show it, while [`FeatureGate::is_enabled`] stays fail-closed
/// for both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FeatureGate {
    #[default]
    NotLoaded,
    Loaded {
        version: String,
        flags: HashMap<String, bool>,
    },
    /// The fetch failed. Stays this way for the rest of the process.
    Unavailable,
}

impl FeatureGate {
    pub fn from_response(resp: FeaturesResponse) -> Self {
        let flags = resp
            .features
            .into_iter()
            .map(|f| (f.key, f.enabled))
            .collect();
        Self::Loaded {
            version: resp.version,
            flags,
        }
    }

    pub fn is_enabled(&self, key: &str) -> bool {
        match self {
            Self::Loaded { flags, .. } => flags.get(key).copied().unwrap_or(false),
            Self::NotLoaded | Self::Unavailable => false,
        }
    }

    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::NotLoaded)
    }

    pub fn version(&self) -> Option<&str> {
        match self {
            Self::Loaded { version, .. } => Some(version),
            _ => None,
        }
    }

    /// Enabled keys in stable order, for display.
    pub fn enabled_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = match self {
            Self::Loaded { flags, .. } => flags
                .iter()
                .filter(|(_, on)| **on)
                .map(|(k, _)| k.as_str())
                .collect(),
            _ => Vec::new(),
        };
        keys.sort_unstable();
        keys
    }
}
