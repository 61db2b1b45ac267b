//! Supported AI models for translation suggestions

use crate::error::Error;
use serde::{Deserialize, Serialize};

/// Closed set of models the suggestion provider may be asked to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AiModel {
    #[serde(rename = "gemini-2.5-pro")]
    Gemini25Pro,
    #[default]
    #[serde(rename = "gemini-2.5-flash")]
    Gemini25Flash,
    #[serde(rename = "gemini-2.5-flash-lite")]
    Gemini25FlashLite,
    #[serde(rename = "gemini-2.0-flash")]
    Gemini20Flash,
    #[serde(rename = "gemma-3-27b-it")]
    Gemma3,
}

impl AiModel {
    pub const ALL: [AiModel; 5] = [
        AiModel::Gemini25Pro,
        AiModel::Gemini25Flash,
        AiModel::Gemini25FlashLite,
        AiModel::Gemini20Flash,
        AiModel::Gemma3,
    ];

    /// Identifier sent to the provider
    pub fn id(&self) -> &'static str {
        match self {
            AiModel::Gemini25Pro => "gemini-2.5-pro",
            AiModel::Gemini25Flash => "gemini-2.5-flash",
            AiModel::Gemini25FlashLite => "gemini-2.5-flash-lite",
            AiModel::Gemini20Flash => "gemini-2.0-flash",
            AiModel::Gemma3 => "gemma-3-27b-it",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            AiModel::Gemini25Pro => "Gemini 2.5 Pro",
            AiModel::Gemini25Flash => "Gemini 2.5 Flash",
            AiModel::Gemini25FlashLite => "Gemini 2.5 Flash-Lite",
            AiModel::Gemini20Flash => "Gemini 2.0 Flash",
            AiModel::Gemma3 => "Gemma 3 27B",
        }
    }

    /// Whether the model accepts a JSON response schema
    pub fn supports_structured_output(&self) -> bool {
        match self {
            AiModel::Gemini25Pro
            | AiModel::Gemini25Flash
            | AiModel::Gemini25FlashLite
            | AiModel::Gemini20Flash => true,
            AiModel::Gemma3 => false,
        }
    }
}

impl std::fmt::Display for AiModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl std::str::FromStr for AiModel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AiModel::ALL
            .into_iter()
            .find(|m| m.id() == s)
            .ok_or_else(|| Error::Config(format!("unknown model: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_ids_round_trip() {
        for model in AiModel::ALL {
            assert_eq!(model.id().parse::<AiModel>().unwrap(), model);
            let json = serde_json::to_string(&model).unwrap();
            assert_eq!(json, format!("\"{}\"", model.id()));
        }
    }

    #[test]
    fn test_unknown_model_is_rejected() {
        assert!("gemini-2.5-flash-preview".parse::<AiModel>().is_err());
        assert!("gemma".parse::<AiModel>().is_err());
    }

    #[test]
    fn test_structured_output_capability() {
        assert!(AiModel::Gemini25Flash.supports_structured_output());
        assert!(!AiModel::Gemma3.supports_structured_output());
    }
}
