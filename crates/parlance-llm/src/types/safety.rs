use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Harm categories every preset applies its threshold to
pub const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// Named bundle of content-filtering thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyPreset {
    /// Leave the API defaults alone
    #[default]
    Default,
    Strict,
    Balanced,
    Relaxed,
    Off,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetySetting {
    pub category: String,
    pub threshold: String,
}

impl SafetyPreset {
    pub const ALL: [SafetyPreset; 5] = [
        SafetyPreset::Default,
        SafetyPreset::Strict,
        SafetyPreset::Balanced,
        SafetyPreset::Relaxed,
        SafetyPreset::Off,
    ];

    /// Block threshold, or `None` when the preset does not override anything
    pub fn threshold(self) -> Option<&'static str> {
        match self {
            Self::Default => None,
            Self::Strict => Some("BLOCK_LOW_AND_ABOVE"),
            Self::Balanced => Some("BLOCK_MEDIUM_AND_ABOVE"),
            Self::Relaxed => Some("BLOCK_ONLY_HIGH"),
            Self::Off => Some("BLOCK_NONE"),
        }
    }

    /// `safetySettings` entries for a request body (empty for `Default`)
    pub fn settings(self) -> Vec<SafetySetting> {
        let Some(threshold) = self.threshold() else {
            return Vec::new();
        };

        HARM_CATEGORIES
            .iter()
            .map(|category| SafetySetting {
                category: (*category).to_string(),
                threshold: threshold.to_string(),
            })
            .collect()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Strict => "strict",
            Self::Balanced => "balanced",
            Self::Relaxed => "relaxed",
            Self::Off => "off",
        }
    }
}

impl fmt::Display for SafetyPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SafetyPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(Self::Default),
            "strict" => Ok(Self::Strict),
            "balanced" => Ok(Self::Balanced),
            "relaxed" => Ok(Self::Relaxed),
            "off" => Ok(Self::Off),
            other => Err(format!("unknown safety preset: {other}")),
        }
    }
}
