use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisRequest {
    pub topic: Option<String>,
    pub analysis_type: Option<String>,
}

impl AnalysisRequest {
    pub fn new(topic: impl Into<String>, analysis_type: impl Into<String>) -> Self {
        Self {
            topic: Some(topic.into()),
            analysis_type: Some(analysis_type.into()),
        }
    }
}

/// Analysis templates with a fixed output key set. Anything else is carried
/// through as `Other` and left to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisFramework {
    Swot,
    Pestle,
    PortersFiveForces,
    CustomerPersonas,
    Other(String),
}

impl AnalysisFramework {
    pub fn parse(analysis_type: &str) -> Self {
        let normalized = analysis_type.trim().to_ascii_lowercase();
        if normalized.contains("swot") {
            AnalysisFramework::Swot
        } else if normalized.contains("pestle") || normalized.contains("pestel") {
            AnalysisFramework::Pestle
        } else if normalized.contains("porter") || normalized.contains("five forces") {
            AnalysisFramework::PortersFiveForces
        } else if normalized.contains("persona") {
            AnalysisFramework::CustomerPersonas
        } else {
            AnalysisFramework::Other(analysis_type.trim().to_string())
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            AnalysisFramework::Swot => "SWOT Analysis",
            AnalysisFramework::Pestle => "PESTLE Analysis",
            AnalysisFramework::PortersFiveForces => "Porter's Five Forces",
            AnalysisFramework::CustomerPersonas => "Customer Personas",
            AnalysisFramework::Other(name) => name,
        }
    }

    /// Top-level keys the model is told to produce. Empty for `Other`.
    pub fn keys(&self) -> &'static [&'static str] {
        match self {
            AnalysisFramework::Swot => &["strengths", "weaknesses", "opportunities", "threats"],
            AnalysisFramework::Pestle => &[
                "political",
                "economic",
                "social",
                "technological",
                "legal",
                "environmental",
            ],
            AnalysisFramework::PortersFiveForces => &[
                "threat_of_new_entrants",
                "bargaining_power_of_buyers",
                "bargaining_power_of_suppliers",
                "threat_of_substitutes",
                "competitive_rivalry",
            ],
            AnalysisFramework::CustomerPersonas => &["personas"],
            AnalysisFramework::Other(_) => &[],
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, AnalysisFramework::Other(_))
    }

    /// Builds the instruction sent to the text-generation upstream.
    pub fn instruction(&self, topic: &str) -> String {
        let shape = match self {
            AnalysisFramework::CustomerPersonas => {
                "a single key \"personas\" holding an array of 3 objects, each with the keys \
                 \"name\" (string), \"bio\" (string), \"demographics\" (string), \
                 \"goals\" (array of strings) and \"frustrations\" (array of strings)"
                    .to_string()
            }
            AnalysisFramework::Other(_) => {
                "keys of your choosing that fit this analysis, each mapped to an array of \
                 3 to 5 concise strings"
                    .to_string()
            }
            _ => {
                let keys = self
                    .keys()
                    .iter()
                    .map(|k| format!("\"{}\"", k))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(
                    "exactly these keys: {}. Each key must map to an array of 3 to 5 concise strings",
                    keys
                )
            }
        };

        format!(
            "You are a business strategy consultant. Perform a {} for the following topic: \"{}\". \
             Respond with a single raw JSON object and nothing else: no markdown, no code fences, \
             no commentary. The object must contain {}.",
            self.display_name(),
            topic,
            shape
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiPart {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiContent {
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiCandidate {
    #[serde(default)]
    pub content: Option<GeminiContent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiGenerateResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
}

impl GeminiGenerateResponse {
    /// Concatenated text of the first candidate.
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_framework_names_loosely() {
        assert_eq!(AnalysisFramework::parse("SWOT Analysis"), AnalysisFramework::Swot);
        assert_eq!(AnalysisFramework::parse("pestle"), AnalysisFramework::Pestle);
        assert_eq!(
            AnalysisFramework::parse("Porter's Five Forces"),
            AnalysisFramework::PortersFiveForces
        );
        assert_eq!(
            AnalysisFramework::parse("Customer Personas"),
            AnalysisFramework::CustomerPersonas
        );
        assert_eq!(
            AnalysisFramework::parse(" Value Chain "),
            AnalysisFramework::Other("Value Chain".into())
        );
    }

    #[test]
    fn instruction_names_every_key() {
        let text = AnalysisFramework::Pestle.instruction("electric scooters");
        for key in AnalysisFramework::Pestle.keys() {
            assert!(text.contains(key), "missing key {}", key);
        }
        assert!(text.contains("electric scooters"));
    }

    #[test]
    fn unrecognized_framework_is_passed_through_by_name() {
        let framework = AnalysisFramework::parse("BCG Matrix");
        assert!(!framework.is_recognized());
        assert!(framework.instruction("coffee").contains("BCG Matrix"));
    }

    #[test]
    fn gemini_text_joins_parts_of_first_candidate() {
        let response: GeminiGenerateResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "{\"a\":" }, { "text": "[]}" }] } }]
        }))
        .unwrap();
        assert_eq!(response.text().as_deref(), Some("{\"a\":[]}"));
    }
}
