use serde::{Deserialize, Serialize};

/// Structured contract analysis as returned by the model. Every field is
/// defaulted so a partially-populated reply still deserializes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractAnalysis {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub key_clauses: Vec<KeyClause>,
    #[serde(default)]
    pub risks: Vec<RiskFinding>,
    #[serde(default)]
    pub risk_score: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyClause {
    #[serde(rename = "type", default)]
    pub clause_type: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub importance: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskFinding {
    #[serde(default)]
    pub risk_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub clause_reference: String,
}

impl ContractAnalysis {
    /// Stand-in when the model answered but not with parseable JSON.
    pub fn unparseable_reply() -> Self {
        ContractAnalysis {
            summary: "Contract analysis completed, but formatting error occurred.".to_string(),
            key_clauses: Vec::new(),
            risks: vec![RiskFinding {
                risk_type: "Analysis Error".to_string(),
                description: "Could not parse AI response".to_string(),
                severity: "low".to_string(),
                clause_reference: "N/A".to_string(),
            }],
            risk_score: 50,
        }
    }

    /// Stand-in when the model call itself failed; keeps an upload usable
    /// without its analysis.
    pub fn failed(reason: &str) -> Self {
        ContractAnalysis {
            summary: format!("AI analysis failed: {}", reason),
            key_clauses: Vec::new(),
            risks: Vec::new(),
            risk_score: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NegotiationEmail {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub tone: String,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub contract_text: String,
}

#[derive(Debug, Deserialize)]
pub struct QuestionRequest {
    pub question: String,
    pub contract_text: String,
}

fn default_tone() -> String {
    "professional".to_string()
}

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub contract_text: String,
    #[serde(default = "default_tone")]
    pub tone: String,
    #[serde(default)]
    pub issues: Option<Vec<String>>,
}
