use async_trait::async_trait;
use reqwest::StatusCode;

use crate::models::analysis::{ContractAnalysis, NegotiationEmail};

#[derive(Debug, thiserror::Error)]
pub enum ContractAiError {
    #[error("Gemini API request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Gemini API responded with status {status}: {message}")]
    Api { status: StatusCode, message: String },
    #[error("Gemini returned an empty reply")]
    EmptyReply,
    #[error("could not parse model reply as JSON")]
    UnparseableReply,
}

/// Everything the contract endpoints need from the model, behind a seam
/// so handlers stay testable without the network.
#[async_trait]
pub trait ContractAi: Send + Sync {
    async fn analyze_contract(
        &self,
        contract_text: &str,
    ) -> Result<ContractAnalysis, ContractAiError>;

    async fn generate_email(
        &self,
        contract_text: &str,
        tone: &str,
        issues: Option<&[String]>,
    ) -> Result<NegotiationEmail, ContractAiError>;

    async fn answer_question(
        &self,
        question: &str,
        contract_text: &str,
    ) -> Result<String, ContractAiError>;
}

mod live;
mod mock;

pub use live::GeminiContractAi;
#[allow(unused_imports)]
pub use mock::MockContractAi;
