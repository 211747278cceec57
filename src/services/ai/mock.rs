#![allow(dead_code)]
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use super::{ContractAi, ContractAiError};
use crate::models::analysis::{ContractAnalysis, NegotiationEmail, RiskFinding};

/// Capturing fake for handler tests: records every prompt it is handed
/// and replays configured replies.
#[derive(Clone, Default)]
pub struct MockContractAi {
    pub analyze_calls: Arc<Mutex<Vec<String>>>,
    pub email_calls: Arc<Mutex<Vec<(String, String)>>>,
    pub question_calls: Arc<Mutex<Vec<(String, String)>>>,
    analysis: Arc<Mutex<Option<ContractAnalysis>>>,
    fail: Arc<Mutex<bool>>,
}

impl MockContractAi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_analysis(self, analysis: ContractAnalysis) -> Self {
        *self.analysis.lock().unwrap() = Some(analysis);
        self
    }

    /// Makes every call fail, for exercising degraded paths.
    pub fn failing(self) -> Self {
        *self.fail.lock().unwrap() = true;
        self
    }

    fn check_failure(&self) -> Result<(), ContractAiError> {
        if *self.fail.lock().unwrap() {
            Err(ContractAiError::EmptyReply)
        } else {
            Ok(())
        }
    }

    fn canned_analysis(&self) -> ContractAnalysis {
        self.analysis.lock().unwrap().clone().unwrap_or_else(|| ContractAnalysis {
            summary: "- canned summary".to_string(),
            key_clauses: Vec::new(),
            risks: vec![RiskFinding {
                risk_type: "Financial Risk".to_string(),
                description: "canned risk".to_string(),
                severity: "medium".to_string(),
                clause_reference: "Section 4".to_string(),
            }],
            risk_score: 42,
        })
    }
}

#[async_trait]
impl ContractAi for MockContractAi {
    async fn analyze_contract(
        &self,
        contract_text: &str,
    ) -> Result<ContractAnalysis, ContractAiError> {
        self.analyze_calls
            .lock()
            .unwrap()
            .push(contract_text.to_string());
        self.check_failure()?;
        Ok(self.canned_analysis())
    }

    async fn generate_email(
        &self,
        contract_text: &str,
        tone: &str,
        _issues: Option<&[String]>,
    ) -> Result<NegotiationEmail, ContractAiError> {
        self.email_calls
            .lock()
            .unwrap()
            .push((contract_text.to_string(), tone.to_string()));
        self.check_failure()?;
        Ok(NegotiationEmail {
            subject: "Contract discussion".to_string(),
            body: "Dear counterparty,".to_string(),
            tone: tone.to_string(),
        })
    }

    async fn answer_question(
        &self,
        question: &str,
        contract_text: &str,
    ) -> Result<String, ContractAiError> {
        self.question_calls
            .lock()
            .unwrap()
            .push((question.to_string(), contract_text.to_string()));
        self.check_failure()?;
        Ok("The contract does not specify.".to_string())
    }
}
