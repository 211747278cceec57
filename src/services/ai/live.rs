use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{ContractAi, ContractAiError};
use crate::models::analysis::{ContractAnalysis, NegotiationEmail};

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

// Caps on how much contract text goes into a prompt, in characters.
const MAX_ANALYSIS_CHARS: usize = 12_000;
const MAX_EMAIL_CHARS: usize = 4_000;

/// Live client for Gemini's `generateContent` endpoint.
pub struct GeminiContractAi {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiContractAi {
    pub fn new(client: Client, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    /// Points the client at a different host; used by tests.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn generate(&self, prompt: &str) -> Result<String, ContractAiError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({ "contents": [{ "parts": [{ "text": prompt }] }] }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ContractAiError::Api { status, message });
        }

        let body: Value = response.json().await?;
        let text = body["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .unwrap_or("")
            .to_string();
        if text.is_empty() {
            return Err(ContractAiError::EmptyReply);
        }
        Ok(text)
    }
}

#[async_trait]
impl ContractAi for GeminiContractAi {
    async fn analyze_contract(
        &self,
        contract_text: &str,
    ) -> Result<ContractAnalysis, ContractAiError> {
        let prompt = analysis_prompt(truncate_chars(contract_text, MAX_ANALYSIS_CHARS));
        let reply = self.generate(&prompt).await?;

        // A malformed reply is still a completed analysis from the
        // caller's point of view; degrade rather than fail the request.
        match extract_json(&reply).and_then(|v| serde_json::from_value(v).ok()) {
            Some(analysis) => Ok(analysis),
            None => Ok(ContractAnalysis::unparseable_reply()),
        }
    }

    async fn generate_email(
        &self,
        contract_text: &str,
        tone: &str,
        issues: Option<&[String]>,
    ) -> Result<NegotiationEmail, ContractAiError> {
        let prompt = email_prompt(truncate_chars(contract_text, MAX_EMAIL_CHARS), tone, issues);
        let reply = self.generate(&prompt).await?;

        let mut email: NegotiationEmail = extract_json(&reply)
            .and_then(|v| serde_json::from_value(v).ok())
            .ok_or(ContractAiError::UnparseableReply)?;
        email.tone = tone.to_string();
        Ok(email)
    }

    async fn answer_question(
        &self,
        question: &str,
        contract_text: &str,
    ) -> Result<String, ContractAiError> {
        let prompt = question_prompt(question, truncate_chars(contract_text, MAX_ANALYSIS_CHARS));
        self.generate(&prompt).await
    }
}

fn analysis_prompt(contract_text: &str) -> String {
    format!(
        r#"You are a legal AI assistant specializing in contract analysis.
Always return STRICT valid JSON with the exact schema below.

Analyze the following contract and provide a comprehensive analysis in JSON format.

Contract Text:
{contract_text}

Return exactly this JSON structure:
{{
  "summary": "Brief 3-4 bullet point summary (use - bullets separated by newlines)",
  "key_clauses": [
    {{
      "type": "Payment Terms",
      "content": "extracted clause text",
      "importance": "high|medium|low"
    }}
  ],
  "risks": [
    {{
      "risk_type": "Financial Risk",
      "description": "description of the risk",
      "severity": "high|medium|low",
      "clause_reference": "relevant clause"
    }}
  ],
  "risk_score": 0
}}

Notes:
- Focus on payment terms, deadlines, termination, liability/indemnity, IP, confidentiality, dispute resolution, force majeure.
- risk_score is 0-100 (0 very safe, 100 very risky).
"#
    )
}

fn email_prompt(contract_text: &str, tone: &str, issues: Option<&[String]>) -> String {
    let issues_text = match issues {
        Some(issues) if !issues.is_empty() => {
            format!("Specific issues to address: {}\n", issues.join(", "))
        }
        _ => String::new(),
    };
    format!(
        r#"Based on this contract, draft a negotiation email.

Contract excerpt:
{contract_text}

{issues_text}Tone: {tone_instruction}

Return JSON with keys subject and body only.
"#,
        tone_instruction = tone_instruction(tone),
    )
}

fn question_prompt(question: &str, contract_text: &str) -> String {
    format!(
        r#"Answer the question using ONLY the contract text.
If the answer is not present, say "The contract does not specify." Do not invent facts.

Question: {question}

Contract Text:
{contract_text}
"#
    )
}

fn tone_instruction(tone: &str) -> &'static str {
    match tone {
        "assertive" => "Use a confident, assertive tone while remaining respectful.",
        "collaborative" => "Use a collaborative, partnership-focused tone.",
        "friendly" => "Use a friendly and warm but still professional tone.",
        "concise" => "Be concise and to-the-point while remaining polite.",
        _ => "Use a professional, respectful tone.",
    }
}

/// Truncates to a character count without splitting a code point.
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Models often wrap JSON in a ```json fence; accept both fenced and bare
/// replies.
fn extract_json(text: &str) -> Option<Value> {
    let body = fenced_json(text).unwrap_or(text);
    serde_json::from_str(body.trim()).ok()
}

fn fenced_json(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after = &text[open + 3..];
    let newline = after.find('\n')?;
    if !after[..newline].trim().eq_ignore_ascii_case("json") {
        return None;
    }
    let body = &after[newline + 1..];
    let close = body.find("```")?;
    Some(&body[..close])
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[test]
    fn extract_json_handles_fenced_and_bare_replies() {
        let fenced = "Here you go:\n```json\n{ \"risk_score\": 12 }\n```\nanything after";
        let parsed = extract_json(fenced).unwrap();
        assert_eq!(parsed["risk_score"], 12);

        let bare = "  { \"subject\": \"Re: terms\", \"body\": \"...\" } ";
        let parsed = extract_json(bare).unwrap();
        assert_eq!(parsed["subject"], "Re: terms");

        assert!(extract_json("not json at all").is_none());
        assert!(extract_json("```json\nnot json\n```").is_none());
    }

    #[test]
    fn fence_tag_must_be_json() {
        let other = "```python\nprint('hi')\n```";
        assert!(fenced_json(other).is_none());
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        // multibyte: must not split the codepoint
        assert_eq!(truncate_chars("héllo", 2), "hé");
    }

    fn gemini_reply(text: &str) -> serde_json::Value {
        serde_json::json!({
            "candidates": [
                { "content": { "parts": [ { "text": text } ] } }
            ]
        })
    }

    #[tokio::test]
    async fn analyze_contract_parses_a_fenced_reply() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/models/gemini-2.0-flash:generateContent")
                .query_param("key", "test-key");
            then.status(200).json_body(gemini_reply(
                "```json\n{ \"summary\": \"- ok\", \"key_clauses\": [], \"risks\": [], \"risk_score\": 10 }\n```",
            ));
        });

        let ai = GeminiContractAi::new(Client::new(), "test-key", "gemini-2.0-flash")
            .with_base_url(server.base_url());
        let analysis = ai.analyze_contract("some contract").await.unwrap();

        mock.assert();
        assert_eq!(analysis.summary, "- ok");
        assert_eq!(analysis.risk_score, 10);
    }

    #[tokio::test]
    async fn analyze_contract_degrades_on_unparseable_reply() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST);
            then.status(200).json_body(gemini_reply("I cannot produce JSON today."));
        });

        let ai = GeminiContractAi::new(Client::new(), "test-key", "gemini-2.0-flash")
            .with_base_url(server.base_url());
        let analysis = ai.analyze_contract("some contract").await.unwrap();

        assert_eq!(analysis.risk_score, 50);
        assert_eq!(analysis.risks[0].risk_type, "Analysis Error");
    }

    #[tokio::test]
    async fn api_errors_carry_status_and_message() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST);
            then.status(429).body("quota exceeded");
        });

        let ai = GeminiContractAi::new(Client::new(), "test-key", "gemini-2.0-flash")
            .with_base_url(server.base_url());
        let err = ai.answer_question("q", "text").await.unwrap_err();

        match err {
            ContractAiError::Api { status, message } => {
                assert_eq!(status.as_u16(), 429);
                assert_eq!(message, "quota exceeded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn generate_email_stamps_the_requested_tone() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST);
            then.status(200).json_body(gemini_reply(
                "{ \"subject\": \"Contract terms\", \"body\": \"Dear team,\" }",
            ));
        });

        let ai = GeminiContractAi::new(Client::new(), "test-key", "gemini-2.0-flash")
            .with_base_url(server.base_url());
        let email = ai
            .generate_email("text", "assertive", Some(&["late fees".to_string()]))
            .await
            .unwrap();

        assert_eq!(email.subject, "Contract terms");
        assert_eq!(email.tone, "assertive");
    }
}
