use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Free,
    Pro,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Pro => "pro",
        }
    }

    /// Anything that is not recognizably "pro" reads as the free tier.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "pro" => Plan::Pro,
            _ => Plan::Free,
        }
    }
}
