//! Reasoning-service client over an OpenAI-compatible chat gateway.
//!
//! All pipeline reasoning goes through plain chat completions. Responses are
//! free text; `extract_json` digs the JSON payload out of markdown fences or
//! surrounding prose, and decision parsing degrades to a rationale-only value
//! when the service ignores the requested schema.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use super::ReasoningAgent;
use crate::config::AgentConfig;
use crate::domain::{Event, Market, TradeDecision};
use crate::error::{PolyagentError, Result};
use crate::persistence::to_document;

const FILTER_SYSTEM_PROMPT: &str = "You are a prediction-market analyst. \
You are given a JSON list of candidates. Reply with a JSON array containing \
only the candidates worth keeping, copied verbatim. Reply with JSON only.";

const TRADE_SYSTEM_PROMPT: &str = "You are a prediction-market trader. Given \
one market as JSON, reply with a JSON object with fields: market_id, side \
(\"yes\" or \"no\"), size_usd (number), rationale (string). Reply with JSON only.";

const CREATOR_SYSTEM_PROMPT: &str = "You are a prediction-market designer. \
Given existing markets as JSON, describe one new market that is clearly \
resolvable, not a duplicate, and likely to attract volume. Reply with a \
short plain-text description.";

const SUPERFORECASTER_SYSTEM_PROMPT: &str = "You are a superforecaster. \
Weigh base rates and current evidence, then give a probability estimate with \
brief reasoning.";

pub struct LlmGatewayClient {
    http: Client,
    cfg: AgentConfig,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: String,
}

impl LlmGatewayClient {
    pub fn new(cfg: &AgentConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent("polyagent/0.1")
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| {
                PolyagentError::Internal(format!("failed to build gateway HTTP client: {e}"))
            })?;

        Ok(Self {
            http,
            cfg: cfg.clone(),
            api_key: std::env::var(&cfg.api_key_env).ok(),
        })
    }

    /// One chat completion with client-level bounded retries.
    async fn chat(&self, system: &str, user: &str) -> Result<String> {
        let mut attempts = 0;
        let mut last_error = None;

        while attempts < self.cfg.max_retries.max(1) {
            attempts += 1;

            match self.execute_chat(system, user).await {
                Ok(content) => return Ok(content),
                Err(e) => {
                    warn!("Gateway query attempt {attempts} failed: {e}");
                    last_error = Some(e);
                    if attempts < self.cfg.max_retries {
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| PolyagentError::Agent("gateway query failed".to_string())))
    }

    async fn execute_chat(&self, system: &str, user: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.cfg.base_url.trim_end_matches('/'));
        let request = ChatRequest {
            model: &self.cfg.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.cfg.temperature,
            max_tokens: self.cfg.max_tokens,
        };

        let mut builder = self.http.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response: ChatResponse = builder
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| PolyagentError::Agent("gateway returned no choices".to_string()))?;

        debug!("Gateway response: {:.100}...", content);
        Ok(content)
    }

    async fn chat_json(&self, system: &str, user: &str) -> Result<Value> {
        let text = self.chat(system, user).await?;
        let payload = extract_json(&text);
        serde_json::from_str(payload)
            .map_err(|e| PolyagentError::Agent(format!("unparseable gateway reply: {e}")))
    }
}

#[async_trait]
impl ReasoningAgent for LlmGatewayClient {
    async fn filter_events_by_relevance(&self, events: &[Event]) -> Result<Value> {
        let user = format!(
            "Keep the events likely to offer a profitable trade this week.\n{}",
            to_document(&events)
        );
        self.chat_json(FILTER_SYSTEM_PROMPT, &user).await
    }

    async fn map_events_to_markets(&self, events: &[Event]) -> Result<Vec<Market>> {
        // Events embed their markets; expansion is local, no reasoning call.
        Ok(events
            .iter()
            .flat_map(|event| event.markets.iter().cloned())
            .collect())
    }

    async fn filter_markets_by_quality(&self, markets: &[Market]) -> Result<Value> {
        let user = format!(
            "Keep the markets with clear resolution criteria and real liquidity.\n{}",
            to_document(&markets)
        );
        self.chat_json(FILTER_SYSTEM_PROMPT, &user).await
    }

    async fn select_best_trade(&self, market: &Market) -> Result<TradeDecision> {
        let text = self
            .chat(TRADE_SYSTEM_PROMPT, &to_document(market).to_string())
            .await?;
        Ok(parse_trade_decision(&text))
    }

    async fn select_best_market_idea(&self, markets: &[Market]) -> Result<String> {
        let user = to_document(&markets).to_string();
        self.chat(CREATOR_SYSTEM_PROMPT, &user).await
    }

    async fn ask(&self, question: &str) -> Result<String> {
        self.chat("You are a helpful prediction-market assistant.", question)
            .await
    }

    async fn ask_with_markets(&self, question: &str, markets: &[Market]) -> Result<String> {
        let user = format!(
            "Question: {question}\n\nCurrent markets:\n{}",
            to_document(&markets)
        );
        self.chat("You are a helpful prediction-market assistant.", &user)
            .await
    }

    async fn superforecast(
        &self,
        event_title: &str,
        market_question: &str,
        outcome: &str,
    ) -> Result<String> {
        let user = format!(
            "Event: {event_title}\nQuestion: {market_question}\nOutcome under consideration: {outcome}"
        );
        self.chat(SUPERFORECASTER_SYSTEM_PROMPT, &user).await
    }
}

/// Extract JSON from a reply that may wrap it in markdown code blocks or
/// surrounding prose. Falls back to the trimmed text.
fn extract_json(text: &str) -> &str {
    if let Some(start) = text.find("```json") {
        if let Some(end) = text[start + 7..].find("```") {
            return text[start + 7..start + 7 + end].trim();
        }
    }

    if let Some(start) = text.find("```") {
        if let Some(end) = text[start + 3..].find("```") {
            let content = text[start + 3..start + 3 + end].trim();
            if let Some(newline) = content.find('\n') {
                return content[newline + 1..].trim();
            }
            return content;
        }
    }

    // Raw object or array
    let object = text.find('{').and_then(|s| text.rfind('}').map(|e| (s, e)));
    let array = text.find('[').and_then(|s| text.rfind(']').map(|e| (s, e)));
    let span = match (object, array) {
        (Some(o), Some(a)) => Some(if a.0 < o.0 { a } else { o }),
        (Some(o), None) => Some(o),
        (None, Some(a)) => Some(a),
        (None, None) => None,
    };
    if let Some((start, end)) = span {
        if start < end {
            return &text[start..=end];
        }
    }

    text.trim()
}

/// Parse a trade decision, degrading to a rationale-only decision when the
/// reply is not the requested JSON shape.
fn parse_trade_decision(text: &str) -> TradeDecision {
    let payload = extract_json(text);
    match serde_json::from_str::<TradeDecision>(payload) {
        Ok(mut decision) => {
            decision.raw = Some(text.to_string());
            decision
        }
        Err(e) => {
            warn!("Trade decision was not valid JSON ({e}), keeping raw text");
            TradeDecision {
                rationale: Some(text.trim().to_string()),
                raw: Some(text.to_string()),
                ..Default::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn extract_json_from_code_block() {
        let text = "Here's my analysis:\n\n```json\n{\"side\": \"yes\"}\n```\n\nDone.";
        let json = extract_json(text);
        assert!(json.starts_with('{'));
        assert!(json.contains("side"));
    }

    #[test]
    fn extract_json_finds_raw_array() {
        let text = "Keeping two: [{\"id\": \"1\"}, {\"id\": \"2\"}] as requested";
        let json = extract_json(text);
        assert!(json.starts_with('['));
        assert!(json.ends_with(']'));
        assert!(serde_json::from_str::<Value>(json).is_ok());
    }

    #[test]
    fn parse_decision_reads_schema_reply() {
        let decision =
            parse_trade_decision(r#"{"market_id": "9", "side": "no", "size_usd": 3, "rationale": "overpriced"}"#);
        assert_eq!(decision.market_id.as_deref(), Some("9"));
        assert_eq!(decision.amount(), dec!(3));
    }

    #[test]
    fn parse_decision_degrades_to_raw_text() {
        let decision = parse_trade_decision("I would buy YES here, it looks cheap.");
        assert!(decision.market_id.is_none());
        assert_eq!(decision.amount(), dec!(1));
        assert!(decision.rationale.unwrap().contains("buy YES"));
    }
}
