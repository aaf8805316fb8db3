use serde_json::Value;

pub const TEMPERATURE: f64 = 0.7;
pub const MAX_TOKENS: u32 = 1024;

pub struct ChatRequest<'a> {
  pub model: &'a str,
  pub prompt: &'a str,
}

/// OpenAI-style chat-completion body shared by every provider.
pub fn build_request(req: &ChatRequest<'_>) -> Value {
  serde_json::json!({
    "model": req.model,
    "messages": [{ "role": "user", "content": req.prompt }],
    "temperature": TEMPERATURE,
    "max_tokens": MAX_TOKENS
  })
}
