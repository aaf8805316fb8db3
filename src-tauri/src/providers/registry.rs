use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

const GROQ_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";
const GROQ_MODEL: &str = "llama-3.3-70b-versatile";
const OPENROUTER_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";
const OPENROUTER_MODEL: &str = "google/gemini-2.0-flash-exp:free";
const OPENROUTER_REFERER: &str = "http://localhost";
const OPENROUTER_TITLE: &str = "AI Chat";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
  #[default]
  Groq,
  OpenRouter,
}

impl ProviderId {
  pub const ALL: [ProviderId; 2] = [ProviderId::Groq, ProviderId::OpenRouter];

  pub fn as_str(&self) -> &'static str {
    match self {
      ProviderId::Groq => "groq",
      ProviderId::OpenRouter => "openrouter",
    }
  }

  /// Unknown or missing identifiers select Groq.
  pub fn from_id(raw: Option<&str>) -> Self {
    let Some(raw) = raw.map(|value| value.trim().to_ascii_lowercase()) else {
      return ProviderId::default();
    };
    ProviderId::ALL
      .into_iter()
      .find(|id| id.as_str() == raw)
      .unwrap_or_default()
  }

  /// Placeholder shown in the API key field while this provider is selected.
  pub fn key_hint(&self) -> &'static str {
    match self {
      ProviderId::Groq => "Enter your Groq API key (get free key at console.groq.com)",
      ProviderId::OpenRouter => {
        "Enter your OpenRouter API key (get free key at openrouter.ai)"
      }
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderConfig {
  pub endpoint_url: String,
  pub model_id: String,
  pub extra_headers: BTreeMap<String, String>,
}

/// Built-in configuration for `id`.
pub fn resolve(id: ProviderId) -> ProviderConfig {
  match id {
    ProviderId::Groq => ProviderConfig {
      endpoint_url: GROQ_ENDPOINT.into(),
      model_id: GROQ_MODEL.into(),
      extra_headers: BTreeMap::new(),
    },
    ProviderId::OpenRouter => ProviderConfig {
      endpoint_url: OPENROUTER_ENDPOINT.into(),
      model_id: OPENROUTER_MODEL.into(),
      extra_headers: BTreeMap::from([
        ("HTTP-Referer".to_string(), OPENROUTER_REFERER.to_string()),
        ("X-Title".to_string(), OPENROUTER_TITLE.to_string()),
      ]),
    },
  }
}

/// The provider mapping a dispatcher resolves against.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderTable {
  configs: BTreeMap<ProviderId, ProviderConfig>,
}

impl Default for ProviderTable {
  fn default() -> Self {
    Self {
      configs: ProviderId::ALL.into_iter().map(|id| (id, resolve(id))).collect(),
    }
  }
}

impl ProviderTable {
  pub fn get(&self, id: ProviderId) -> Cow<'_, ProviderConfig> {
    self
      .configs
      .get(&id)
      .map(Cow::Borrowed)
      .unwrap_or_else(|| Cow::Owned(resolve(id)))
  }

  pub fn get_mut(&mut self, id: ProviderId) -> &mut ProviderConfig {
    self.configs.entry(id).or_insert_with(|| resolve(id))
  }

  pub fn with_endpoint(mut self, id: ProviderId, endpoint_url: impl Into<String>) -> Self {
    self.get_mut(id).endpoint_url = endpoint_url.into();
    self
  }
}
