use crate::providers::{ProviderId, ProviderTable};

const ENV_PREFIX: &str = "AI_CHAT";

/// Built-in provider table with any environment overrides applied.
pub fn provider_table() -> ProviderTable {
  apply_overrides(ProviderTable::default(), |key| std::env::var(key).ok())
}

fn apply_overrides<F>(mut table: ProviderTable, lookup: F) -> ProviderTable
where
  F: Fn(&str) -> Option<String>,
{
  for id in ProviderId::ALL {
    let config = table.get_mut(id);
    if let Some(endpoint) = parse_override(lookup(&override_key(id, "ENDPOINT")).as_deref()) {
      config.endpoint_url = endpoint;
    }
    if let Some(model) = parse_override(lookup(&override_key(id, "MODEL")).as_deref()) {
      config.model_id = model;
    }
  }
  table
}

/// `AI_CHAT_<PROVIDER>_<FIELD>`, e.g. `AI_CHAT_OPENROUTER_ENDPOINT`.
fn override_key(id: ProviderId, field: &str) -> String {
  format!("{}_{}_{}", ENV_PREFIX, id.as_str().to_ascii_uppercase(), field)
}

fn parse_override(value: Option<&str>) -> Option<String> {
  value.and_then(|raw| {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
      None
    } else {
      Some(trimmed.to_string())
    }
  })
}
