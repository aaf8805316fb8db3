use tauri::State;

use crate::providers::ProviderId;
use crate::state::ChatState;
use crate::storage::StoredSettings;

#[tauri::command]
pub fn settings_load(state: State<ChatState>) -> Result<StoredSettings, String> {
  state.load_settings()
}

#[tauri::command]
pub fn settings_save(
  state: State<ChatState>,
  api_key: Option<String>,
  provider: Option<String>,
) -> Result<StoredSettings, String> {
  state.save_settings(api_key.as_deref(), provider.as_deref())
}

#[tauri::command]
pub fn provider_key_hint(provider: Option<String>) -> &'static str {
  ProviderId::from_id(provider.as_deref()).key_hint()
}
