use std::sync::Mutex;

use crate::dispatch::{DispatchRequest, DispatchResult, Dispatcher};
use crate::providers::ProviderId;
use crate::storage::{SettingsStore, StoredSettings};

/// State shared by the boundary commands.
pub struct ChatState {
  dispatcher: Dispatcher,
  settings: Mutex<SettingsStore>,
}

impl ChatState {
  pub fn new(dispatcher: Dispatcher, settings: SettingsStore) -> Self {
    Self {
      dispatcher,
      settings: Mutex::new(settings),
    }
  }

  /// Validates the raw boundary arguments and runs one dispatch.
  pub async fn send_message(
    &self,
    message: &str,
    api_key: &str,
    provider: Option<&str>,
  ) -> DispatchResult {
    let provider = ProviderId::from_id(provider);
    let request = match DispatchRequest::new(message, api_key, provider) {
      Ok(request) => request,
      Err(err) => {
        log::warn!("rejected message before dispatch: {}", err);
        return DispatchResult::Failure {
          reason: err.to_string(),
        };
      }
    };
    self.dispatcher.dispatch(&request).await
  }

  pub fn load_settings(&self) -> Result<StoredSettings, String> {
    self
      .settings
      .lock()
      .expect("settings lock")
      .load()
      .map_err(|e| e.to_string())
  }

  pub fn save_settings(
    &self,
    api_key: Option<&str>,
    provider: Option<&str>,
  ) -> Result<StoredSettings, String> {
    let store = self.settings.lock().expect("settings lock");
    if let Some(api_key) = api_key {
      store.save_api_key(api_key.trim()).map_err(|e| e.to_string())?;
    }
    if provider.is_some() {
      store
        .save_provider(ProviderId::from_id(provider))
        .map_err(|e| e.to_string())?;
    }
    store.load().map_err(|e| e.to_string())
  }
}
