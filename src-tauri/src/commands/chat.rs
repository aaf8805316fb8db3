use tauri::{AppHandle, Manager};

use crate::dispatch::DispatchResult;
use crate::state::ChatState;

/// The boundary call behind the UI's send button. Always resolves, failures
/// included.
#[tauri::command]
pub async fn send_message(
  app: AppHandle,
  message: String,
  api_key: String,
  provider: Option<String>,
) -> DispatchResult {
  let state = app.state::<ChatState>();
  state
    .send_message(&message, &api_key, provider.as_deref())
    .await
}
