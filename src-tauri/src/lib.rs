pub mod config;
pub mod dispatch;
pub mod providers;
pub mod shortcuts;
pub mod state;
pub mod storage;

#[cfg(feature = "desktop")]
mod commands;
#[cfg(feature = "desktop")]
mod shell;

#[cfg(feature = "desktop")]
const SETTINGS_FILE: &str = "settings.db";

#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
  use tauri::Manager;
  use tauri_plugin_global_shortcut::ShortcutState;

  use crate::dispatch::Dispatcher;
  use crate::shell::{ShellContext, MAIN_WINDOW};
  use crate::state::ChatState;
  use crate::storage::SettingsStore;

  let app = tauri::Builder::default()
    .plugin(
      tauri_plugin_global_shortcut::Builder::new()
        .with_handler(|app, shortcut, event| {
          if matches!(event.state(), ShortcutState::Pressed) {
            if let Some(shell) = app.try_state::<ShellContext>() {
              shell.handle_shortcut(app, shortcut);
            }
          }
        })
        .build(),
    )
    .setup(|app| {
      if cfg!(debug_assertions) {
        app.handle().plugin(
          tauri_plugin_log::Builder::default()
            .level(log::LevelFilter::Info)
            .build(),
        )?;
      }

      let data_dir = app.path().app_data_dir()?;
      std::fs::create_dir_all(&data_dir)?;
      let settings = SettingsStore::open(&data_dir.join(SETTINGS_FILE))?;
      app.manage(ChatState::new(Dispatcher::new()?, settings));

      let shell = ShellContext::new(MAIN_WINDOW)?;
      shell.attach(app.handle())?;
      app.manage(shell);
      Ok(())
    })
    .invoke_handler(tauri::generate_handler![
      commands::chat::send_message,
      commands::settings::settings_load,
      commands::settings::settings_save,
      commands::settings::provider_key_hint
    ])
    .build(tauri::generate_context!())
    .expect("error while building tauri application");

  app.run(|app, event| {
    if let tauri::RunEvent::Exit = event {
      if let Some(shell) = app.try_state::<ShellContext>() {
        shell.teardown(app);
      }
    }
  });
}
