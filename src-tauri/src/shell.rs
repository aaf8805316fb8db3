use tauri::{AppHandle, Manager, Runtime, WebviewWindow, WindowEvent};
use tauri_plugin_global_shortcut::{GlobalShortcutExt, Shortcut};

use crate::shortcuts::{self, ShellShortcut, WindowOp};

pub const MAIN_WINDOW: &str = "main";

/// Lifecycle state of the single chat window: which window we drive and
/// which global shortcuts we registered for it.
pub struct ShellContext {
  window_label: String,
  shortcuts: Vec<(ShellShortcut, Shortcut)>,
}

impl ShellContext {
  pub fn new(window_label: &str) -> Result<Self, String> {
    let shortcuts = ShellShortcut::ALL
      .iter()
      .map(|kind| {
        kind
          .accelerator()
          .parse::<Shortcut>()
          .map(|shortcut| (*kind, shortcut))
          .map_err(|e| format!("invalid shortcut {}: {}", kind.accelerator(), e))
      })
      .collect::<Result<Vec<_>, _>>()?;
    Ok(Self {
      window_label: window_label.to_string(),
      shortcuts,
    })
  }

  fn window<R: Runtime>(&self, app: &AppHandle<R>) -> Option<WebviewWindow<R>> {
    app.get_webview_window(&self.window_label)
  }

  /// Pins the window above others, keeps it pinned after focus loss and
  /// registers the global shortcuts.
  pub fn attach<R: Runtime>(&self, app: &AppHandle<R>) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(window) = self.window(app) {
      window.set_always_on_top(true)?;
      let pinned = window.clone();
      window.on_window_event(move |event| {
        if let WindowEvent::Focused(false) = event {
          if let Err(err) = pinned.set_always_on_top(true) {
            log::warn!("failed to re-pin window: {}", err);
          }
        }
      });
    } else {
      log::warn!("window {} not found, skipping pin", self.window_label);
    }

    for (kind, shortcut) in &self.shortcuts {
      app.global_shortcut().register(*shortcut)?;
      log::info!("registered {}", kind.accelerator());
    }
    Ok(())
  }

  pub fn handle_shortcut<R: Runtime>(&self, app: &AppHandle<R>, pressed: &Shortcut) {
    let Some(kind) = self
      .shortcuts
      .iter()
      .find(|(_, shortcut)| shortcut == pressed)
      .map(|(kind, _)| *kind)
    else {
      return;
    };
    let Some(window) = self.window(app) else {
      return;
    };

    let minimized = window.is_minimized().unwrap_or(false);
    for op in shortcuts::plan(kind, minimized) {
      if let Err(err) = apply(&window, op) {
        log::warn!("{:?} failed for {}: {}", op, kind.accelerator(), err);
      }
    }
  }

  pub fn teardown<R: Runtime>(&self, app: &AppHandle<R>) {
    if let Err(err) = app.global_shortcut().unregister_all() {
      log::warn!("failed to unregister shortcuts: {}", err);
    }
  }
}

fn apply<R: Runtime>(window: &WebviewWindow<R>, op: WindowOp) -> tauri::Result<()> {
  match op {
    WindowOp::Minimize => window.minimize(),
    WindowOp::Restore => window.unminimize(),
    WindowOp::Show => window.show(),
    WindowOp::Focus => window.set_focus(),
    WindowOp::PinOnTop => window.set_always_on_top(true),
  }
}
