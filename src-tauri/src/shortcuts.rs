#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellShortcut {
  ToggleMinimize,
  Summon,
}

impl ShellShortcut {
  pub const ALL: [ShellShortcut; 2] = [ShellShortcut::ToggleMinimize, ShellShortcut::Summon];

  pub fn accelerator(&self) -> &'static str {
    match self {
      ShellShortcut::ToggleMinimize => "CommandOrControl+M",
      ShellShortcut::Summon => "CommandOrControl+N",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowOp {
  Minimize,
  Restore,
  Show,
  Focus,
  PinOnTop,
}

/// Window operations for `shortcut`, in the order they must be applied.
pub fn plan(shortcut: ShellShortcut, minimized: bool) -> Vec<WindowOp> {
  match shortcut {
    ShellShortcut::ToggleMinimize if minimized => vec![WindowOp::Restore, WindowOp::Focus],
    ShellShortcut::ToggleMinimize => vec![WindowOp::Minimize],
    ShellShortcut::Summon => {
      let mut ops = Vec::with_capacity(4);
      if minimized {
        ops.push(WindowOp::Restore);
      }
      ops.extend([WindowOp::Show, WindowOp::Focus, WindowOp::PinOnTop]);
      ops
    }
  }
}
