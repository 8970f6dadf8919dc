//! Key and mouse bindings
//!
//! Pure translation from crossterm events to `Action`s. Mouse drags and
//! clicks are ignored.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEventKind};

use super::app::{Action, AppEvent};

/// Decode one terminal event
pub fn translate(event: &Event) -> Option<AppEvent> {
    match event {
        Event::Key(key) => map_key(key).map(AppEvent::Input),
        Event::Mouse(mouse) => match mouse.kind {
            MouseEventKind::ScrollUp => Some(AppEvent::Input(Action::ZoomIn)),
            MouseEventKind::ScrollDown => Some(AppEvent::Input(Action::ZoomOut)),
            _ => None,
        },
        Event::Resize(_, _) => Some(AppEvent::Resize),
        _ => None,
    }
}

pub fn map_key(key: &KeyEvent) -> Option<Action> {
    // releases arrive on some terminals
    if key.kind == KeyEventKind::Release {
        return None;
    }
    match (key.code, key.modifiers) {
        (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Action::Quit),
        (KeyCode::Char('q'), _) => Some(Action::Quit),
        (KeyCode::Char('r'), _) => Some(Action::Refresh),
        (KeyCode::Char('i' | 'I' | '+'), _) => Some(Action::ZoomIn),
        (KeyCode::Char('o' | 'O' | '-'), _) => Some(Action::ZoomOut),
        (KeyCode::Left, _) => Some(Action::PanLeft),
        (KeyCode::Right, _) => Some(Action::PanRight),
        (KeyCode::Esc, _) => Some(Action::ResetView),
        (KeyCode::Up, _) => Some(Action::ScrollUp),
        (KeyCode::Down, _) => Some(Action::ScrollDown),
        _ => None,
    }
}
