use ratatui::crossterm::event::{self, KeyCode, KeyModifiers};

use crate::app::{App, Focus};

// --- Helpers ---

/// Convert a char index to a byte offset within the string.
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
  s.char_indices().nth(char_idx).map_or(s.len(), |(i, _)| i)
}

// --- Event Handling ---

pub fn handle_key_event(app: &mut App, key: event::KeyEvent) {
  let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

  if ctrl && key.code == KeyCode::Char('c') {
    app.should_quit = true;
    return;
  }

  // Any other key skips the splash.
  if app.splash.is_some() {
    app.dismiss_splash();
    return;
  }

  if ctrl {
    match key.code {
      KeyCode::Char('d') => app.download(),
      KeyCode::Char('r') => app.reset(),
      KeyCode::Char('x') => app.hide_toast(),
      _ => {}
    }
    return;
  }

  match app.focus {
    Focus::Input => handle_input_key(app, key),
    Focus::Video => handle_video_key(app, key),
  }
}

fn handle_input_key(app: &mut App, key: event::KeyEvent) {
  // The form is disabled while a lookup is in flight.
  if app.controller.phase().is_loading() {
    if key.code == KeyCode::Esc {
      app.reset();
    }
    return;
  }

  match key.code {
    KeyCode::Enter => {
      app.submit();
    }
    KeyCode::Char(c) => {
      let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
      app.input.insert(byte_idx, c);
      app.cursor_position += 1;
    }
    KeyCode::Backspace => {
      if app.cursor_position > 0 {
        app.cursor_position -= 1;
        let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
        app.input.remove(byte_idx);
      }
    }
    KeyCode::Delete => {
      if app.cursor_position < app.input.chars().count() {
        let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
        app.input.remove(byte_idx);
      }
    }
    KeyCode::Left => {
      app.cursor_position = app.cursor_position.saturating_sub(1);
    }
    KeyCode::Right => {
      if app.cursor_position < app.input.chars().count() {
        app.cursor_position += 1;
      }
    }
    KeyCode::Home => {
      app.cursor_position = 0;
    }
    KeyCode::End => {
      app.cursor_position = app.input.chars().count();
    }
    KeyCode::Esc => {
      if !app.input.is_empty() {
        app.input.clear();
        app.cursor_position = 0;
        app.input_scroll = 0;
      } else if app.controller.metadata().is_some() {
        app.focus = Focus::Video;
      } else {
        app.should_quit = true;
      }
    }
    KeyCode::Down | KeyCode::Tab => {
      if app.controller.metadata().is_some() {
        app.focus = Focus::Video;
      }
    }
    _ => {}
  }
}

fn handle_video_key(app: &mut App, key: event::KeyEvent) {
  match key.code {
    KeyCode::Enter | KeyCode::Char('d') => {
      app.download();
    }
    KeyCode::Char('r') => {
      app.reset();
    }
    KeyCode::Char('q') => {
      app.should_quit = true;
    }
    KeyCode::Esc | KeyCode::Up | KeyCode::Tab | KeyCode::Char('/') => {
      app.focus = Focus::Input;
    }
    _ => {}
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::app::tests::{sample_video, test_app};
  use crate::lifecycle::Phase;
  use crate::splash::Splash;
  use event::KeyEvent;
  use std::time::Instant;

  fn press(app: &mut App, code: KeyCode) {
    handle_key_event(app, KeyEvent::new(code, KeyModifiers::NONE));
  }

  fn ctrl(app: &mut App, c: char) {
    handle_key_event(app, KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL));
  }

  // --- char_to_byte_index ---

  #[test]
  fn char_to_byte_ascii() {
    assert_eq!(char_to_byte_index("hello", 0), 0);
    assert_eq!(char_to_byte_index("hello", 3), 3);
    assert_eq!(char_to_byte_index("hello", 5), 5); // past end
  }

  #[test]
  fn char_to_byte_multibyte() {
    let s = "aé日"; // a=1 byte, é=2 bytes, 日=3 bytes
    assert_eq!(char_to_byte_index(s, 0), 0);
    assert_eq!(char_to_byte_index(s, 1), 1);
    assert_eq!(char_to_byte_index(s, 2), 3);
    assert_eq!(char_to_byte_index(s, 3), 6); // past end
  }

  #[test]
  fn char_to_byte_empty() {
    assert_eq!(char_to_byte_index("", 0), 0);
    assert_eq!(char_to_byte_index("", 5), 0);
  }

  // --- key handling ---

  #[test]
  fn typing_edits_at_cursor() {
    let mut app = test_app();
    for c in "htp".chars() {
      press(&mut app, KeyCode::Char(c));
    }
    press(&mut app, KeyCode::Left);
    press(&mut app, KeyCode::Char('t'));
    assert_eq!(app.input, "http");
    press(&mut app, KeyCode::End);
    press(&mut app, KeyCode::Backspace);
    assert_eq!(app.input, "htt");
    press(&mut app, KeyCode::Home);
    press(&mut app, KeyCode::Delete);
    assert_eq!(app.input, "tt");
    assert_eq!(app.cursor_position, 0);
  }

  #[test]
  fn enter_on_blank_input_warns() {
    let mut app = test_app();
    press(&mut app, KeyCode::Enter);
    assert_eq!(app.toast.as_ref().unwrap().message, "Please enter a valid URL");
  }

  #[test]
  fn input_is_frozen_while_loading() {
    let mut app = test_app();
    app.input = "https://example.com".into();
    app.controller.force_phase(Phase::Fetching { previous: None });
    press(&mut app, KeyCode::Char('x'));
    press(&mut app, KeyCode::Backspace);
    assert_eq!(app.input, "https://example.com");
  }

  #[test]
  fn esc_clears_then_quits() {
    let mut app = test_app();
    app.input = "abc".into();
    app.cursor_position = 3;
    press(&mut app, KeyCode::Esc);
    assert!(app.input.is_empty());
    assert!(!app.should_quit);
    press(&mut app, KeyCode::Esc);
    assert!(app.should_quit);
  }

  #[test]
  fn focus_moves_between_panes_only_with_a_video() {
    let mut app = test_app();
    press(&mut app, KeyCode::Tab);
    assert_eq!(app.focus, Focus::Input);

    app.controller.force_phase(Phase::Ready { video: sample_video(), progress: 0.0 });
    press(&mut app, KeyCode::Tab);
    assert_eq!(app.focus, Focus::Video);
    press(&mut app, KeyCode::Esc);
    assert_eq!(app.focus, Focus::Input);
  }

  #[test]
  fn ctrl_r_resets() {
    let mut app = test_app();
    app.controller.force_phase(Phase::Failed { video: Some(sample_video()), error: "boom".into() });
    app.input = "https://example.com".into();
    ctrl(&mut app, 'r');
    assert!(app.input.is_empty());
    assert_eq!(app.controller.phase(), &Phase::Idle);
  }

  #[test]
  fn ctrl_x_closes_the_toast() {
    let mut app = test_app();
    press(&mut app, KeyCode::Enter);
    assert!(app.toast.is_some());
    ctrl(&mut app, 'x');
    assert!(app.toast.is_none());
    assert!(!app.should_quit);
  }

  #[test]
  fn download_without_video_is_ignored() {
    let mut app = test_app();
    ctrl(&mut app, 'd');
    assert_eq!(app.controller.phase(), &Phase::Idle);
  }

  #[test]
  fn any_key_skips_splash_but_ctrl_c_still_quits() {
    let mut app = test_app();
    app.splash = Some(Splash::new(Instant::now()));
    press(&mut app, KeyCode::Char('a'));
    assert!(app.splash.is_none());
    assert!(app.input.is_empty());

    app.splash = Some(Splash::new(Instant::now()));
    ctrl(&mut app, 'c');
    assert!(app.should_quit);
  }
}
