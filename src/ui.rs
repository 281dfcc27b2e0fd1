use ratatui::{
  Frame,
  layout::{Alignment, Constraint, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, BorderType, Clear, Gauge, Padding, Paragraph, Wrap},
};
use std::time::Instant;

use crate::app::{App, Focus};
use crate::lifecycle::Snapshot;
use crate::model::VideoMetadata;
use crate::splash::Splash;
use crate::toast::{Toast, ToastKind};

// --- Palette ---

const BG: Color = Color::Rgb(30, 30, 46);
const SURFACE: Color = Color::Rgb(49, 50, 68);
const FG: Color = Color::Rgb(205, 214, 244);
const MUTED: Color = Color::Rgb(127, 132, 156);
const BORDER: Color = Color::Rgb(88, 91, 112);
const ACCENT: Color = Color::Rgb(203, 166, 247);
const STATUS: Color = Color::Rgb(137, 180, 250);
const SUCCESS: Color = Color::Rgb(166, 227, 161);
const WARNING: Color = Color::Rgb(249, 226, 175);
const ERROR: Color = Color::Rgb(243, 139, 168);

// --- Helpers ---

/// Compute the display width of the first `n` chars (accounting for double-width CJK).
pub fn display_width(s: &str, n: usize) -> usize {
  use unicode_width::UnicodeWidthChar;
  s.chars().take(n).map(|c| c.width().unwrap_or(0)).sum()
}

/// Truncate a string to `max_width` characters, appending "…" if truncated.
fn truncate_str(s: &str, max_width: usize) -> String {
  if s.chars().count() <= max_width {
    s.to_string()
  } else {
    let truncated: String = s.chars().take(max_width.saturating_sub(1)).collect();
    format!("{}…", truncated)
  }
}

fn rounded(border: Color) -> Block<'static> {
  Block::bordered().border_type(BorderType::Rounded).border_style(Style::default().fg(border))
}

// --- UI Rendering ---

pub fn ui(frame: &mut Frame, app: &mut App) {
  let area = frame.area();
  frame.render_widget(Block::default().style(Style::default().bg(BG)), area);

  if let Some(splash) = &app.splash {
    render_splash(frame, splash, Instant::now(), area);
    return;
  }

  let snapshot = app.controller.snapshot();
  let show_progress = snapshot.is_downloading || snapshot.progress > 0.0;
  let [header_area, main_area, progress_area, status_area, input_area, footer_area] = Layout::vertical([
    Constraint::Length(1),
    Constraint::Min(3),
    Constraint::Length(if show_progress { 3 } else { 0 }),
    Constraint::Length(1),
    Constraint::Length(3),
    Constraint::Length(1),
  ])
  .areas(area);

  render_header(frame, header_area);
  match &snapshot.metadata {
    Some(video) => render_video(frame, video, app.focus == Focus::Video, main_area),
    None => render_welcome(frame, main_area),
  }
  if show_progress {
    render_progress(frame, &snapshot, progress_area);
  }
  render_status(frame, app, &snapshot, status_area);
  render_input(frame, app, input_area);
  render_footer(frame, app, footer_area);

  if let Some(toast) = &app.toast {
    render_toast(frame, toast, area);
  }
}

fn render_splash(frame: &mut Frame, splash: &Splash, now: Instant, area: Rect) {
  let [_, center, _] = Layout::vertical([Constraint::Fill(1), Constraint::Length(7), Constraint::Fill(1)]).areas(area);
  let [_, center, _] =
    Layout::horizontal([Constraint::Fill(1), Constraint::Length(50.min(area.width)), Constraint::Fill(1)]).areas(center);
  let [title_area, _, gauge_area, caption_area] =
    Layout::vertical([Constraint::Length(2), Constraint::Length(1), Constraint::Length(3), Constraint::Length(1)])
      .areas(center);

  let title = vec![
    Line::from(Span::styled("▼  vdp", Style::default().fg(ACCENT).add_modifier(Modifier::BOLD))),
    Line::from(Span::styled("video downloader", Style::default().fg(MUTED))),
  ];
  frame.render_widget(Paragraph::new(title).alignment(Alignment::Center), title_area);

  let percent = splash.progress_at(now);
  let gauge = Gauge::default()
    .block(rounded(BORDER))
    .gauge_style(Style::default().fg(ACCENT).bg(SURFACE))
    .percent(percent)
    .label(format!("{}%", percent));
  frame.render_widget(gauge, gauge_area);

  let caption = Paragraph::new(splash.caption_at(now)).style(Style::default().fg(MUTED)).alignment(Alignment::Center);
  frame.render_widget(caption, caption_area);
}

fn render_header(frame: &mut Frame, area: Rect) {
  let left = Line::from(Span::styled(" ▼ vdp ", Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)));
  frame.render_widget(left, area);

  let version = format!("v{} ", env!("CARGO_PKG_VERSION"));
  let right = Line::from(Span::styled(&version, Style::default().fg(MUTED)));
  let version_w = (version.len() as u16).min(area.width);
  let right_area = Rect { x: area.x + area.width.saturating_sub(version_w), width: version_w, ..area };
  frame.render_widget(right, right_area);
}

fn render_welcome(frame: &mut Frame, area: Rect) {
  let text = vec![
    Line::from(""),
    Line::from(Span::styled("▼  Welcome to vdp", Style::default().fg(ACCENT).add_modifier(Modifier::BOLD))),
    Line::from(""),
    Line::from(Span::styled("Download videos from the terminal.", Style::default().fg(FG))),
    Line::from(""),
    Line::from(Span::styled("Paste a video URL below and press Enter.", Style::default().fg(MUTED))),
  ];
  let paragraph = Paragraph::new(text).alignment(Alignment::Center).block(rounded(BORDER));
  frame.render_widget(paragraph, area);
}

fn field<'a>(label: &'a str, value: &str, inner_w: usize) -> Line<'a> {
  let value_w = inner_w.saturating_sub(label.len());
  Line::from(vec![
    Span::styled(label, Style::default().fg(MUTED)),
    Span::styled(truncate_str(value, value_w), Style::default().fg(FG)),
  ])
}

fn render_video(frame: &mut Frame, video: &VideoMetadata, focused: bool, area: Rect) {
  let border = if focused { ACCENT } else { BORDER };
  let block = rounded(border)
    .title(Span::styled(format!(" {} ", video.source_name), Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)))
    .padding(Padding::horizontal(1));
  let inner_w = area.width.saturating_sub(4) as usize;

  let mut lines = vec![
    Line::from(""),
    Line::from(Span::styled(truncate_str(&video.title, inner_w), Style::default().fg(FG).add_modifier(Modifier::BOLD))),
    Line::from(""),
    field("Source    ", &video.source_name, inner_w),
  ];
  if let Some(duration) = &video.duration {
    lines.push(field("Duration  ", duration, inner_w));
  }
  if let Some(views) = &video.views {
    lines.push(field("Views     ", views, inner_w));
  }
  if let Some(description) = &video.description {
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(description.as_str(), Style::default().fg(FG))));
  }
  lines.push(Line::from(""));
  lines.push(Line::from(Span::styled(
    truncate_str(&video.url, inner_w),
    Style::default().fg(ACCENT).add_modifier(Modifier::UNDERLINED),
  )));
  lines.push(field("Thumbnail ", &video.thumbnail, inner_w));

  let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true }).block(block);
  frame.render_widget(paragraph, area);
}

fn render_progress(frame: &mut Frame, snapshot: &Snapshot, area: Rect) {
  let title = if snapshot.is_downloading { " Downloading… " } else { " Download complete " };
  let gauge = Gauge::default()
    .block(rounded(BORDER).title(Span::styled(title, Style::default().fg(STATUS))))
    .gauge_style(Style::default().fg(ACCENT).bg(SURFACE))
    .ratio((snapshot.progress / 100.0).clamp(0.0, 1.0))
    .label(format!("{}%", snapshot.progress.round() as u16));
  frame.render_widget(gauge, area);
}

fn render_status(frame: &mut Frame, app: &App, snapshot: &Snapshot, area: Rect) {
  let (text, style) = if snapshot.is_loading {
    (" ⏳ Fetching video info…".to_string(), Style::default().fg(STATUS))
  } else if snapshot.is_downloading {
    (format!(" ⏳ Downloading… {}%", snapshot.progress.round() as u16), Style::default().fg(STATUS))
  } else if let Some(err) = &snapshot.error {
    (format!(" ⚠  {}", err), Style::default().fg(ERROR))
  } else if let Some(path) = &app.last_saved {
    (format!(" ✔ Saved to {}", path.display()), Style::default().fg(SUCCESS))
  } else {
    (format!(" Ready · {}", app.controller.service().api_base()), Style::default().fg(MUTED))
  };
  frame.render_widget(Paragraph::new(text).style(style), area);
}

fn render_input(frame: &mut Frame, app: &mut App, area: Rect) {
  let focused = app.focus == Focus::Input;
  let border_color = if focused { ACCENT } else { BORDER };
  let mut input_block = rounded(border_color)
    .title(" Video URL ")
    .title_style(Style::default().fg(border_color))
    .padding(Padding::horizontal(1));
  if !app.input.trim().is_empty() {
    let dot = if app.input_is_valid_url() { SUCCESS } else { ERROR };
    input_block = input_block.title(Line::from(Span::styled(" ● ", Style::default().fg(dot))).right_aligned());
  }

  let inner_w = area.width.saturating_sub(4) as usize;
  let cursor_col = display_width(&app.input, app.cursor_position);

  if cursor_col < app.input_scroll {
    app.input_scroll = cursor_col;
  } else if cursor_col >= app.input_scroll + inner_w {
    app.input_scroll = cursor_col.saturating_sub(inner_w) + 1;
  }

  let visible: String = app
    .input
    .chars()
    .scan(0usize, |col, c| {
      let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
      let start = *col;
      *col += w;
      Some((start, *col, c))
    })
    .skip_while(|(_, end, _)| *end <= app.input_scroll)
    .take_while(|(start, _, _)| *start < app.input_scroll + inner_w)
    .map(|(_, _, c)| c)
    .collect();

  let fg = if app.controller.phase().is_loading() { MUTED } else { FG };
  let paragraph = Paragraph::new(visible).style(Style::default().fg(fg)).block(input_block);
  frame.render_widget(paragraph, area);

  if focused && inner_w > 0 && !app.controller.phase().is_loading() {
    let cursor_x = area.x + 2 + cursor_col.saturating_sub(app.input_scroll) as u16;
    frame.set_cursor_position((cursor_x, area.y + 1));
  }
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
  let has_video = app.controller.metadata().is_some();
  let keys: Vec<(&str, &str)> = match app.focus {
    Focus::Input => {
      let mut k = vec![("Enter", "Fetch")];
      if has_video {
        k.push(("^d", "Download"));
        k.push(("Tab", "Video"));
      }
      k.push(("^r", "Reset"));
      if !app.input.is_empty() {
        k.push(("Esc", "Clear"));
      } else if has_video {
        k.push(("Esc", "Video"));
      } else {
        k.push(("Esc", "Quit"));
      }
      k
    }
    Focus::Video => vec![("Enter", "Download"), ("r", "Reset"), ("Esc", "Edit URL"), ("q", "Quit")],
  };

  let spans: Vec<Span> = keys
    .iter()
    .enumerate()
    .flat_map(|(i, (key, action))| {
      let mut s = vec![
        Span::styled(format!(" {} ", key), Style::default().fg(BG).bg(ACCENT)),
        Span::styled(format!(" {} ", action), Style::default().fg(MUTED)),
      ];
      if i < keys.len() - 1 {
        s.push(Span::raw("  "));
      }
      s
    })
    .collect();

  frame.render_widget(Line::from(spans), area);

  let dir_label = format!("{} ", app.controller.service().download_dir().display());
  let label_w = display_width(&dir_label, usize::MAX) as u16;
  let right = Line::from(Span::styled(&dir_label, Style::default().fg(MUTED)));
  let right_area = Rect { x: area.x + area.width.saturating_sub(label_w), width: label_w.min(area.width), ..area };
  frame.render_widget(right, right_area);
}

fn render_toast(frame: &mut Frame, toast: &Toast, area: Rect) {
  let color = match toast.kind {
    ToastKind::Success => SUCCESS,
    ToastKind::Error => ERROR,
    ToastKind::Warning => WARNING,
  };
  let text = format!("{} {}", toast.kind.icon(), toast.message);
  let width = (display_width(&text, usize::MAX) as u16 + 4).max(24).min(area.width);
  let height = 3.min(area.height.saturating_sub(1));
  let rect = Rect { x: area.x + area.width.saturating_sub(width + 1), y: area.y + 1, width, height };

  frame.render_widget(Clear, rect);
  let paragraph = Paragraph::new(truncate_str(&text, width.saturating_sub(4) as usize))
    .style(Style::default().fg(color).bg(SURFACE))
    .block(rounded(color).padding(Padding::horizontal(1)));
  frame.render_widget(paragraph, rect);
}
