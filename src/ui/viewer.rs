use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::app::App;
use crate::ui::renderfns::{media_icon, status_color, status_label, truncate};

/// Max carousel children listed before eliding the rest
const MAX_CHILDREN: usize = 5;

/// Draw the full-size viewer as a modal over the grid
pub fn draw_viewer(frame: &mut Frame, area: Rect, app: &App) {
  let (Some(tile), Some((position, count))) = (app.current_tile(), app.viewer_position()) else {
    return;
  };
  let post = &tile.item.post;

  let modal = centered(area, 80, 80);
  frame.render_widget(Clear, modal);

  let block = Block::default()
    .title(format!(" Post {}/{} ", position, count))
    .title_alignment(Alignment::Center)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Cyan));
  let inner = block.inner(modal);
  frame.render_widget(block, modal);

  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(5), // Metadata
      Constraint::Length(1), // Separator
      Constraint::Min(1),    // Caption and children
      Constraint::Length(1), // Navigation hints
    ])
    .split(inner);

  let width = chunks[0].width.saturating_sub(12) as usize;
  let label = Style::default().fg(Color::DarkGray);
  let published = post
    .published_at()
    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
    .unwrap_or_else(|| "-".to_string());

  let meta = vec![
    Line::from(vec![
      Span::styled("Type:      ", label),
      Span::raw(format!(
        "{} {}",
        media_icon(post.media_type),
        post.media_type.label()
      )),
    ]),
    Line::from(vec![
      Span::styled("Media:     ", label),
      Span::raw(truncate(tile.display_url(), width)),
    ]),
    Line::from(vec![
      Span::styled("Status:    ", label),
      Span::styled(
        status_label(tile.status, tile.item.source),
        Style::default().fg(status_color(tile.status)),
      ),
    ]),
    Line::from(vec![
      Span::styled("Permalink: ", label),
      Span::raw(truncate(&post.permalink, width)),
    ]),
    Line::from(vec![
      Span::styled("Published: ", label),
      Span::raw(published),
    ]),
  ];
  frame.render_widget(Paragraph::new(meta), chunks[0]);

  let separator = "─".repeat(chunks[1].width as usize);
  frame.render_widget(
    Paragraph::new(separator).style(Style::default().fg(Color::DarkGray)),
    chunks[1],
  );

  let mut body: Vec<Line> = post
    .caption_or_default()
    .lines()
    .map(|l| Line::raw(l.to_string()))
    .collect();

  if !post.children.is_empty() {
    body.push(Line::raw(""));
    body.push(Line::styled(
      format!("Carousel ({} items)", post.children.len()),
      Style::default().fg(Color::Yellow),
    ));
    for child in post.children.iter().take(MAX_CHILDREN) {
      body.push(Line::from(vec![
        Span::raw(format!("  {} ", media_icon(child.media_type))),
        Span::styled(
          truncate(&child.display_url(), chunks[2].width.saturating_sub(4) as usize),
          label,
        ),
      ]));
    }
    if post.children.len() > MAX_CHILDREN {
      body.push(Line::styled(
        format!("  ... {} more", post.children.len() - MAX_CHILDREN),
        label,
      ));
    }
  }
  frame.render_widget(Paragraph::new(body).wrap(Wrap { trim: false }), chunks[2]);

  frame.render_widget(navigation_hints(app.can_previous(), app.can_next()), chunks[3]);
}

fn navigation_hints(can_previous: bool, can_next: bool) -> Paragraph<'static> {
  let key = Style::default().fg(Color::Cyan);
  let text = Style::default().fg(Color::DarkGray);

  let mut spans = Vec::new();
  if can_previous {
    spans.push(Span::styled("<←>", key));
    spans.push(Span::styled(" previous   ", text));
  }
  if can_next {
    spans.push(Span::styled("<→>", key));
    spans.push(Span::styled(" next   ", text));
  }
  spans.push(Span::styled("<esc>", key));
  spans.push(Span::styled(" close", text));

  Paragraph::new(Line::from(spans)).alignment(Alignment::Center)
}

/// Rect of the given percentage size centered in `area`
fn centered(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
  let width = area.width * percent_x / 100;
  let height = area.height * percent_y / 100;
  Rect::new(
    area.x + (area.width - width) / 2,
    area.y + (area.height - height) / 2,
    width,
    height,
  )
}
