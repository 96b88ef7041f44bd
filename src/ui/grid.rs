use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::app::{App, FeedState, GridLayout, Tile};
use crate::ui::renderfns::{first_line, media_icon, status_color, status_label, truncate};

const TILE_WIDTH: u16 = 28;
const TILE_HEIGHT: u16 = 5;

/// Draw the post grid, or the loading/empty/error state in its place.
pub fn draw_grid(frame: &mut Frame, area: Rect, app: &mut App) {
  let block = Block::default()
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Blue));

  let message = match app.feed_state() {
    FeedState::Loading => Some(("Loading posts...".to_string(), Color::DarkGray)),
    FeedState::Empty(msg) => Some((msg.clone(), Color::DarkGray)),
    FeedState::Failed(msg) => Some((
      format!("Error loading posts: {}\nPress 'r' to retry.", msg),
      Color::Red,
    )),
    FeedState::Ready => None,
  };

  if let Some((text, color)) = message {
    let paragraph = Paragraph::new(text)
      .block(block)
      .wrap(Wrap { trim: true })
      .style(Style::default().fg(color));
    frame.render_widget(paragraph, area);
    return;
  }

  let inner = block.inner(area);
  frame.render_widget(block, area);

  let layout = compute_layout(inner, app.selected(), app.layout());
  app.set_layout(layout);

  let trailing_slot = app.shows_load_more() || app.shows_sentinel();
  let slots = app.tiles().len() + usize::from(trailing_slot);

  for row in layout.first_row..layout.first_row + layout.visible_rows {
    for col in 0..layout.columns {
      let index = row * layout.columns + col;
      if index >= slots {
        return;
      }

      let cell = Rect::new(
        inner.x + col as u16 * TILE_WIDTH,
        inner.y + (row - layout.first_row) as u16 * TILE_HEIGHT,
        TILE_WIDTH,
        TILE_HEIGHT,
      )
      .intersection(inner);

      let selected = index == app.selected();
      match app.tiles().get(index) {
        Some(tile) => draw_tile(frame, cell, tile, selected),
        None if app.shows_load_more() => {
          draw_load_more(frame, cell, app.next_batch_size(), selected)
        }
        None => draw_sentinel(frame, cell),
      }
    }
  }
}

/// Fit the grid to the area and scroll just enough to keep the selection
/// on screen.
fn compute_layout(area: Rect, selected: usize, previous: GridLayout) -> GridLayout {
  let columns = usize::from((area.width / TILE_WIDTH).max(1));
  let visible_rows = usize::from((area.height / TILE_HEIGHT).max(1));
  let selected_row = selected / columns;

  // Column count changed on resize; previous offset is meaningless
  let mut first_row = if previous.columns == columns {
    previous.first_row
  } else {
    0
  };
  if selected_row < first_row {
    first_row = selected_row;
  } else if selected_row >= first_row + visible_rows {
    first_row = selected_row + 1 - visible_rows;
  }

  GridLayout {
    columns,
    first_row,
    visible_rows,
  }
}

fn tile_block(title: String, selected: bool) -> Block<'static> {
  let border = if selected { Color::Cyan } else { Color::DarkGray };
  let block = Block::default()
    .borders(Borders::ALL)
    .border_style(Style::default().fg(border))
    .title(title);
  if selected {
    block.title_style(Style::default().bold())
  } else {
    block
  }
}

fn draw_tile(frame: &mut Frame, area: Rect, tile: &Tile, selected: bool) {
  let post = &tile.item.post;
  let width = area.width.saturating_sub(2) as usize;

  let title = format!(
    " {} {} ",
    media_icon(post.media_type),
    truncate(&post.id, width.saturating_sub(4))
  );

  let mut status = vec![Span::styled(
    status_label(tile.status, tile.item.source),
    Style::default().fg(status_color(tile.status)),
  )];
  if !post.children.is_empty() {
    status.push(Span::styled(
      format!("  {} items", post.children.len()),
      Style::default().fg(Color::DarkGray),
    ));
  }

  let lines = vec![
    Line::from(truncate(first_line(post.caption_or_default()), width)),
    Line::from(status),
    Line::styled(
      truncate(tile.display_url(), width),
      Style::default().fg(Color::DarkGray),
    ),
  ];

  let paragraph = Paragraph::new(lines).block(tile_block(title, selected));
  frame.render_widget(paragraph, area);
}

fn draw_load_more(frame: &mut Frame, area: Rect, next: usize, selected: bool) {
  let paragraph = Paragraph::new(vec![
    Line::styled("Load more", Style::default().fg(Color::Cyan).bold()),
    Line::styled(
      format!("next {} posts", next),
      Style::default().fg(Color::DarkGray),
    ),
  ])
  .alignment(Alignment::Center)
  .block(tile_block(String::new(), selected));
  frame.render_widget(paragraph, area);
}

fn draw_sentinel(frame: &mut Frame, area: Rect) {
  let paragraph = Paragraph::new(vec![
    Line::raw(""),
    Line::styled("Loading more...", Style::default().fg(Color::DarkGray)),
  ])
  .alignment(Alignment::Center);
  frame.render_widget(paragraph, area);
}
