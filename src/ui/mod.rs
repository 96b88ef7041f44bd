pub mod components;
mod grid;
pub mod renderfns;
mod viewer;

use crate::app::{App, Mode, Screen};
use ratatui::prelude::*;

/// Main draw function
pub fn draw(frame: &mut Frame, app: &mut App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Grid
      Constraint::Length(1), // Footer
    ])
    .split(frame.area());

  renderfns::draw_header(
    frame,
    chunks[0],
    &app.title(),
    app.revealed_count(),
    app.total_posts(),
    app.trigger_mode(),
  );

  // Grid stays underneath the viewer so closing it needs no relayout
  grid::draw_grid(frame, chunks[1], app);
  if app.screen() == Screen::Viewer {
    viewer::draw_viewer(frame, chunks[1], app);
  }

  if *app.mode() == Mode::Command {
    let suggestions = app.autocomplete_suggestions();
    components::draw_command_overlay(
      frame,
      chunks[1],
      app.command_input(),
      &suggestions,
      app.selected_suggestion(),
    );
  }

  renderfns::draw_footer(
    frame,
    chunks[2],
    &app.view_breadcrumb(),
    app.status_message(),
  );
}
