use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::config::TriggerMode;

/// Draw the header bar with logo, feed context, and shortcuts
pub fn draw_header(
  frame: &mut Frame,
  area: Rect,
  title: &str,
  revealed: usize,
  total: usize,
  trigger: TriggerMode,
) {
  let mut spans = vec![
    Span::styled(" feedgrid ", Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(format!(" {} ", title), Style::default().fg(Color::White)),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(
      format!(" {} ", progress_label(revealed, total)),
      Style::default().fg(Color::Yellow).bold(),
    ),
    Span::raw("  "),
  ];

  // Shortcuts - keys highlighted, descriptions dimmed
  let shortcuts: &[(&str, &str)] = match trigger {
    TriggerMode::Button => &[
      ("<m>", " more"),
      ("<↵>", " open"),
      ("<:>", " command"),
      ("<q>", " quit"),
    ],
    TriggerMode::Infinite => &[("<↵>", " open"), ("<:>", " command"), ("<q>", " quit")],
  };
  for (key, label) in shortcuts {
    spans.push(Span::styled(*key, Style::default().fg(Color::Cyan)));
    spans.push(Span::styled(*label, Style::default().fg(Color::DarkGray)));
    spans.push(Span::raw("   "));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));

  frame.render_widget(paragraph, area);
}

fn progress_label(revealed: usize, total: usize) -> String {
  if total == 0 {
    "no posts".to_string()
  } else {
    format!("{}/{} posts", revealed, total)
  }
}
