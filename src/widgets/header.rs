use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::ui::AppState;

pub fn draw_header(f: &mut Frame, area: Rect, state: &AppState) {
    let theme = &state.theme;
    let header = state.config.header.as_deref().unwrap_or("ONBOARD");
    let mut spans = vec![
        Span::styled(
            format!(" {header} "),
            Style::default()
                .fg(theme.primary)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled("│ ", Style::default().fg(theme.frame)),
        Span::styled(
            state.form.form.title.clone(),
            Style::default().fg(theme.secondary),
        ),
    ];
    if !state.docname.is_empty() {
        spans.push(Span::styled(
            format!("  #{}", state.docname),
            Style::default().fg(theme.muted),
        ));
    }
    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(Style::default().fg(theme.frame));
    f.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}
