use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Tabs};

use crate::nav::tabs::TabNavigator;
use crate::ui::AppState;

/// One `[Fn] Title` entry per visible tab; hidden tabs take no key.
pub fn draw_tab_bar(f: &mut Frame, area: Rect, state: &AppState) {
    let theme = &state.theme;
    let form = &state.form.form;
    let visible = TabNavigator::visible_tabs(form);
    let current = visible
        .iter()
        .position(|&t| t == state.tabs.active())
        .unwrap_or(0);

    let titles: Vec<Line> = visible
        .iter()
        .enumerate()
        .map(|(i, &tab)| {
            let is_selected = i == current;
            let text_style = if is_selected {
                Style::default()
                    .fg(theme.selected)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(theme.muted)
            };
            let key_style = if is_selected {
                Style::default()
                    .fg(theme.accent)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(theme.muted)
            };
            let title = form
                .tabs
                .get(tab)
                .map(|t| t.title.clone())
                .unwrap_or_default();
            let errors = form
                .fields
                .iter()
                .filter(|fl| fl.tab == tab && fl.error.is_some())
                .count();
            let mut spans = vec![
                Span::styled("[", Style::default().fg(theme.frame)),
                Span::styled(format!("F{}", i + 1), key_style),
                Span::styled("]", Style::default().fg(theme.frame)),
                Span::raw(" "),
                Span::styled(title, text_style),
            ];
            if errors > 0 {
                spans.push(Span::styled(
                    format!(" ({errors})"),
                    Style::default().fg(theme.error),
                ));
            }
            Line::from(spans)
        })
        .collect();

    let tabs = Tabs::new(titles)
        .select(current)
        .style(Style::default().fg(theme.fg))
        .highlight_style(
            Style::default()
                .fg(theme.selected)
                .add_modifier(Modifier::BOLD),
        )
        .divider(Span::styled(" │ ", Style::default().fg(theme.frame)));

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(Style::default().fg(theme.frame));

    f.render_widget(tabs.block(block), area);
}
