use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::*;

use crate::ui::{AppState, ToastLevel};

fn toast_tag(level: ToastLevel) -> &'static str {
    match level {
        ToastLevel::Success => "[OK]",
        ToastLevel::Error => "[ERROR]",
        ToastLevel::Info => "[INFO]",
    }
}

pub fn draw_footer_combined(f: &mut Frame, area: Rect, state: &AppState, help_text: &str) {
    let mut spans: Vec<Span> = Vec::new();
    if let Some(msg) = &state.status_text {
        let spinner = ["⠋", "⠙", "⠸", "⠴", "⠦", "⠇"][state.tick as usize % 6];
        spans.push(Span::raw(format!(" {spinner} {msg}")));
        let pending = state.slots.in_flight();
        if pending > 0 {
            spans.push(Span::raw(format!(" ({pending} file(s) reading)")));
        }
        spans.push(Span::raw("  |  "));
    } else if state.slots.in_flight() > 0 {
        let spinner = ["⠋", "⠙", "⠸", "⠴", "⠦", "⠇"][state.tick as usize % 6];
        spans.push(Span::raw(format!(
            " {spinner} reading {} file(s)  |  ",
            state.slots.in_flight()
        )));
    }
    if let Some(t) = &state.toast {
        let color = state.theme.toast_color(t.level);
        spans.push(Span::styled(
            format!("{} ", toast_tag(t.level)),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::styled(
            format!("{}  |  ", t.text),
            Style::default().fg(color),
        ));
    } else if let Some(err) = &state.last_error {
        spans.push(Span::styled(
            format!("{} {err}  |  ", toast_tag(ToastLevel::Error)),
            Style::default().fg(state.theme.error),
        ));
    }
    if state.form.form.editing {
        spans.push(Span::styled(
            "editing  |  ",
            Style::default().fg(Color::Magenta),
        ));
    }
    spans.push(Span::styled(
        help_text.to_string(),
        Style::default().fg(Color::DarkGray),
    ));
    let p = Paragraph::new(Line::from(spans));
    f.render_widget(p, area);
}
