use crate::nav::flatten::{row_of_uid, selected_field, tab_rows, table_at, CursorRow};
use crate::ui::ToastLevel;
use crate::widgets::form::{draw_form, FieldKind, FieldValue, FormField, FormState, OPTIONS_VISIBLE};
use crossterm::event::KeyCode;
use ratatui::crossterm::event as rt_event;
use ratatui::prelude::*;
use std::collections::HashMap;
use std::path::PathBuf;
use tui_textarea::TextArea;

/// What a keypress asks the app to do beyond editing the form in place.
#[derive(Debug, PartialEq)]
pub enum FormIntent {
    Submit,
    SelectFiles { uid: u64, paths: Vec<PathBuf> },
    RowsRemoved { uids: Vec<u64> },
    Toast { text: String, level: ToastLevel },
}

pub struct FormWidget {
    pub form: FormState,
    ta_map: HashMap<u64, TextArea<'static>>,
}

fn textarea_for(fld: &FormField) -> TextArea<'static> {
    let mut ta = TextArea::default();
    if let FieldValue::Text(txt) = &fld.value {
        if !txt.is_empty() {
            ta.insert_str(txt);
        }
    }
    ta.set_block(
        ratatui::widgets::Block::default()
            .borders(ratatui::widgets::Borders::ALL)
            .title(format!("Editing: {} — Ctrl+S Save • Esc Cancel", fld.label)),
    );
    ta
}

/// Shell-style path list, so quoted names with spaces stay whole.
pub fn parse_paths(raw: &str) -> Option<Vec<PathBuf>> {
    shlex::split(raw).map(|parts| parts.into_iter().map(PathBuf::from).collect())
}

impl FormWidget {
    pub fn new(form: FormState) -> Self {
        Self {
            form,
            ta_map: HashMap::new(),
        }
    }

    fn current(&self, tab: usize) -> Option<usize> {
        selected_field(&self.form, tab)
    }

    fn editing_textarea(&self, tab: usize) -> Option<u64> {
        if !self.form.editing {
            return None;
        }
        let idx = self.current(tab)?;
        let fld = &self.form.fields[idx];
        matches!(fld.kind, FieldKind::TextArea { .. }).then_some(fld.uid)
    }

    /// Ctrl+S while the textarea overlay is open.
    pub fn commit_textarea(&mut self, tab: usize) -> bool {
        let Some(uid) = self.editing_textarea(tab) else {
            return false;
        };
        let Some(ta) = self.ta_map.remove(&uid) else {
            return false;
        };
        if let Some(idx) = self.form.position_of_uid(uid) {
            let fld = &mut self.form.fields[idx];
            fld.value = FieldValue::Text(ta.lines().join("\n"));
            fld.error = None;
        }
        self.form.editing = false;
        self.form.message = None;
        true
    }

    pub fn cancel_textarea(&mut self, tab: usize) -> bool {
        let Some(uid) = self.editing_textarea(tab) else {
            return false;
        };
        self.ta_map.remove(&uid);
        self.form.editing = false;
        self.form.message = None;
        true
    }

    /// Leave edit mode; a file field hands its path list on.
    fn stop_editing(&mut self, idx: usize) -> Vec<FormIntent> {
        self.form.editing = false;
        let fld = &self.form.fields[idx];
        if !fld.is_file() {
            return Vec::new();
        }
        let uid = fld.uid;
        match parse_paths(&fld.text()) {
            Some(paths) => vec![FormIntent::SelectFiles { uid, paths }],
            None => vec![FormIntent::Toast {
                text: "Unbalanced quotes in file list".into(),
                level: ToastLevel::Error,
            }],
        }
    }

    pub fn render(&mut self, f: &mut Frame, area: Rect, tab: usize, focused: bool, tick: u64) {
        let overlay = self.editing_textarea(tab);
        // the overlay owns the cursor while it is open
        let cursor_on = tick % 2 == 0 && overlay.is_none();
        draw_form(f, area, &mut self.form, tab, focused, cursor_on);
        if let Some(uid) = overlay {
            if let Some(ta) = self.ta_map.get(&uid) {
                let rect = centered_rect(80, 70, area);
                f.render_widget(ratatui::widgets::Clear, rect);
                f.render_widget(ta, rect);
            }
        }
    }

    pub fn on_key(&mut self, key: KeyCode, tab: usize) -> Vec<FormIntent> {
        if let Some(uid) = self.editing_textarea(tab) {
            if key == KeyCode::Esc {
                self.cancel_textarea(tab);
            } else if let (Some(ta), Some(code)) = (self.ta_map.get_mut(&uid), textarea_key(key)) {
                let _ = ta.input(rt_event::KeyEvent::new(code, rt_event::KeyModifiers::NONE));
            }
            return Vec::new();
        }
        if self.form.disabled {
            // only browsing while a submission is in flight
            match key {
                KeyCode::Up | KeyCode::Down => self.move_cursor(key, tab),
                _ => {}
            }
            return Vec::new();
        }
        match key {
            KeyCode::Up | KeyCode::Down => {
                if self.form.editing {
                    if let Some(idx) = self.current(tab) {
                        step_in_field(&mut self.form.fields[idx], key == KeyCode::Up);
                    }
                } else {
                    self.move_cursor(key, tab);
                }
                Vec::new()
            }
            KeyCode::Left | KeyCode::Right => {
                if let Some(idx) = self.current(tab) {
                    let forward = key == KeyCode::Right;
                    let fld = &mut self.form.fields[idx];
                    match &mut fld.kind {
                        FieldKind::Select {
                            options,
                            cursor,
                            selected,
                            ..
                        } if !self.form.editing => {
                            *selected = cycle(*selected, options.len(), forward);
                            *cursor = selected.unwrap_or(0);
                            fld.error = None;
                        }
                        FieldKind::Radio { options, selected } => {
                            *selected = cycle(*selected, options.len(), forward);
                            fld.error = None;
                        }
                        FieldKind::Select {
                            cursor, selected, ..
                        } => {
                            *selected = Some(*cursor);
                            self.form.editing = false;
                            fld.error = None;
                        }
                        _ => {}
                    }
                }
                Vec::new()
            }
            KeyCode::Enter => self.on_enter(tab),
            KeyCode::Esc => {
                if self.form.editing {
                    if let Some(idx) = self.current(tab) {
                        return self.stop_editing(idx);
                    }
                    self.form.editing = false;
                }
                self.form.message = None;
                Vec::new()
            }
            KeyCode::Backspace => {
                if self.form.editing {
                    if let Some(idx) = self.current(tab) {
                        let fld = &mut self.form.fields[idx];
                        if let FieldValue::Text(s) = &mut fld.value {
                            s.pop();
                            fld.error = None;
                        }
                    }
                }
                Vec::new()
            }
            KeyCode::Char(c) if self.form.editing => {
                if let Some(idx) = self.current(tab) {
                    push_char(&mut self.form.fields[idx], c);
                }
                Vec::new()
            }
            KeyCode::Char('+') => self.add_row_here(tab),
            KeyCode::Char('-') => self.remove_row_here(tab),
            KeyCode::Char(' ') => {
                if let Some(idx) = self.current(tab) {
                    let fld = &mut self.form.fields[idx];
                    if let (FieldKind::Checkbox, FieldValue::Bool(b)) = (&fld.kind, &mut fld.value) {
                        *b = !*b;
                        fld.error = None;
                    }
                }
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn move_cursor(&mut self, key: KeyCode, tab: usize) {
        let total = tab_rows(&self.form, tab).len();
        if key == KeyCode::Up {
            self.form.selected = self.form.selected.saturating_sub(1);
        } else if self.form.selected + 1 < total {
            self.form.selected += 1;
        }
    }

    fn on_enter(&mut self, tab: usize) -> Vec<FormIntent> {
        let rows = tab_rows(&self.form, tab);
        let idx = match rows.get(self.form.selected) {
            Some(CursorRow::Submit) => return vec![FormIntent::Submit],
            Some(CursorRow::Field(i)) => *i,
            None => return Vec::new(),
        };
        let editing = self.form.editing;
        let fld = &mut self.form.fields[idx];
        match (&mut fld.kind, &mut fld.value) {
            (FieldKind::Checkbox, FieldValue::Bool(b)) => {
                *b = !*b;
                fld.error = None;
            }
            (FieldKind::TableAnchor, _) => return self.add_row_here(tab),
            (FieldKind::Radio { options, selected }, _) => {
                *selected = cycle(*selected, options.len(), true);
                fld.error = None;
            }
            (
                FieldKind::Select {
                    cursor,
                    selected,
                    offset,
                    ..
                },
                _,
            ) => {
                if editing {
                    *selected = Some(*cursor);
                    self.form.editing = false;
                    fld.error = None;
                } else {
                    *cursor = selected.unwrap_or(0);
                    *offset = cursor.saturating_sub(OPTIONS_VISIBLE - 1);
                    self.form.editing = true;
                }
            }
            (FieldKind::TextArea { .. }, _) => {
                let ta = textarea_for(fld);
                self.ta_map.insert(fld.uid, ta);
                self.form.editing = true;
            }
            (_, FieldValue::Text(_)) => {
                if editing {
                    return self.stop_editing(idx);
                }
                self.form.editing = true;
            }
            _ => {}
        }
        Vec::new()
    }

    fn add_row_here(&mut self, tab: usize) -> Vec<FormIntent> {
        let Some((table, _)) = self.current(tab).and_then(|i| table_at(&self.form, i)) else {
            return Vec::new();
        };
        let Some(index) = self.form.add_row(&table) else {
            return Vec::new();
        };
        let first = self
            .form
            .tables
            .iter()
            .find(|t| t.id == table)
            .and_then(|t| t.columns.first())
            .map(|c| c.name.clone());
        if let Some(uid) = first
            .and_then(|c| self.form.cell(&table, index, &c))
            .map(|f| f.uid)
        {
            if let Some(row) = row_of_uid(&self.form, tab, uid) {
                self.form.selected = row;
            }
        }
        Vec::new()
    }

    /// `-` on a row removes that row; on the heading it removes the last one.
    fn remove_row_here(&mut self, tab: usize) -> Vec<FormIntent> {
        let Some((table, row)) = self.current(tab).and_then(|i| table_at(&self.form, i)) else {
            return Vec::new();
        };
        let index = match row {
            Some(r) => r,
            None => match self.form.row_count(&table).checked_sub(1) {
                Some(last) => last,
                None => return Vec::new(),
            },
        };
        let uids = self.form.remove_row(&table, index);
        for uid in &uids {
            self.ta_map.remove(uid);
        }
        let total = tab_rows(&self.form, tab).len();
        if self.form.selected >= total {
            self.form.selected = total.saturating_sub(1);
        }
        if row.is_some() {
            // land on the heading or the row that slid up
            self.form.selected = self.form.selected.min(total.saturating_sub(1));
        }
        vec![FormIntent::RowsRemoved { uids }]
    }
}

// the textarea speaks ratatui's crossterm, keys arrive from ours
fn textarea_key(key: KeyCode) -> Option<rt_event::KeyCode> {
    Some(match key {
        KeyCode::Char(c) => rt_event::KeyCode::Char(c),
        KeyCode::Enter => rt_event::KeyCode::Enter,
        KeyCode::Backspace => rt_event::KeyCode::Backspace,
        KeyCode::Delete => rt_event::KeyCode::Delete,
        KeyCode::Left => rt_event::KeyCode::Left,
        KeyCode::Right => rt_event::KeyCode::Right,
        KeyCode::Up => rt_event::KeyCode::Up,
        KeyCode::Down => rt_event::KeyCode::Down,
        KeyCode::Home => rt_event::KeyCode::Home,
        KeyCode::End => rt_event::KeyCode::End,
        KeyCode::Tab => rt_event::KeyCode::Tab,
        _ => return None,
    })
}

fn cycle(selected: Option<usize>, len: usize, forward: bool) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(match (selected, forward) {
        (None, true) => 0,
        (None, false) => len - 1,
        (Some(i), true) => (i + 1) % len,
        (Some(0), false) => len - 1,
        (Some(i), false) => i - 1,
    })
}

fn push_char(fld: &mut FormField, c: char) {
    let FieldValue::Text(s) = &mut fld.value else {
        return;
    };
    let accept = match fld.kind {
        FieldKind::Number { is_integer } => {
            c.is_ascii_digit() || (c == '.' && !is_integer && !s.contains('.')) || (c == '-' && s.is_empty())
        }
        FieldKind::Date => c.is_ascii_digit() || c == '-',
        FieldKind::Text | FieldKind::File { .. } => !c.is_control(),
        _ => false,
    };
    if accept {
        s.push(c);
        fld.error = None;
    }
}

/// Up/Down inside an open field: walk the option list or step a number.
fn step_in_field(fld: &mut FormField, up: bool) {
    match &mut fld.kind {
        FieldKind::Select {
            options,
            cursor,
            offset,
            ..
        } => {
            if up {
                *cursor = cursor.saturating_sub(1);
                if *cursor < *offset {
                    *offset = *cursor;
                }
            } else {
                if *cursor + 1 < options.len() {
                    *cursor += 1;
                }
                if *cursor >= *offset + OPTIONS_VISIBLE {
                    *offset = *cursor + 1 - OPTIONS_VISIBLE;
                }
            }
        }
        FieldKind::Number { is_integer } => {
            let is_integer = *is_integer;
            step_number_value(fld, if up { 1 } else { -1 }, is_integer);
        }
        _ => {}
    }
}

fn step_number_value(fld: &mut FormField, dir: i32, is_integer: bool) {
    let cur = if let FieldValue::Text(s) = &fld.value {
        s.trim().parse::<f64>().unwrap_or(0.0)
    } else {
        0.0
    };
    let step = if is_integer { 1.0 } else { 0.5 };
    let next = (cur + step * f64::from(dir)).max(0.0);
    let s = if is_integer {
        format!("{next:.0}")
    } else {
        trim_float(next)
    };
    fld.value = FieldValue::Text(s);
    fld.error = None;
}

fn trim_float(v: f64) -> String {
    let mut s = format!("{v:.6}");
    while s.contains('.') && s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.pop();
    }
    if s.is_empty() {
        s.push('0');
    }
    s
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let v = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Percentage((100 - percent_y) / 2),
                Constraint::Percentage(percent_y),
                Constraint::Percentage((100 - percent_y) / 2),
            ]
            .as_ref(),
        )
        .split(area);
    let h = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage((100 - percent_x) / 2),
                Constraint::Percentage(percent_x),
                Constraint::Percentage((100 - percent_x) / 2),
            ]
            .as_ref(),
        )
        .split(v[1]);
    h[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widgets::form::{TabInfo, TableInfo};

    fn widget() -> FormWidget {
        let mut form = FormState::new(
            "T",
            vec![TabInfo {
                title: "Main".into(),
                visible: true,
            }],
        );
        form.push_field(FormField::new("pin", "PIN", 0, FieldKind::Number { is_integer: true }));
        form.push_field(FormField::new("docs", "Docs", 0, FieldKind::File { multiple: true }));
        form.push_field(FormField::new(
            "rating",
            "Rating",
            0,
            FieldKind::Radio {
                options: vec!["1".into(), "2".into(), "3".into()],
                selected: None,
            },
        ));
        form.add_table(
            TableInfo {
                id: "langs".into(),
                title: "Languages".into(),
                tab: 0,
                columns: vec![
                    FormField::new("language", "Language", 0, FieldKind::Text),
                    FormField::new("speak", "Speak", 0, FieldKind::Text),
                ],
            },
            1,
        );
        FormWidget::new(form)
    }

    fn type_str(w: &mut FormWidget, s: &str) {
        for c in s.chars() {
            w.on_key(KeyCode::Char(c), 0);
        }
    }

    #[test]
    fn number_fields_only_take_digits() {
        let mut w = widget();
        w.on_key(KeyCode::Enter, 0);
        type_str(&mut w, "68a20.4");
        w.on_key(KeyCode::Enter, 0);
        assert_eq!(w.form.text("pin"), "68204");
        assert!(!w.form.editing);
    }

    #[test]
    fn file_field_emits_parsed_paths_on_commit() {
        let mut w = widget();
        w.on_key(KeyCode::Down, 0);
        w.on_key(KeyCode::Enter, 0);
        type_str(&mut w, "a.pdf \"my cv.pdf\"");
        let intents = w.on_key(KeyCode::Enter, 0);
        let uid = w.form.field("docs").unwrap().uid;
        assert_eq!(
            intents,
            vec![FormIntent::SelectFiles {
                uid,
                paths: vec![PathBuf::from("a.pdf"), PathBuf::from("my cv.pdf")],
            }]
        );
    }

    #[test]
    fn radio_cycles_with_arrows() {
        let mut w = widget();
        w.form.selected = 2;
        w.on_key(KeyCode::Right, 0);
        assert_eq!(w.form.text("rating"), "1");
        w.on_key(KeyCode::Left, 0);
        assert_eq!(w.form.text("rating"), "3");
    }

    #[test]
    fn plus_and_minus_edit_table_rows() {
        let mut w = widget();
        // anchor row
        w.form.selected = 3;
        w.on_key(KeyCode::Char('+'), 0);
        assert_eq!(w.form.row_count("langs"), 2);
        let new_first = w.form.cell("langs", 1, "language").unwrap().uid;
        assert_eq!(row_of_uid(&w.form, 0, new_first), Some(w.form.selected));

        let intents = w.on_key(KeyCode::Char('-'), 0);
        assert_eq!(w.form.row_count("langs"), 1);
        match &intents[..] {
            [FormIntent::RowsRemoved { uids }] => assert!(uids.contains(&new_first)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn submit_row_emits_submit_and_disabled_form_ignores_it() {
        let mut w = widget();
        let last = tab_rows(&w.form, 0).len() - 1;
        w.form.selected = last;
        assert_eq!(w.on_key(KeyCode::Enter, 0), vec![FormIntent::Submit]);
        w.form.disabled = true;
        assert!(w.on_key(KeyCode::Enter, 0).is_empty());
    }

    #[test]
    fn textarea_overlay_commits_on_save() {
        let mut form = FormState::new(
            "",
            vec![TabInfo {
                title: "Main".into(),
                visible: true,
            }],
        );
        form.push_field(FormField::new(
            "reason",
            "Reason",
            0,
            FieldKind::TextArea { preview_lines: 3 },
        ));
        let mut w = FormWidget::new(form);
        w.on_key(KeyCode::Enter, 0);
        assert!(w.form.editing);
        type_str(&mut w, "moved");
        assert!(w.commit_textarea(0));
        assert_eq!(w.form.text("reason"), "moved");
        w.on_key(KeyCode::Enter, 0);
        type_str(&mut w, "!!");
        w.on_key(KeyCode::Esc, 0);
        assert_eq!(w.form.text("reason"), "moved");
    }

    #[test]
    fn cycle_wraps_both_ways() {
        assert_eq!(cycle(None, 3, true), Some(0));
        assert_eq!(cycle(Some(2), 3, true), Some(0));
        assert_eq!(cycle(Some(0), 3, false), Some(2));
        assert_eq!(cycle(None, 0, true), None);
    }
}
