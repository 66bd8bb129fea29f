use crate::nav::flatten::{tab_rows, CursorRow};
use crate::widgets::chrome::panel_block;
use ratatui::prelude::*;
use ratatui::widgets::*;

#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Text(String),
    Bool(bool),
}

#[derive(Clone, Debug)]
pub enum FieldKind {
    Text,
    Date,
    TextArea {
        /// Lines shown in the form before the overlay is opened.
        preview_lines: usize,
    },
    Number {
        is_integer: bool,
    },
    Checkbox,
    Select {
        options: Vec<String>,
        cursor: usize,
        selected: Option<usize>,
        offset: usize,
    },
    // Inline single choice (proficiency levels); Left/Right cycles
    Radio {
        options: Vec<String>,
        selected: Option<usize>,
    },
    // Value holds the shell-style path list typed by the user
    File {
        multiple: bool,
    },
    // Heading row marking where a repeating table lives
    TableAnchor,
}

pub const OPTIONS_VISIBLE: usize = 8;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowRef {
    pub table: String,
    pub index: usize,
}

#[derive(Clone, Debug)]
pub struct FormField {
    pub uid: u64,
    pub name: String,
    pub label: String,
    pub tab: usize,
    pub required: bool,
    pub kind: FieldKind,
    pub value: FieldValue,
    pub error: Option<String>,
    pub group: Option<String>,
    pub row: Option<RowRef>,
    pub hidden: bool,
}

impl FormField {
    pub fn new(name: &str, label: &str, tab: usize, kind: FieldKind) -> Self {
        let value = match kind {
            FieldKind::Checkbox => FieldValue::Bool(false),
            _ => FieldValue::Text(String::new()),
        };
        Self {
            uid: 0,
            name: name.to_string(),
            label: label.to_string(),
            tab,
            required: false,
            kind,
            value,
            error: None,
            group: None,
            row: None,
            hidden: false,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, FieldKind::File { .. })
    }

    /// The value as the user sees it: option text for choices, "1"/"" for checkboxes.
    pub fn text(&self) -> String {
        match (&self.kind, &self.value) {
            (FieldKind::Select { options, selected, .. }, _)
            | (FieldKind::Radio { options, selected }, _) => selected
                .and_then(|i| options.get(i))
                .cloned()
                .unwrap_or_default(),
            (_, FieldValue::Bool(b)) => {
                if *b {
                    "1".into()
                } else {
                    String::new()
                }
            }
            (_, FieldValue::Text(s)) => s.clone(),
        }
    }

    pub fn checked(&self) -> bool {
        matches!(self.value, FieldValue::Bool(true))
    }

    /// Assign from a plain string; choices match option text, checkboxes parse truthy words.
    pub fn set_text(&mut self, v: &str) -> bool {
        match &mut self.kind {
            FieldKind::Select {
                options,
                selected,
                cursor,
                ..
            } => {
                if v.is_empty() {
                    *selected = None;
                    return true;
                }
                match options.iter().position(|o| o == v) {
                    Some(i) => {
                        *selected = Some(i);
                        *cursor = i;
                        true
                    }
                    None => false,
                }
            }
            FieldKind::Radio { options, selected } => {
                if v.is_empty() {
                    *selected = None;
                    return true;
                }
                match options.iter().position(|o| o == v) {
                    Some(i) => {
                        *selected = Some(i);
                        true
                    }
                    None => false,
                }
            }
            FieldKind::Checkbox => {
                let on = matches!(
                    v.to_ascii_lowercase().as_str(),
                    "1" | "true" | "yes" | "on" | "x"
                );
                self.value = FieldValue::Bool(on);
                true
            }
            FieldKind::TableAnchor => false,
            _ => {
                self.value = FieldValue::Text(v.to_string());
                true
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct TabInfo {
    pub title: String,
    pub visible: bool,
}

#[derive(Clone, Debug)]
pub struct TableInfo {
    pub id: String,
    pub title: String,
    pub tab: usize,
    pub columns: Vec<FormField>,
}

#[derive(Clone, Debug, Default)]
pub struct FormState {
    pub title: String,
    pub tabs: Vec<TabInfo>,
    pub fields: Vec<FormField>,
    pub tables: Vec<TableInfo>,
    pub selected: usize,
    pub scroll: u16,
    pub editing: bool,
    pub message: Option<String>,
    pub banner: Option<String>,
    pub disabled: bool,
    next_uid: u64,
}

impl FormState {
    pub fn new(title: impl Into<String>, tabs: Vec<TabInfo>) -> Self {
        Self {
            title: title.into(),
            tabs,
            ..Default::default()
        }
    }

    pub fn push_field(&mut self, mut field: FormField) -> u64 {
        self.next_uid += 1;
        field.uid = self.next_uid;
        let uid = field.uid;
        self.fields.push(field);
        uid
    }

    pub fn add_table(&mut self, info: TableInfo, initial_rows: usize) {
        let mut anchor = FormField::new(&info.id, &info.title, info.tab, FieldKind::TableAnchor);
        anchor.group = Some(info.title.clone());
        self.push_field(anchor);
        let id = info.id.clone();
        self.tables.push(info);
        for _ in 0..initial_rows {
            self.add_row(&id);
        }
    }

    pub fn tab_visible(&self, tab: usize) -> bool {
        self.tabs.get(tab).map(|t| t.visible).unwrap_or(false)
    }

    /// Flat (non-table) field by name.
    pub fn field(&self, name: &str) -> Option<&FormField> {
        self.fields
            .iter()
            .find(|f| f.row.is_none() && f.name == name && !matches!(f.kind, FieldKind::TableAnchor))
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut FormField> {
        self.fields
            .iter_mut()
            .find(|f| f.row.is_none() && f.name == name && !matches!(f.kind, FieldKind::TableAnchor))
    }

    pub fn position_of_uid(&self, uid: u64) -> Option<usize> {
        self.fields.iter().position(|f| f.uid == uid)
    }

    pub fn text(&self, name: &str) -> String {
        self.field(name).map(|f| f.text()).unwrap_or_default()
    }

    pub fn checked(&self, name: &str) -> bool {
        self.field(name).map(|f| f.checked()).unwrap_or(false)
    }

    pub fn set_text(&mut self, name: &str, v: &str) -> bool {
        match self.field_mut(name) {
            Some(f) => f.set_text(v),
            None => false,
        }
    }

    pub fn set_checked(&mut self, name: &str, on: bool) -> bool {
        match self.field_mut(name) {
            Some(f) if matches!(f.kind, FieldKind::Checkbox) => {
                f.value = FieldValue::Bool(on);
                true
            }
            _ => false,
        }
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.fields
            .iter()
            .filter_map(|f| f.row.as_ref())
            .filter(|r| r.table == table)
            .map(|r| r.index + 1)
            .max()
            .unwrap_or(0)
    }

    /// Rows of a table in display order; each row lists its cells in column order.
    pub fn rows(&self, table: &str) -> Vec<Vec<&FormField>> {
        let mut out: Vec<Vec<&FormField>> = vec![Vec::new(); self.row_count(table)];
        for f in &self.fields {
            if let Some(r) = &f.row {
                if r.table == table {
                    out[r.index].push(f);
                }
            }
        }
        out
    }

    pub fn cell(&self, table: &str, row: usize, column: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| {
            f.name == column
                && f.row
                    .as_ref()
                    .map(|r| r.table == table && r.index == row)
                    .unwrap_or(false)
        })
    }

    pub fn set_cell(&mut self, table: &str, row: usize, column: &str, v: &str) -> bool {
        let target = self.fields.iter_mut().find(|f| {
            f.name == column
                && f.row
                    .as_ref()
                    .map(|r| r.table == table && r.index == row)
                    .unwrap_or(false)
        });
        match target {
            Some(f) => f.set_text(v),
            None => false,
        }
    }

    /// Append a fresh row after the table's last row (or its heading). Returns the row index.
    pub fn add_row(&mut self, table: &str) -> Option<usize> {
        let info = self.tables.iter().find(|t| t.id == table)?.clone();
        let index = self.row_count(table);
        let after = self
            .fields
            .iter()
            .rposition(|f| {
                f.row.as_ref().map(|r| r.table == table).unwrap_or(false)
                    || (matches!(f.kind, FieldKind::TableAnchor) && f.name == table)
            })?;
        let mut insert_at = after + 1;
        for col in &info.columns {
            self.next_uid += 1;
            let mut cell = col.clone();
            cell.uid = self.next_uid;
            cell.tab = info.tab;
            cell.row = Some(RowRef {
                table: table.to_string(),
                index,
            });
            self.fields.insert(insert_at, cell);
            insert_at += 1;
        }
        Some(index)
    }

    /// Remove one row and renumber the rows after it. Returns the uids that went away.
    pub fn remove_row(&mut self, table: &str, index: usize) -> Vec<u64> {
        let mut removed = Vec::new();
        self.fields.retain(|f| match &f.row {
            Some(r) if r.table == table && r.index == index => {
                removed.push(f.uid);
                false
            }
            _ => true,
        });
        for f in &mut self.fields {
            if let Some(r) = &mut f.row {
                if r.table == table && r.index > index {
                    r.index -= 1;
                }
            }
        }
        removed
    }

    pub fn clear_errors(&mut self) {
        for f in &mut self.fields {
            f.error = None;
        }
    }
}

fn value_style(form: &FormState, is_sel: bool) -> Style {
    if is_sel {
        if form.editing {
            crate::theme::text_editing_bold()
        } else {
            crate::theme::text_active_bold()
        }
    } else {
        Style::default()
    }
}

pub fn draw_form(
    f: &mut Frame,
    area: Rect,
    form: &mut FormState,
    tab: usize,
    highlight: bool,
    cursor_on: bool,
) {
    let rows = tab_rows(form, tab);
    let mut lines: Vec<Line> = Vec::new();
    let mut last_group: Option<String> = None;
    let mut selected_line: u16 = 0;
    if let Some(b) = &form.banner {
        lines.push(Line::from(Span::styled(
            b.clone(),
            crate::theme::text_error().add_modifier(Modifier::BOLD),
        )));
    }
    for (ri, row) in rows.iter().enumerate() {
        let is_sel = ri == form.selected;
        let sel = if is_sel { '›' } else { ' ' };
        if is_sel {
            selected_line = lines.len() as u16;
        }
        let idx = match row {
            CursorRow::Submit => {
                lines.push(Line::from(""));
                if is_sel {
                    selected_line = lines.len() as u16;
                }
                let style = if form.disabled {
                    crate::theme::text_muted()
                } else if is_sel {
                    crate::theme::list_cursor_style()
                } else {
                    crate::theme::text_active_bold()
                };
                lines.push(Line::from(Span::styled("  [ Submit ]  ", style)));
                continue;
            }
            CursorRow::Field(i) => *i,
        };
        let fld = &form.fields[idx];
        if let Some(g) = &fld.group {
            if last_group.as_ref() != Some(g) && !matches!(fld.kind, FieldKind::TableAnchor) {
                lines.push(Line::from(Span::styled(
                    format!("-- {g} --"),
                    Style::default()
                        .fg(Color::Magenta)
                        .add_modifier(Modifier::BOLD),
                )));
                if is_sel {
                    selected_line = lines.len() as u16;
                }
                last_group = Some(g.clone());
            }
        }
        let req = if fld.required { " *" } else { "" };
        let indent = if fld.row.is_some() { "    " } else { "" };
        let label = match &fld.row {
            Some(r) if fld.name == first_column(form, &r.table) => {
                format!("{indent}#{} {}", r.index + 1, fld.label)
            }
            _ => format!("{indent}{}", fld.label),
        };
        match &fld.kind {
            FieldKind::TableAnchor => {
                let n = form.row_count(&fld.name);
                lines.push(Line::from(vec![
                    Span::styled(
                        format!("{sel} == {} ==", fld.label),
                        Style::default()
                            .fg(Color::Magenta)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(
                        format!("  {n} row{}  (+ add, - remove)", if n == 1 { "" } else { "s" }),
                        crate::theme::text_muted(),
                    ),
                ]));
                last_group = fld.group.clone();
            }
            FieldKind::Text | FieldKind::Date | FieldKind::Number { .. } => {
                let mut val = fld.text();
                if val.is_empty() && matches!(fld.kind, FieldKind::Date) && !is_sel {
                    val = "YYYY-MM-DD".into();
                }
                if form.editing && is_sel && cursor_on {
                    val.push('▏');
                }
                lines.push(Line::from(vec![
                    Span::raw(format!("{sel} {label}{req}: ")),
                    Span::styled(val, value_style(form, is_sel)),
                ]));
            }
            FieldKind::File { multiple } => {
                let mut val = fld.text();
                if form.editing && is_sel && cursor_on {
                    val.push('▏');
                }
                let hint = if *multiple { " (paths)" } else { " (path)" };
                lines.push(Line::from(vec![
                    Span::raw(format!("{sel} {label}{req}{hint}: ")),
                    Span::styled(val, value_style(form, is_sel)),
                ]));
            }
            FieldKind::TextArea { preview_lines } => {
                lines.push(Line::from(vec![Span::raw(format!("{sel} {label}{req}:"))]));
                let text = fld.text();
                let body: Vec<&str> = if text.is_empty() {
                    vec![""]
                } else {
                    text.lines().take((*preview_lines).max(1)).collect()
                };
                for bl in body {
                    lines.push(Line::from(vec![
                        Span::raw(format!("{indent}  ")),
                        Span::styled(bl.to_string(), value_style(form, is_sel)),
                    ]));
                }
                let more = text.lines().count().saturating_sub(3);
                if more > 0 {
                    lines.push(Line::from(Span::styled(
                        format!(
                            "{indent}  … ({} more line{})",
                            more,
                            if more == 1 { "" } else { "s" }
                        ),
                        crate::theme::text_muted(),
                    )));
                }
            }
            FieldKind::Checkbox => {
                let val = if fld.checked() { "[x]" } else { "[ ]" };
                let style = if is_sel {
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                lines.push(Line::from(vec![
                    Span::raw(format!("{sel} {label}{req}: ")),
                    Span::styled(val.to_string(), style),
                ]));
            }
            FieldKind::Radio { options, selected } => {
                let mut spans = vec![Span::raw(format!("{sel} {label}{req}: "))];
                for (oi, opt) in options.iter().enumerate() {
                    let mark = if Some(oi) == *selected { "(•)" } else { "( )" };
                    spans.push(Span::styled(
                        format!("{mark} {opt}  "),
                        value_style(form, is_sel && Some(oi) == *selected),
                    ));
                }
                lines.push(Line::from(spans));
            }
            FieldKind::Select {
                options,
                cursor,
                selected,
                offset,
            } => {
                let summary = selected
                    .and_then(|i| options.get(i))
                    .cloned()
                    .unwrap_or_else(|| "(none)".into());
                lines.push(Line::from(vec![
                    Span::raw(format!("{sel} {label}{req}: ")),
                    Span::styled(summary, value_style(form, is_sel)),
                ]));
                if form.editing && is_sel {
                    let start = (*offset).min(options.len());
                    let end = (start + OPTIONS_VISIBLE).min(options.len());
                    for (oi, opt) in options.iter().enumerate().take(end).skip(start) {
                        let mark = if Some(oi) == *selected { "(•)" } else { "( )" };
                        let cur = if oi == *cursor { '›' } else { ' ' };
                        let st = if oi == *cursor {
                            crate::theme::list_cursor_style()
                        } else {
                            crate::theme::text_muted()
                        };
                        lines.push(Line::from(vec![Span::styled(
                            format!("{indent}  {cur} {mark} {opt}"),
                            st,
                        )]));
                    }
                }
            }
        }
        if let Some(err) = &fld.error {
            lines.push(Line::from(Span::styled(
                format!("{indent}  ! {err}"),
                crate::theme::text_error(),
            )));
        }
    }
    if let Some(msg) = &form.message {
        lines.push(Line::from(Span::styled(
            msg.clone(),
            crate::theme::text_muted(),
        )));
    }
    // keep the cursor row inside the viewport
    let inner_h = area.height.saturating_sub(2);
    if inner_h > 0 {
        if selected_line < form.scroll {
            form.scroll = selected_line;
        } else if selected_line >= form.scroll + inner_h {
            form.scroll = selected_line + 1 - inner_h;
        }
    }
    let title = match form.tabs.get(tab) {
        Some(t) if form.editing => format!("{} — {} — editing", form.title, t.title),
        Some(t) => format!("{} — {}", form.title, t.title),
        None => form.title.clone(),
    };
    let block = panel_block(&title, highlight);
    let p = Paragraph::new(lines)
        .block(block)
        .scroll((form.scroll, 0));
    f.render_widget(p, area);
}

fn first_column<'a>(form: &'a FormState, table: &str) -> &'a str {
    form.tables
        .iter()
        .find(|t| t.id == table)
        .and_then(|t| t.columns.first())
        .map(|c| c.name.as_str())
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn sample_form() -> FormState {
        let mut form = FormState::new(
            "T",
            vec![TabInfo {
                title: "Main".into(),
                visible: true,
            }],
        );
        form.push_field(FormField::new("city", "City", 0, FieldKind::Text));
        form.push_field(FormField::new("ok", "Ok", 0, FieldKind::Checkbox));
        form.push_field(FormField::new(
            "level",
            "Level",
            0,
            FieldKind::Radio {
                options: vec!["Good".into(), "Fair".into()],
                selected: None,
            },
        ));
        let mut col_a = FormField::new("language", "Language", 0, FieldKind::Text);
        col_a.group = None;
        let col_b = FormField::new("speak", "Speak", 0, FieldKind::Text);
        form.add_table(
            TableInfo {
                id: "langs".into(),
                title: "Languages".into(),
                tab: 0,
                columns: vec![col_a, col_b],
            },
            1,
        );
        form
    }

    #[test]
    fn set_text_maps_choices_and_checkboxes() {
        let mut form = sample_form();
        assert!(form.set_text("city", "Kochi"));
        assert_eq!(form.text("city"), "Kochi");
        assert!(form.set_text("ok", "yes"));
        assert!(form.checked("ok"));
        assert!(form.set_text("level", "Fair"));
        assert_eq!(form.text("level"), "Fair");
        assert!(!form.set_text("level", "Poor"));
        assert!(!form.set_text("missing", "x"));
    }

    #[test]
    fn rows_keep_insertion_order_and_renumber_on_remove() {
        let mut form = sample_form();
        assert_eq!(form.row_count("langs"), 1);
        assert_eq!(form.add_row("langs"), Some(1));
        assert_eq!(form.add_row("langs"), Some(2));
        form.set_cell("langs", 0, "language", "R1");
        form.set_cell("langs", 1, "language", "R2");
        form.set_cell("langs", 2, "language", "R3");
        let names: Vec<String> = form
            .rows("langs")
            .iter()
            .map(|r| r[0].text())
            .collect();
        assert_eq!(names, vec!["R1", "R2", "R3"]);

        let removed = form.remove_row("langs", 1);
        assert_eq!(removed.len(), 2);
        let names: Vec<String> = form
            .rows("langs")
            .iter()
            .map(|r| r[0].text())
            .collect();
        assert_eq!(names, vec!["R1", "R3"]);
        assert_eq!(form.cell("langs", 1, "language").unwrap().text(), "R3");
    }

    #[test]
    fn remove_last_row_leaves_empty_table_that_can_grow_again() {
        let mut form = sample_form();
        form.remove_row("langs", 0);
        assert_eq!(form.row_count("langs"), 0);
        assert!(form.rows("langs").is_empty());
        assert_eq!(form.add_row("langs"), Some(0));
        assert!(form.cell("langs", 0, "speak").is_some());
    }

    #[test]
    fn draw_form_renders_labels_errors_and_submit() {
        let mut form = sample_form();
        form.set_text("city", "Kochi");
        form.fields[0].error = Some("Please enter a valid city.".into());
        let backend = TestBackend::new(60, 20);
        let mut terminal = Terminal::new(backend).unwrap();
        let _ = terminal.draw(|f| {
            let area = f.area();
            draw_form(f, area, &mut form, 0, true, false);
        });
        let buf = terminal.backend().buffer().clone();
        let mut text = String::new();
        for y in 0..buf.area.height {
            for x in 0..buf.area.width {
                text.push_str(buf[(x, y)].symbol());
            }
            text.push('\n');
        }
        assert!(text.contains("City: Kochi"));
        assert!(text.contains("! Please enter a valid city."));
        assert!(text.contains("== Languages =="));
        assert!(text.contains("#1 Language"));
        assert!(text.contains("[ Submit ]"));
    }

    #[test]
    fn new_form_numbers_fields_from_one() {
        let mut form = FormState::new("Title", Vec::new());
        assert_eq!(form.title, "Title");
        assert_eq!(form.push_field(FormField::new("a", "A", 0, FieldKind::Text)), 1);
        assert_eq!(form.push_field(FormField::new("b", "B", 0, FieldKind::Text)), 2);
    }

    #[test]
    fn textarea_preview_is_capped() {
        let mut form = FormState::new(
            "T",
            vec![TabInfo {
                title: "Main".into(),
                visible: true,
            }],
        );
        form.push_field(FormField::new(
            "notes",
            "Notes",
            0,
            FieldKind::TextArea { preview_lines: 2 },
        ));
        form.set_text("notes", "first\nsecond\nthird");
        let mut terminal = Terminal::new(TestBackend::new(40, 10)).unwrap();
        let _ = terminal.draw(|f| {
            let area = f.area();
            draw_form(f, area, &mut form, 0, true, false);
        });
        let buf = terminal.backend().buffer().clone();
        let mut text = String::new();
        for y in 0..buf.area.height {
            for x in 0..buf.area.width {
                text.push_str(buf[(x, y)].symbol());
            }
            text.push('\n');
        }
        assert!(text.contains("second"));
        assert!(!text.contains("third"));
    }
}
