use crate::widgets::form::{FieldKind, FormState};

/// One selectable line of the active tab.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CursorRow {
    /// Index into `FormState::fields`.
    Field(usize),
    Submit,
}

/// Cursor rows of a tab in display order, the submit button last.
pub fn tab_rows(form: &FormState, tab: usize) -> Vec<CursorRow> {
    let mut out: Vec<CursorRow> = form
        .fields
        .iter()
        .enumerate()
        .filter(|(_, f)| f.tab == tab && !f.hidden)
        .map(|(i, _)| CursorRow::Field(i))
        .collect();
    out.push(CursorRow::Submit);
    out
}

/// Field index under the cursor, if the cursor is not on the submit button.
pub fn selected_field(form: &FormState, tab: usize) -> Option<usize> {
    match tab_rows(form, tab).get(form.selected) {
        Some(CursorRow::Field(i)) => Some(*i),
        _ => None,
    }
}

/// Cursor row of a field uid within a tab.
pub fn row_of_uid(form: &FormState, tab: usize, uid: u64) -> Option<usize> {
    tab_rows(form, tab).iter().position(|r| match r {
        CursorRow::Field(i) => form.fields[*i].uid == uid,
        CursorRow::Submit => false,
    })
}

/// Table the cursor is in: the heading row or any cell of one of its rows.
pub fn table_at(form: &FormState, idx: usize) -> Option<(String, Option<usize>)> {
    let f = form.fields.get(idx)?;
    if matches!(f.kind, FieldKind::TableAnchor) {
        return Some((f.name.clone(), None));
    }
    f.row.as_ref().map(|r| (r.table.clone(), Some(r.index)))
}
