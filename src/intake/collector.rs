use crate::intake::attachment::AttachmentSlots;
use crate::intake::profile::{Profile, TableSpec};
use crate::intake::sanitize::Sanitizer;
use crate::widgets::form::{FieldKind, FormState};
use serde_json::{json, Map, Value as JsonValue};

/// `{"files_data": [...]}` for a slot with descriptors, null otherwise.
pub fn files_data(slots: &AttachmentSlots, uid: u64) -> JsonValue {
    let found = slots.descriptors(uid);
    if found.is_empty() {
        JsonValue::Null
    } else {
        json!({ "files_data": found })
    }
}

/// Rows of one table in display order. Cells carry sanitized text, a file
/// column becomes its `files_data` object.
pub fn collect_table(
    spec: &TableSpec,
    form: &FormState,
    slots: &AttachmentSlots,
    sanitizer: &dyn Sanitizer,
) -> Vec<JsonValue> {
    let mut out = Vec::new();
    for row in form.rows(spec.id) {
        if let Some(primary) = spec.primary {
            let key = row
                .iter()
                .find(|c| c.name == primary)
                .map(|c| sanitizer.sanitize(&c.text()))
                .unwrap_or_default();
            if key.trim().is_empty() {
                continue;
            }
        }
        let mut rec = Map::new();
        for col in spec.columns {
            let Some(cell) = row.iter().find(|c| c.name == col.name) else {
                continue;
            };
            let value = if matches!(cell.kind, FieldKind::File { .. }) {
                files_data(slots, cell.uid)
            } else {
                let v = sanitizer.sanitize(&cell.text());
                if v.is_empty() {
                    col.fallback.to_json()
                } else {
                    JsonValue::String(v)
                }
            };
            rec.insert(col.name.to_string(), value);
        }
        out.push(JsonValue::Object(rec));
    }
    out
}

/// Every table of the profile, keyed by table id. Empty tables map to `[]`.
pub fn collect_tables(
    profile: &Profile,
    form: &FormState,
    slots: &AttachmentSlots,
    sanitizer: &dyn Sanitizer,
) -> Map<String, JsonValue> {
    profile
        .tables
        .iter()
        .map(|t| {
            (
                t.id.to_string(),
                JsonValue::Array(collect_table(t, form, slots, sanitizer)),
            )
        })
        .collect()
}
