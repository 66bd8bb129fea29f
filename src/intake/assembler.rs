use crate::intake::attachment::AttachmentSlots;
use crate::intake::collector::{collect_tables, files_data};
use crate::intake::profile::{Profile, SlotShape};
use crate::intake::sanitize::Sanitizer;
use crate::widgets::form::{FieldKind, FormState};
use serde_json::{Map, Value as JsonValue};

/// Build the single submission record. Only allow-listed fields, flags,
/// tables and attachment slots of the profile are ever written.
pub fn assemble(
    profile: &Profile,
    form: &FormState,
    slots: &AttachmentSlots,
    sanitizer: &dyn Sanitizer,
    docname: &str,
) -> JsonValue {
    let mut data = Map::new();
    data.insert("docname".into(), JsonValue::String(docname.to_string()));
    for name in profile.allow_list {
        let value = match form.field(name) {
            Some(f) if matches!(f.kind, FieldKind::Checkbox) => JsonValue::from(u8::from(f.checked())),
            Some(f) => JsonValue::String(sanitizer.sanitize(&f.text())),
            None => JsonValue::String(String::new()),
        };
        data.insert((*name).to_string(), value);
    }
    for (key, checkbox) in profile.flags {
        data.insert(
            (*key).to_string(),
            JsonValue::from(u8::from(form.checked(checkbox))),
        );
    }
    data.extend(collect_tables(profile, form, slots, sanitizer));
    for slot in profile.slots {
        let Some(f) = form.field(slot.field) else {
            continue;
        };
        let value = match slot.shape {
            SlotShape::FilesData => files_data(slots, f.uid),
            SlotShape::List => JsonValue::from(
                slots
                    .descriptors(f.uid)
                    .into_iter()
                    .map(|d| serde_json::to_value(d).unwrap_or(JsonValue::Null))
                    .collect::<Vec<_>>(),
            ),
        };
        data.insert(slot.field.to_string(), value);
    }
    JsonValue::Object(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::attachment::AttachmentDescriptor;
    use crate::intake::profile::{build_form, FormOptions, ProfileKind};
    use crate::intake::sanitize::MarkupSanitizer;
    use serde_json::json;

    fn options() -> FormOptions {
        FormOptions {
            languages: vec!["English".into()],
            aadhaar_visible: false,
            employer_visible: true,
        }
    }

    #[test]
    fn payload_holds_allow_list_flags_tables_and_slots() {
        let p = Profile::get(ProfileKind::Onboarding);
        let mut form = build_form(p, &options());
        form.set_text("current_city", "Kochi<script>x()</script>");
        form.set_checked("abroad_checkbox", true);
        form.set_checked("political_org_checkbox", true);
        form.set_checked("confirm", true);
        let uid = form.field("payslip_month_2").unwrap().uid;
        let mut slots = AttachmentSlots::default();
        let jobs = slots.begin_selection(uid, vec!["aug.pdf".into()]);
        slots.complete(
            uid,
            jobs[0].generation,
            0,
            Ok(AttachmentDescriptor::new("aug.pdf", "data:application/pdf;base64,AA==", 1)),
        );

        let v = assemble(p, &form, &slots, &MarkupSanitizer, "JA-0001");
        assert_eq!(v["docname"], "JA-0001");
        assert_eq!(v["current_city"], "Kochi");
        assert_eq!(v["in_india"], 0);
        assert_eq!(v["abroad"], 1);
        assert_eq!(v["is_form_submitted"], 1);
        assert_eq!(v["political_org_checkbox"], 1);
        assert_eq!(v["achievements_checkbox"], 0);
        assert_eq!(v["aadhaar_number_input"], "");
        assert!(v["payslip_month_1"].is_null());
        assert_eq!(v["payslip_month_2"]["files_data"][0]["filename"], "aug.pdf");
        assert_eq!(v["prev_emp_his"], json!([]));
    }

    #[test]
    fn nothing_outside_the_allow_list_leaks() {
        let p = Profile::get(ProfileKind::Onboarding);
        let mut form = build_form(p, &options());
        form.set_text("current_city", "Kochi");
        let v = assemble(p, &form, &AttachmentSlots::default(), &MarkupSanitizer, "X");
        let obj = v.as_object().unwrap();
        for key in obj.keys() {
            let known = key == "docname"
                || p.allow_list.contains(&key.as_str())
                || p.flags.iter().any(|(k, _)| k == key)
                || p.tables.iter().any(|t| t.id == key)
                || p.slots.iter().any(|s| s.field == key);
            assert!(known, "unexpected key {key}");
        }
        assert!(obj.get("confirm").is_none());
        assert!(obj.get("in_india_checkbox").is_none());
    }

    #[test]
    fn job_application_sends_resume_as_list() {
        let p = Profile::get(ProfileKind::JobApplication);
        let mut form = build_form(p, &options());
        form.set_text("email_id", "asha@example.com");
        let uid = form.field("resume_attachment").unwrap().uid;
        let mut slots = AttachmentSlots::default();
        let jobs = slots.begin_selection(uid, vec!["cv.pdf".into(), "cover.txt".into()]);
        let g = jobs[0].generation;
        slots.complete(uid, g, 1, Ok(AttachmentDescriptor::new("cover.txt", "data:text/plain;base64,", 0)));
        slots.complete(uid, g, 0, Ok(AttachmentDescriptor::new("cv.pdf", "data:application/pdf;base64,", 0)));
        let v = assemble(p, &form, &slots, &MarkupSanitizer, "");
        let names: Vec<&str> = v["resume_attachment"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["filename"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["cv.pdf", "cover.txt"]);
        assert_eq!(v["skill_proficiency"], json!([]));
        assert_eq!(v["email_id"], "asha@example.com");
    }
}
