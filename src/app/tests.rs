use super::*;
use crate::intake::attachment::{AttachmentDescriptor, SlotStatus};
use crate::intake::gate::GatePhase;
use crate::model::AppConfig;
use crate::nav::flatten::row_of_uid;

fn make_state(employer_visible: bool) -> AppState {
    let cfg = AppConfig {
        current_employer_visible: employer_visible,
        docname: Some("JA-0042".into()),
        ..Default::default()
    };
    let mut st = AppState::new(cfg);
    for (k, v) in [
        ("date_of_birth", "1990-04-01"),
        ("current_house_no", "12B"),
        ("current_city", "Kochi"),
        ("current_perm_post_office", "Edappally"),
        ("current_street", "MG Road"),
        ("current_district", "Ernakulam"),
        ("current_pin", "682024"),
        ("current_locality", "Palarivattom"),
        ("current_state", "Kerala"),
        ("phone_number", "9876543210"),
    ] {
        assert!(st.form.form.set_text(k, v), "missing field {k}");
    }
    st
}

fn submits(effects: &[Effect]) -> usize {
    effects
        .iter()
        .filter(|e| matches!(e, Effect::SubmitApplication { .. }))
        .count()
}

fn ok_result() -> Result<SubmitStatus, BackendError> {
    Ok(SubmitStatus {
        message: Some("success".into()),
    })
}

fn uid(st: &AppState, name: &str) -> u64 {
    st.form.form.field(name).unwrap().uid
}

#[test]
fn valid_submit_emits_one_call_and_ignores_repeats() {
    let mut st = make_state(false);
    let effs = update(&mut st, AppMsg::SubmitRequested);
    assert_eq!(submits(&effs), 1);
    match &effs[0] {
        Effect::SubmitApplication { ticket } => {
            assert_eq!(ticket.docname, "JA-0042");
            assert_eq!(ticket.payload["docname"], "JA-0042");
            assert_eq!(ticket.payload["current_city"], "Kochi");
        }
        _ => panic!("expected submit effect first"),
    }
    assert!(st.form.form.disabled);
    assert_eq!(st.gate.phase(), GatePhase::Submitting);

    // a double press and a keyboard submit are both swallowed
    assert_eq!(submits(&update(&mut st, AppMsg::SubmitRequested)), 0);
    assert_eq!(submits(&update(&mut st, AppMsg::Key(KeyCode::Enter))), 0);
    assert_eq!(st.gate.attempts(), 1);
}

#[test]
fn bad_manager_email_focuses_employer_tab() {
    let mut st = make_state(true);
    st.form.form.set_text("manager_name", "R. Menon");
    st.form.form.set_text("manager_contact_no", "9000000001");
    st.form.form.set_text("manager_email", "bad-email");
    let effs = update(&mut st, AppMsg::SubmitRequested);
    assert_eq!(submits(&effs), 0);
    assert_eq!(st.tabs.active(), 1);
    assert!(st.tabs.has_pending_focus());

    // the render pass settles the cursor
    assert!(st.tabs.settle(&mut st.form.form));
    let target = uid(&st, "manager_email");
    assert_eq!(row_of_uid(&st.form.form, 1, target), Some(st.form.form.selected));
    assert_eq!(
        st.form.form.field("manager_email").unwrap().error.as_deref(),
        Some("Please enter a valid manager email address.")
    );
    assert!(effs.iter().any(|e| matches!(
        e,
        Effect::ShowToast { level: ToastLevel::Error, .. }
    )));
}

#[test]
fn percentage_over_100_stops_before_any_payload() {
    let mut st = make_state(false);
    st.form.form.add_row("education_qualification");
    st.form
        .form
        .set_cell("education_qualification", 0, "result", "105");
    let effs = update(&mut st, AppMsg::SubmitRequested);
    assert_eq!(submits(&effs), 0);
    assert_eq!(st.gate.attempts(), 0);
    assert_eq!(st.gate.phase(), GatePhase::Idle);
    assert_eq!(st.tabs.active(), 3);
    let cell = st
        .form
        .form
        .cell("education_qualification", 0, "result")
        .unwrap();
    assert_eq!(
        cell.error.as_deref(),
        Some("Please enter a percentage less than or equal to 100.")
    );
    assert!(!st.form.form.disabled);
}

#[test]
fn stale_encode_is_dropped_and_submit_waits_for_reads() {
    let mut st = make_state(false);
    let slot = uid(&st, "payslip_month_1");
    let first = update(
        &mut st,
        AppMsg::FilesSelected {
            uid: slot,
            paths: vec!["old.pdf".into()],
        },
    );
    let second = update(
        &mut st,
        AppMsg::FilesSelected {
            uid: slot,
            paths: vec!["new.pdf".into()],
        },
    );
    let job = |effs: &[Effect]| match &effs[0] {
        Effect::EncodeFile(j) => (j.slot, j.generation, j.index),
        _ => panic!("expected an encode job"),
    };
    let (_, g1, _) = job(&first);
    let (_, g2, _) = job(&second);
    assert_ne!(g1, g2);

    // reads still outstanding: submit is refused with the wait notice
    let effs = update(&mut st, AppMsg::SubmitRequested);
    assert_eq!(submits(&effs), 0);
    assert!(effs.iter().any(|e| matches!(
        e,
        Effect::ShowToast { text, .. } if text == "Please wait, files are still being processed!"
    )));

    let _ = update(
        &mut st,
        AppMsg::FilesEncoded(EncodeMsg {
            slot,
            generation: g1,
            index: 0,
            outcome: Ok(AttachmentDescriptor::new("old.pdf", "data:application/pdf;base64,", 3)),
        }),
    );
    assert_eq!(st.slots.status(slot), SlotStatus::Reading);
    assert_eq!(st.slots.in_flight(), 1);

    let _ = update(
        &mut st,
        AppMsg::FilesEncoded(EncodeMsg {
            slot,
            generation: g2,
            index: 0,
            outcome: Ok(AttachmentDescriptor::new("new.pdf", "data:application/pdf;base64,", 3)),
        }),
    );
    assert_eq!(st.slots.status(slot), SlotStatus::Ready);
    let names: Vec<&str> = st
        .slots
        .descriptors(slot)
        .iter()
        .map(|d| d.filename.as_str())
        .collect();
    assert_eq!(names, vec!["new.pdf"]);

    let effs = update(&mut st, AppMsg::SubmitRequested);
    assert_eq!(submits(&effs), 1);
}

#[test]
fn unconfirmed_success_shows_banner_then_confirmed_retry_completes() {
    let mut st = make_state(false);
    let _ = update(&mut st, AppMsg::SubmitRequested);
    let effs = update(
        &mut st,
        AppMsg::SubmitDone {
            attempt: 1,
            result: ok_result(),
        },
    );
    assert_eq!(st.form.form.banner.as_deref(), Some(UNCONFIRMED_BANNER));
    assert_eq!(st.view, View::Form);
    assert_eq!(st.gate.phase(), GatePhase::Idle);
    assert!(!st.form.form.disabled);
    assert!(effs.iter().any(|e| matches!(
        e,
        Effect::ShowToast { text, .. } if text == "Job Applicant updated successfully!"
    )));

    st.form.form.set_checked("confirm", true);
    let effs = update(&mut st, AppMsg::SubmitRequested);
    match &effs[0] {
        Effect::SubmitApplication { ticket } => {
            assert_eq!(ticket.attempt, 2);
            assert_eq!(ticket.payload["is_form_submitted"], 1);
        }
        _ => panic!("expected a second submit"),
    }
    assert!(st.form.form.banner.is_none());
    let _ = update(
        &mut st,
        AppMsg::SubmitDone {
            attempt: 2,
            result: Ok(SubmitStatus { message: None }),
        },
    );
    assert_eq!(st.view, View::Success);
    assert_eq!(st.gate.phase(), GatePhase::Succeeded);
    assert!(st.success_text.is_some());
    // once done, further presses are not resubmitted
    assert_eq!(submits(&update(&mut st, AppMsg::SubmitRequested)), 0);
}

#[test]
fn backend_failure_is_generic_and_retryable() {
    let mut st = make_state(false);
    let _ = update(&mut st, AppMsg::SubmitRequested);
    let _ = update(
        &mut st,
        AppMsg::SubmitDone {
            attempt: 1,
            result: Err(BackendError::Rejected("locked".into())),
        },
    );
    assert_eq!(
        st.last_error.as_deref(),
        Some("An error occurred during submission.")
    );
    assert_eq!(st.gate.phase(), GatePhase::Idle);
    assert_eq!(submits(&update(&mut st, AppMsg::SubmitRequested)), 1);
}

#[test]
fn result_for_an_old_attempt_is_ignored() {
    let mut st = make_state(false);
    let _ = update(&mut st, AppMsg::SubmitRequested);
    let _ = update(
        &mut st,
        AppMsg::SubmitDone {
            attempt: 7,
            result: ok_result(),
        },
    );
    assert_eq!(st.gate.phase(), GatePhase::Submitting);
    assert!(st.form.form.disabled);
}

#[test]
fn function_keys_and_tab_skip_hidden_employer_tab() {
    let mut st = make_state(false);
    assert_eq!(st.tabs.active(), 0);
    let _ = update(&mut st, AppMsg::Key(KeyCode::Tab));
    assert_eq!(st.tabs.active(), 2);
    let _ = update(&mut st, AppMsg::Key(KeyCode::F(1)));
    assert_eq!(st.tabs.active(), 0);
    // F2 is the second visible tab
    let _ = update(&mut st, AppMsg::Key(KeyCode::F(2)));
    assert_eq!(st.tabs.active(), 2);
    let _ = update(&mut st, AppMsg::Key(KeyCode::BackTab));
    assert_eq!(st.tabs.active(), 0);
}

#[test]
fn removing_a_row_releases_its_attachments() {
    let mut st = make_state(false);
    st.tabs.show_section(&mut st.form.form, 3);
    st.form.form.add_row("education_qualification");
    let cell = st
        .form
        .form
        .cell("education_qualification", 0, "attachments")
        .unwrap()
        .uid;
    let _ = update(
        &mut st,
        AppMsg::FilesSelected {
            uid: cell,
            paths: vec!["degree.pdf".into()],
        },
    );
    assert_eq!(st.slots.in_flight(), 1);
    st.form.form.selected = row_of_uid(&st.form.form, 3, cell).unwrap();
    let _ = update(&mut st, AppMsg::Key(KeyCode::Char('-')));
    assert_eq!(st.form.form.row_count("education_qualification"), 0);
    assert_eq!(st.slots.in_flight(), 0);
    assert_eq!(st.slots.status(cell), SlotStatus::Empty);
}

#[test]
fn size_limit_lookup_updates_or_keeps_limit() {
    let mut st = make_state(false);
    assert_eq!(st.size_limit_kb, 10240.0);
    let _ = update(&mut st, AppMsg::LoadedSizeLimit(Ok(Some(512.0))));
    assert_eq!(st.size_limit_kb, 512.0);
    let _ = update(&mut st, AppMsg::LoadedSizeLimit(Ok(None)));
    let _ = update(
        &mut st,
        AppMsg::LoadedSizeLimit(Err(BackendError::Spawn("nope".into()))),
    );
    assert_eq!(st.size_limit_kb, 512.0);
}

#[test]
fn submit_waits_for_outstanding_size_limit_lookup() {
    let mut st = make_state(false);
    st.size_limit_pending = true;
    let effs = update(&mut st, AppMsg::SubmitRequested);
    assert_eq!(submits(&effs), 0);
    assert_eq!(st.gate.attempts(), 0);
    assert!(effs.iter().any(|e| matches!(
        e,
        Effect::ShowToast { text, .. } if text == SIZE_LIMIT_WAIT
    )));

    // a failed lookup still releases the hold, keeping the configured limit
    let _ = update(
        &mut st,
        AppMsg::LoadedSizeLimit(Err(BackendError::Spawn("nope".into()))),
    );
    assert!(!st.size_limit_pending);
    assert_eq!(st.size_limit_kb, 10240.0);
    assert_eq!(submits(&update(&mut st, AppMsg::SubmitRequested)), 1);
}

#[test]
fn looked_up_limit_applies_to_the_next_submit() {
    let mut st = make_state(false);
    st.size_limit_pending = true;
    let slot = uid(&st, "payslip_month_1");
    let jobs = update(
        &mut st,
        AppMsg::FilesSelected {
            uid: slot,
            paths: vec!["big.pdf".into()],
        },
    );
    let generation = match &jobs[0] {
        Effect::EncodeFile(j) => j.generation,
        _ => panic!("expected an encode job"),
    };
    let _ = update(
        &mut st,
        AppMsg::FilesEncoded(EncodeMsg {
            slot,
            generation,
            index: 0,
            outcome: Ok(AttachmentDescriptor::new("big.pdf", "data:application/pdf;base64,", 4096)),
        }),
    );
    let _ = update(&mut st, AppMsg::LoadedSizeLimit(Ok(Some(1.0))));
    let effs = update(&mut st, AppMsg::SubmitRequested);
    assert_eq!(submits(&effs), 0);
    assert!(st.last_error.as_deref().unwrap_or_default().contains("big.pdf"));
}
