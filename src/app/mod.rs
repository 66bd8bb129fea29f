use crate::error::{BackendError, GateError};
use crate::intake::attachment::{Completion, EncodeJob};
use crate::intake::gate::{GateContext, Outcome, SubmitTicket};
use crate::services::backend::SubmitStatus;
use crate::services::encoder::EncodeMsg;
use crate::ui::{AppState, ToastLevel, View};
use crate::widgets::form_widget::FormIntent;
use crossterm::event::KeyCode;
use std::path::PathBuf;
use tracing::{debug, info, warn};

pub const UNCONFIRMED_BANNER: &str = "Please confirm the declaration before final submission.";

pub enum AppMsg {
    Key(KeyCode),
    /// Ctrl+S inside the textarea editor.
    SaveTextArea,
    SubmitRequested,
    FilesSelected {
        uid: u64,
        paths: Vec<PathBuf>,
    },
    FilesEncoded(EncodeMsg),
    SubmitDone {
        attempt: u32,
        result: Result<SubmitStatus, BackendError>,
    },
    LoadedSizeLimit(Result<Option<f64>, BackendError>),
}

#[allow(clippy::large_enum_variant)]
pub enum Effect {
    EncodeFile(EncodeJob),
    SubmitApplication {
        ticket: SubmitTicket,
    },
    LoadSizeLimit,
    ShowToast {
        text: String,
        level: ToastLevel,
        seconds: u64,
    },
}

fn toast(effects: &mut Vec<Effect>, text: impl Into<String>, level: ToastLevel) {
    effects.push(Effect::ShowToast {
        text: text.into(),
        level,
        seconds: 4,
    });
}

pub fn update(state: &mut AppState, msg: AppMsg) -> Vec<Effect> {
    use AppMsg::*;
    let mut effects: Vec<Effect> = Vec::new();
    match msg {
        Key(code) => on_key(state, code, &mut effects),
        SaveTextArea => {
            let tab = state.tabs.active();
            if state.form.commit_textarea(tab) {
                state.dbg("textarea saved");
            }
        }
        SubmitRequested => submit(state, &mut effects),
        FilesSelected { uid, paths } => {
            let jobs = state.slots.begin_selection(uid, paths);
            if jobs.is_empty() {
                state.dbg(format!("slot {uid} cleared"));
            } else {
                state.dbg(format!("slot {uid}: reading {} file(s)", jobs.len()));
            }
            if let Some(f) = state
                .form
                .form
                .position_of_uid(uid)
                .map(|i| &mut state.form.form.fields[i])
            {
                f.error = None;
            }
            effects.extend(jobs.into_iter().map(Effect::EncodeFile));
        }
        FilesEncoded(m) => {
            let failed = m.outcome.is_err();
            match state.slots.complete(m.slot, m.generation, m.index, m.outcome) {
                Completion::Stale => {
                    debug!(slot = m.slot, generation = m.generation, "stale encode dropped");
                    state.dbg(format!("slot {}: stale read dropped", m.slot));
                }
                Completion::Applied => {
                    if failed {
                        let err = state.slots.failure(m.slot).unwrap_or("unreadable").to_string();
                        state.dbg(format!("slot {}: read failed: {err}", m.slot));
                        toast(&mut effects, format!("Could not read file: {err}"), ToastLevel::Error);
                    } else if state.slots.in_flight() == 0 {
                        state.dbg("all attachments ready");
                    }
                }
            }
        }
        SubmitDone { attempt, result } => finish(state, attempt, result, &mut effects),
        LoadedSizeLimit(result) => {
            state.size_limit_pending = false;
            size_limit_loaded(state, result);
        }
    }
    effects
}

fn size_limit_loaded(state: &mut AppState, result: Result<Option<f64>, BackendError>) {
    match result {
        Ok(Some(kb)) => {
            info!(limit_kb = kb, "attachment size limit loaded");
            state.size_limit_kb = kb;
            state.dbg(format!("size limit: {kb} KB"));
        }
        Ok(None) => {
            state.dbg(format!(
                "size limit: using configured {} KB",
                state.size_limit_kb
            ));
        }
        Err(e) => {
            state.dbg(format!("size limit lookup failed: {e}"));
        }
    }
}

fn on_key(state: &mut AppState, code: KeyCode, effects: &mut Vec<Effect>) {
    if state.view == View::Success {
        return;
    }
    let editing = state.form.form.editing;
    match code {
        KeyCode::F(n) if !editing => {
            state.tabs.function_key(&mut state.form.form, n);
            return;
        }
        KeyCode::Tab if !editing => {
            state.tabs.next(&mut state.form.form);
            return;
        }
        KeyCode::BackTab if !editing => {
            state.tabs.prev(&mut state.form.form);
            return;
        }
        _ => {}
    }
    let tab = state.tabs.active();
    for intent in state.form.on_key(code, tab) {
        match intent {
            FormIntent::Submit => submit(state, effects),
            FormIntent::SelectFiles { uid, paths } => {
                effects.extend(update(state, AppMsg::FilesSelected { uid, paths }));
            }
            FormIntent::RowsRemoved { uids } => {
                state.slots.clear_many(&uids);
                state.dbg(format!("row removed ({} cells)", uids.len()));
            }
            FormIntent::Toast { text, level } => toast(effects, text, level),
        }
    }
}

pub const SIZE_LIMIT_WAIT: &str = "Please wait, checking the upload size limit.";

fn submit(state: &mut AppState, effects: &mut Vec<Effect>) {
    if state.gate.is_submitting() {
        state.dbg("submit ignored: already submitting");
        return;
    }
    // the attachment size check needs the looked-up limit
    if state.size_limit_pending {
        state.dbg("submit held: size limit lookup outstanding");
        toast(effects, SIZE_LIMIT_WAIT, ToastLevel::Info);
        return;
    }
    state.form.form.clear_errors();
    state.form.form.banner = None;
    let ctx = GateContext {
        profile: state.profile,
        form: &state.form.form,
        slots: &state.slots,
        sanitizer: &state.sanitizer,
        docname: &state.docname,
        size_limit_kb: state.size_limit_kb,
        mode: state.config.validation_mode,
    };
    match state.gate.begin(&ctx) {
        Ok(ticket) => {
            state.dbg(format!("submit attempt {}", ticket.attempt));
            state.form.form.disabled = true;
            state.form.form.editing = false;
            state.form.form.message = Some("Submitting...".into());
            state.status_text = Some("Submitting...".into());
            effects.push(Effect::SubmitApplication { ticket });
        }
        Err(err) => reject(state, err, effects),
    }
}

fn reject(state: &mut AppState, err: GateError, effects: &mut Vec<Effect>) {
    state.dbg(format!("submit stopped: {err}"));
    match &err {
        GateError::Validation(first) => {
            let marks: Vec<(u64, String)> = state
                .gate
                .violations()
                .iter()
                .map(|v| (v.uid, v.message.clone()))
                .collect();
            for (uid, msg) in marks {
                if let Some(i) = state.form.form.position_of_uid(uid) {
                    state.form.form.fields[i].error.get_or_insert(msg);
                }
            }
            state
                .tabs
                .focus_field(&mut state.form.form, first.uid, first.tab);
            toast(effects, err.to_string(), ToastLevel::Error);
        }
        GateError::EncodingNotReady { .. } | GateError::Completed => {
            toast(effects, err.to_string(), ToastLevel::Info);
        }
        GateError::InFlight => {}
        GateError::SizeLimit { .. } | GateError::Backend(_) => {
            state.last_error = Some(err.to_string());
            toast(effects, err.to_string(), ToastLevel::Error);
        }
    }
}

fn finish(
    state: &mut AppState,
    attempt: u32,
    result: Result<SubmitStatus, BackendError>,
    effects: &mut Vec<Effect>,
) {
    if attempt != state.gate.attempts() {
        state.dbg(format!("late result for attempt {attempt} ignored"));
        return;
    }
    let confirmed = state
        .profile
        .confirm_field
        .map(|name| state.form.form.checked(name))
        .unwrap_or(true);
    state.status_text = None;
    state.form.form.disabled = false;
    state.form.form.message = None;
    match state.gate.finish(result, confirmed) {
        Outcome::Completed { notice } => {
            state.last_error = None;
            state.view = View::Success;
            state.success_text = Some(
                state
                    .config
                    .success_text
                    .clone()
                    .unwrap_or_else(|| state.profile.success_text.to_string()),
            );
            state.dbg(format!("submitted: {notice}"));
            toast(effects, notice, ToastLevel::Success);
        }
        Outcome::Unconfirmed { notice } => {
            state.form.form.banner = Some(UNCONFIRMED_BANNER.to_string());
            state.dbg(format!("submitted without confirmation: {notice}"));
            toast(effects, notice, ToastLevel::Info);
        }
        Outcome::Failed(err) => {
            warn!(
                retryable = err.is_retryable(),
                backend = err.crossed_boundary(),
                "submission failed: {err}"
            );
            if let GateError::Backend(e) = &err {
                state.dbg(format!("backend error: {e}"));
            }
            state.last_error = Some(err.to_string());
            toast(effects, err.to_string(), ToastLevel::Error);
        }
        Outcome::Ignored => {}
    }
}

// Keep test module at the very end to satisfy clippy::items-after-test-module
#[cfg(test)]
mod tests;
