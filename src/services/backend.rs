use crate::error::BackendError;
use crate::intake::gate::SubmitTicket;
use crate::services::cli_runner::run_cmdline_to_json;
use serde_json::{json, Value as JsonValue};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use tracing::{info, warn};

/// What the backend said about an accepted submission.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubmitStatus {
    pub message: Option<String>,
}

impl SubmitStatus {
    pub fn notice(&self) -> &'static str {
        if self.message.as_deref() == Some("success") {
            "Job Applicant updated successfully!"
        } else {
            "Submission completed."
        }
    }
}

pub trait Backend: Send + Sync {
    fn submit_application(
        &self,
        payload: &JsonValue,
        docname: &str,
    ) -> Result<SubmitStatus, BackendError>;

    /// Maximum attachment size in KB, when the backend publishes one.
    fn size_limit_kb(&self) -> Result<Option<f64>, BackendError>;
}

/// Backend reached through configured command lines speaking a JSON envelope.
#[derive(Clone, Debug)]
pub struct CliBackend {
    pub submit_cmd: String,
    pub size_limit_cmd: Option<String>,
}

impl Backend for CliBackend {
    fn submit_application(
        &self,
        payload: &JsonValue,
        docname: &str,
    ) -> Result<SubmitStatus, BackendError> {
        // the form data travels as a JSON string inside the request
        let request = json!({
            "form_data": payload.to_string(),
            "docname": docname,
        });
        let body = request.to_string();
        let v = run_cmdline_to_json(
            &self.submit_cmd,
            Some(&body),
            &[("ONBOARD_DOCNAME", docname.to_string())],
        )?;
        parse_envelope(&v)
    }

    fn size_limit_kb(&self) -> Result<Option<f64>, BackendError> {
        let Some(cmd) = &self.size_limit_cmd else {
            return Ok(None);
        };
        let v = run_cmdline_to_json(cmd, None, &[])?;
        parse_envelope(&v)?;
        Ok(size_limit_from_envelope(&v))
    }
}

/// `{"ok": bool, "message" | "data": ...}`; a missing `ok` counts as success.
pub fn parse_envelope(v: &JsonValue) -> Result<SubmitStatus, BackendError> {
    if !v.is_object() {
        return Err(BackendError::Envelope(format!("expected an object, got {v}")));
    }
    let message = v
        .get("message")
        .and_then(|m| m.as_str())
        .or_else(|| v.pointer("/data/message").and_then(|m| m.as_str()))
        .map(str::to_string);
    let ok = v.get("ok").and_then(|b| b.as_bool()).unwrap_or(true);
    if !ok {
        let reason = message
            .or_else(|| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
            .unwrap_or_else(|| "request failed".to_string());
        return Err(BackendError::Rejected(reason));
    }
    Ok(SubmitStatus { message })
}

/// `data.resume_size` or `message.resume_size`, as a number or numeric string.
pub fn size_limit_from_envelope(v: &JsonValue) -> Option<f64> {
    let raw = v
        .pointer("/data/resume_size")
        .or_else(|| v.pointer("/message/resume_size"))?;
    match raw {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => crate::intake::validator::parse_float_prefix(s),
        _ => None,
    }
}

pub fn spawn_submit(
    backend: Arc<dyn Backend>,
    ticket: SubmitTicket,
    tx: Sender<crate::ui::LoadMsg>,
) {
    thread::spawn(move || {
        info!(attempt = ticket.attempt, "backend submit start");
        let result = backend.submit_application(&ticket.payload, &ticket.docname);
        if let Err(e) = &result {
            warn!(error = %e, "backend submit failed");
        }
        let _ = tx.send(crate::ui::LoadMsg::Submitted {
            attempt: ticket.attempt,
            result,
        });
    });
}

pub fn spawn_size_limit(backend: Arc<dyn Backend>, tx: Sender<crate::ui::LoadMsg>) {
    thread::spawn(move || {
        let _ = tx.send(crate::ui::LoadMsg::SizeLimit(backend.size_limit_kb()));
    });
}
