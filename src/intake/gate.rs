use crate::error::{BackendError, GateError};
use crate::intake::assembler::assemble;
use crate::intake::attachment::AttachmentSlots;
use crate::intake::profile::Profile;
use crate::intake::sanitize::Sanitizer;
use crate::intake::validator::{validate, Snapshot, ValidationMode, Violation};
use crate::services::backend::SubmitStatus;
use crate::widgets::form::FormState;
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GatePhase {
    #[default]
    Idle,
    Validating,
    EncodingWait,
    Assembling,
    Submitting,
    Succeeded,
    Failed,
}

impl GatePhase {
    pub fn as_str(self) -> &'static str {
        match self {
            GatePhase::Idle => "idle",
            GatePhase::Validating => "validating",
            GatePhase::EncodingWait => "encoding_wait",
            GatePhase::Assembling => "assembling",
            GatePhase::Submitting => "submitting",
            GatePhase::Succeeded => "succeeded",
            GatePhase::Failed => "failed",
        }
    }
}

/// Everything one pass through the gate reads.
pub struct GateContext<'a> {
    pub profile: &'static Profile,
    pub form: &'a FormState,
    pub slots: &'a AttachmentSlots,
    pub sanitizer: &'a dyn Sanitizer,
    pub docname: &'a str,
    pub size_limit_kb: f64,
    pub mode: ValidationMode,
}

/// A payload cleared for exactly one backend call.
#[derive(Debug)]
pub struct SubmitTicket {
    pub payload: JsonValue,
    pub docname: String,
    pub attempt: u32,
}

#[derive(Debug)]
pub enum Outcome {
    /// Backend acknowledged and the declaration is confirmed.
    Completed { notice: String },
    /// Backend acknowledged but the confirmation box is unticked.
    Unconfirmed { notice: String },
    Failed(GateError),
    /// A result arrived while no submission was outstanding.
    Ignored,
}

#[derive(Debug, Default)]
pub struct SubmissionGate {
    phase: GatePhase,
    attempts: u32,
    violations: Vec<Violation>,
}

impl SubmissionGate {
    pub fn phase(&self) -> GatePhase {
        self.phase
    }

    pub fn is_submitting(&self) -> bool {
        self.phase == GatePhase::Submitting
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Violations found by the last validation pass (all of them in `all` mode).
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    fn transition(&mut self, to: GatePhase) {
        debug!(from = self.phase.as_str(), to = to.as_str(), "gate transition");
        self.phase = to;
    }

    fn reject(&mut self, err: GateError) -> Result<SubmitTicket, GateError> {
        warn!(error = %err, "submission stopped");
        self.transition(GatePhase::Failed);
        self.transition(GatePhase::Idle);
        Err(err)
    }

    /// One submit intent. On success the caller must hand the ticket to the
    /// backend exactly once and later report back through [`finish`].
    ///
    /// [`finish`]: SubmissionGate::finish
    pub fn begin(&mut self, ctx: &GateContext<'_>) -> Result<SubmitTicket, GateError> {
        match self.phase {
            GatePhase::Submitting => return Err(GateError::InFlight),
            GatePhase::Succeeded => return Err(GateError::Completed),
            _ => {}
        }
        self.transition(GatePhase::Validating);
        let snap = Snapshot {
            profile: ctx.profile,
            form: ctx.form,
            slots: ctx.slots,
            sanitizer: ctx.sanitizer,
        };
        self.violations = validate(&snap, ctx.mode);
        if let Some(first) = self.violations.first().cloned() {
            return self.reject(GateError::Validation(first));
        }

        self.transition(GatePhase::EncodingWait);
        let pending = ctx.slots.in_flight();
        if pending > 0 {
            return self.reject(GateError::EncodingNotReady { pending });
        }
        if let Some(err) = oversized(ctx) {
            return self.reject(err);
        }

        self.transition(GatePhase::Assembling);
        let payload = assemble(ctx.profile, ctx.form, ctx.slots, ctx.sanitizer, ctx.docname);
        self.attempts += 1;
        self.transition(GatePhase::Submitting);
        info!(attempt = self.attempts, docname = ctx.docname, "submitting application");
        Ok(SubmitTicket {
            payload,
            docname: ctx.docname.to_string(),
            attempt: self.attempts,
        })
    }

    pub fn finish(&mut self, result: Result<SubmitStatus, BackendError>, confirmed: bool) -> Outcome {
        if self.phase != GatePhase::Submitting {
            debug!(phase = self.phase.as_str(), "ignoring backend result");
            return Outcome::Ignored;
        }
        match result {
            Ok(status) if confirmed => {
                self.transition(GatePhase::Succeeded);
                Outcome::Completed {
                    notice: status.notice().to_string(),
                }
            }
            Ok(status) => {
                // the record is already stored; only the local completion is withheld
                warn!("backend accepted an unconfirmed submission");
                self.transition(GatePhase::Idle);
                Outcome::Unconfirmed {
                    notice: status.notice().to_string(),
                }
            }
            Err(e) => {
                warn!(error = %e, "backend call failed");
                self.transition(GatePhase::Failed);
                self.transition(GatePhase::Idle);
                Outcome::Failed(GateError::Backend(e))
            }
        }
    }
}

/// First file, in form order, larger than the limit. A non-positive limit disables the check.
fn oversized(ctx: &GateContext<'_>) -> Option<GateError> {
    if ctx.size_limit_kb <= 0.0 {
        return None;
    }
    let max_bytes = ctx.size_limit_kb * 1024.0;
    ctx.form
        .fields
        .iter()
        .filter(|f| f.is_file())
        .flat_map(|f| ctx.slots.descriptors(f.uid))
        .find(|d| d.size as f64 > max_bytes)
        .map(|d| GateError::SizeLimit {
            filename: d.filename.clone(),
            limit_kb: ctx.size_limit_kb,
        })
}
