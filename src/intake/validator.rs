use crate::intake::attachment::AttachmentSlots;
use crate::intake::profile::Profile;
use crate::intake::sanitize::Sanitizer;
use crate::widgets::form::{FormField, FormState};
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

/// What a rule looks at.
#[derive(Clone, Copy, Debug)]
pub enum Target {
    Field(&'static str),
    /// One column of a repeating table, checked row by row.
    Column {
        table: &'static str,
        column: &'static str,
    },
    /// A named set of flat fields sharing one message.
    Group(&'static [&'static str]),
}

#[derive(Clone, Copy, Debug)]
pub enum Shape {
    Digits(usize),
    Email,
    EmailLowerDomain,
}

#[derive(Clone, Copy, Debug)]
pub enum Check {
    Required,
    /// Pattern applies only when a value is present.
    Shape(Shape),
    RequiredShape(Shape),
    AtMost(f64),
    FileSelected,
    /// Row-scoped: required when any of the sibling columns has a value.
    RequiredIfAnySet(&'static [&'static str]),
}

#[derive(Clone, Copy, Debug)]
pub enum When {
    Always,
    FieldVisible(&'static str),
    TabVisible(usize),
    Checked(&'static str),
}

#[derive(Clone, Copy, Debug)]
pub struct Rule {
    pub target: Target,
    pub check: Check,
    pub when: When,
    pub message: &'static str,
}

impl Rule {
    pub const fn new(target: Target, check: Check, message: &'static str) -> Self {
        Self {
            target,
            check,
            when: When::Always,
            message,
        }
    }

    pub const fn when(self, when: When) -> Self {
        Self { when, ..self }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    pub field: String,
    pub row: Option<usize>,
    pub tab: usize,
    pub uid: u64,
    pub message: String,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    #[default]
    FailFast,
    All,
}

trait ViolationSink {
    fn report(&mut self, v: Violation);
    fn stop_early(&self) -> bool;
}

struct FirstViolation {
    found: Option<Violation>,
}

impl ViolationSink for FirstViolation {
    fn report(&mut self, v: Violation) {
        if self.found.is_none() {
            self.found = Some(v);
        }
    }

    fn stop_early(&self) -> bool {
        self.found.is_some()
    }
}

struct AllViolations {
    found: Vec<Violation>,
}

impl ViolationSink for AllViolations {
    fn report(&mut self, v: Violation) {
        self.found.push(v);
    }

    fn stop_early(&self) -> bool {
        false
    }
}

/// Everything the rules read. Values are judged as they will be sent,
/// after sanitizing.
pub struct Snapshot<'a> {
    pub profile: &'static Profile,
    pub form: &'a FormState,
    pub slots: &'a AttachmentSlots,
    pub sanitizer: &'a dyn Sanitizer,
}

/// Run the profile's rules in order. Fail-fast yields at most one violation.
pub fn validate(snap: &Snapshot<'_>, mode: ValidationMode) -> Vec<Violation> {
    match mode {
        ValidationMode::FailFast => {
            let mut sink = FirstViolation { found: None };
            run_rules(snap, &mut sink);
            sink.found.into_iter().collect()
        }
        ValidationMode::All => {
            let mut sink = AllViolations { found: Vec::new() };
            run_rules(snap, &mut sink);
            sink.found
        }
    }
}

fn run_rules(snap: &Snapshot<'_>, sink: &mut impl ViolationSink) {
    for rule in snap.profile.rules {
        if !condition_holds(snap.form, rule.when) {
            continue;
        }
        match rule.target {
            Target::Field(name) => {
                if let Some(f) = snap.form.field(name) {
                    if !passes(snap, f, None, rule.check) {
                        sink.report(violation(snap, f, rule));
                    }
                }
            }
            Target::Group(names) => {
                for name in names {
                    let Some(f) = snap.form.field(name) else {
                        continue;
                    };
                    if !passes(snap, f, None, rule.check) {
                        sink.report(violation(snap, f, rule));
                        if sink.stop_early() {
                            return;
                        }
                    }
                }
            }
            Target::Column { table, column } => {
                for (ri, row) in snap.form.rows(table).iter().enumerate() {
                    let Some(f) = row.iter().find(|c| c.name == column) else {
                        continue;
                    };
                    if !passes(snap, f, Some(row), rule.check) {
                        let mut v = violation(snap, f, rule);
                        v.row = Some(ri);
                        sink.report(v);
                        if sink.stop_early() {
                            return;
                        }
                    }
                }
            }
        }
        if sink.stop_early() {
            return;
        }
    }
}

fn condition_holds(form: &FormState, when: When) -> bool {
    match when {
        When::Always => true,
        When::FieldVisible(name) => form.field(name).map(|f| !f.hidden).unwrap_or(false),
        When::TabVisible(i) => form.tab_visible(i),
        When::Checked(name) => form.checked(name),
    }
}

fn passes(snap: &Snapshot<'_>, f: &FormField, row: Option<&Vec<&FormField>>, check: Check) -> bool {
    let raw = snap.sanitizer.sanitize(&f.text());
    let present = !raw.trim().is_empty();
    match check {
        Check::Required => present,
        Check::Shape(shape) => !present || shape_matches(shape, &raw),
        Check::RequiredShape(shape) => present && shape_matches(shape, &raw),
        Check::AtMost(limit) => match parse_float_prefix(&raw) {
            Some(n) => n <= limit,
            None => true,
        },
        Check::FileSelected => snap.slots.has_selection(f.uid),
        Check::RequiredIfAnySet(siblings) => {
            let any_set = row
                .map(|cells| {
                    cells
                        .iter()
                        .filter(|c| siblings.contains(&c.name.as_str()))
                        .any(|c| !snap.sanitizer.sanitize(&c.text()).trim().is_empty())
                })
                .unwrap_or(false);
            !any_set || present
        }
    }
}

fn violation(snap: &Snapshot<'_>, f: &FormField, rule: &Rule) -> Violation {
    let tab = match &f.row {
        Some(r) => snap.profile.tab_of(&r.table),
        None => snap.profile.tab_of(&f.name),
    }
    .unwrap_or(f.tab);
    Violation {
        field: f.name.clone(),
        row: f.row.as_ref().map(|r| r.index),
        tab,
        uid: f.uid,
        message: rule.message.to_string(),
    }
}

struct Patterns {
    email: Regex,
    email_lower: Regex,
    float_prefix: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        email: Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("static regex"),
        email_lower: Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}$")
            .expect("static regex"),
        float_prefix: Regex::new(r"^[+-]?(Infinity|(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?)")
            .expect("static regex"),
    })
}

pub fn shape_matches(shape: Shape, value: &str) -> bool {
    match shape {
        Shape::Digits(n) => value.len() == n && value.bytes().all(|b| b.is_ascii_digit()),
        Shape::Email => patterns().email.is_match(value),
        Shape::EmailLowerDomain => patterns().email_lower.is_match(value),
    }
}

/// Leading-number parse: "98.5%" reads as 98.5, "abc" reads as nothing.
pub fn parse_float_prefix(value: &str) -> Option<f64> {
    let s = value.trim_start();
    let m = patterns().float_prefix.find(s)?;
    let num = m.as_str();
    if num.ends_with("Infinity") {
        return Some(if num.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        });
    }
    num.parse::<f64>().ok()
}
