use crate::intake::profile::{FormOptions, ProfileKind};
use crate::intake::validator::ValidationMode;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub header: Option<String>,
    #[serde(default)]
    pub profile: ProfileKind,
    // Fallback when ONBOARD_DOCNAME is not set
    #[serde(default)]
    pub docname: Option<String>,
    #[serde(default = "default_submit_cmd")]
    pub submit_cmd: String,
    // Optional lookup for the attachment size limit (HR settings)
    #[serde(default)]
    pub size_limit_cmd: Option<String>,
    #[serde(default = "default_max_attachment_kb")]
    pub max_attachment_kb: f64,
    #[serde(default)]
    pub aadhaar_visible: bool,
    #[serde(default = "default_true")]
    pub current_employer_visible: bool,
    #[serde(default)]
    pub validation_mode: ValidationMode,
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
    // Overrides the profile's success screen text
    #[serde(default)]
    pub success_text: Option<String>,
    #[serde(default)]
    pub log_file: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            header: Some("ONBOARD".to_string()),
            profile: ProfileKind::default(),
            docname: None,
            submit_cmd: default_submit_cmd(),
            size_limit_cmd: None,
            max_attachment_kb: default_max_attachment_kb(),
            aadhaar_visible: false,
            current_employer_visible: true,
            validation_mode: ValidationMode::default(),
            languages: default_languages(),
            success_text: None,
            log_file: None,
        }
    }
}

impl AppConfig {
    pub fn form_options(&self) -> FormOptions {
        FormOptions {
            languages: self.languages.clone(),
            aadhaar_visible: self.aadhaar_visible,
            employer_visible: self.current_employer_visible,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_submit_cmd() -> String {
    "${APP_BIN} submit-application".to_string()
}

fn default_max_attachment_kb() -> f64 {
    10240.0
}

fn default_languages() -> Vec<String> {
    [
        "English",
        "Hindi",
        "Malayalam",
        "Tamil",
        "Kannada",
        "Telugu",
        "Marathi",
        "Bengali",
        "Gujarati",
        "Urdu",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

pub(crate) fn validate_app_config(cfg: &AppConfig) -> Result<(), String> {
    if cfg.submit_cmd.trim().is_empty() {
        return Err("'submit_cmd' must not be empty".into());
    }
    if !cfg.max_attachment_kb.is_finite() || cfg.max_attachment_kb < 0.0 {
        return Err(format!(
            "'max_attachment_kb' must be zero or positive, got {}",
            cfg.max_attachment_kb
        ));
    }
    if let Some(cmd) = &cfg.size_limit_cmd {
        if cmd.trim().is_empty() {
            return Err("'size_limit_cmd' is set but empty".into());
        }
    }
    if cfg.profile == ProfileKind::Onboarding && cfg.languages.is_empty() {
        return Err("'languages' must list at least one language".into());
    }
    let mut seen = std::collections::HashSet::new();
    for l in &cfg.languages {
        if !seen.insert(l.as_str()) {
            return Err(format!("duplicate language: '{l}'"));
        }
    }
    Ok(())
}
