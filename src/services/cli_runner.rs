use crate::error::BackendError;
use regex::Regex;
use serde_json::Value as JsonValue;
use std::io::{self, Write};
use std::process::{Command, Stdio};
use std::sync::OnceLock;
use std::thread;
use std::{collections::HashMap, env};

fn env_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([A-Z0-9_]+)\}").expect("static regex"))
}

pub(crate) fn expand_cmdline_env(cmdline: &str) -> String {
    // Expand ${VAR} from environment; ${APP_BIN} falls back to
    // ONBOARD_APP_BIN (quoted if it contains whitespace) or "onboard-backend"
    let env_map: HashMap<String, String> = env::vars().collect();
    env_pattern()
        .replace_all(cmdline, |caps: &regex::Captures| {
            let key = &caps[1];
            if key == "APP_BIN" {
                if let Some(v) = env_map.get("ONBOARD_APP_BIN") {
                    // Quote if contains whitespace to keep it a single arg in shlex::split
                    if v.chars().any(|c| c.is_whitespace()) {
                        let escaped = v.replace('"', "\\\"");
                        return format!("\"{escaped}\"");
                    }
                    return v.to_string();
                }
                return "onboard-backend".to_string();
            }
            env_map.get(key).cloned().unwrap_or_default()
        })
        .to_string()
}

pub(crate) fn split_cmdline(cmdline: &str) -> Result<Vec<String>, BackendError> {
    let expanded = expand_cmdline_env(cmdline);
    let parts = shlex::split(&expanded)
        .ok_or_else(|| BackendError::Spawn(format!("cannot parse command line: {cmdline}")))?;
    if parts.is_empty() {
        return Err(BackendError::Spawn("empty command line".into()));
    }
    Ok(parts)
}

/// Run a command, optionally feeding `stdin`, and parse its stdout as JSON.
///
/// A failing command whose stderr is itself a JSON envelope is reported as a
/// rejection carrying the envelope's message.
pub fn run_cmdline_to_json(
    cmdline: &str,
    stdin: Option<&str>,
    envs: &[(&str, String)],
) -> Result<JsonValue, BackendError> {
    let parts = split_cmdline(cmdline)?;
    let program = &parts[0];
    let args = &parts[1..];
    let mut cmd = Command::new(program);
    cmd.args(args)
        .env("ONBOARD_TUI_JSON", "1")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
    for (k, v) in envs {
        cmd.env(k, v);
    }
    let mut child = cmd
        .spawn()
        .map_err(|e| BackendError::Spawn(format!("{program}: {e}")))?;
    // stdin is fed from a helper thread while stdout and stderr drain
    let writer = match (stdin, child.stdin.take()) {
        (Some(body), Some(mut pipe)) => {
            let body = body.to_owned();
            // dropping the pipe at thread end closes stdin so the child sees EOF
            Some(thread::spawn(move || pipe.write_all(body.as_bytes())))
        }
        _ => None,
    };
    let output = child
        .wait_with_output()
        .map_err(|e| BackendError::Spawn(format!("{program}: {e}")))?;
    let write_result = match writer {
        Some(handle) => handle
            .join()
            .unwrap_or_else(|_| Err(io::Error::new(io::ErrorKind::Other, "stdin writer panicked"))),
        None => Ok(()),
    };
    match write_result {
        Ok(()) => {}
        // the child stopped reading; its exit status and stderr say why
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
            tracing::debug!(program = %program, "child closed stdin early");
        }
        Err(e) if output.status.success() => {
            return Err(BackendError::Spawn(format!("writing stdin: {e}")));
        }
        Err(e) => tracing::debug!(program = %program, "stdin write failed: {e}"),
    }
    if !output.status.success() {
        let err_text = String::from_utf8_lossy(&output.stderr).to_string();
        if let Ok(v) = serde_json::from_str::<JsonValue>(&err_text) {
            if let Some(msg) = v.get("message").and_then(|m| m.as_str()) {
                return Err(BackendError::Rejected(msg.to_string()));
            }
        }
        return Err(BackendError::Failed {
            status: output.status.to_string(),
            stderr: err_text.trim().to_string(),
        });
    }
    let text = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(text.trim()).map_err(|e| BackendError::Envelope(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_env_and_app_bin_default() {
        std::env::set_var("ONBOARD_TEST_DOC", "JA-7");
        let s = expand_cmdline_env("${APP_BIN} submit --doc ${ONBOARD_TEST_DOC} ${ONBOARD_UNSET_X}");
        assert!(s.starts_with("onboard-backend submit --doc JA-7"));
        assert!(s.trim_end().ends_with("JA-7"));
    }

    #[test]
    fn empty_command_is_a_spawn_error() {
        assert!(matches!(split_cmdline("   "), Err(BackendError::Spawn(_))));
        assert!(matches!(split_cmdline("echo \"open"), Err(BackendError::Spawn(_))));
    }

    #[cfg(unix)]
    #[test]
    fn pipes_stdin_and_parses_stdout() {
        let v = run_cmdline_to_json("cat", Some(r#"{"ok": true, "message": "success"}"#), &[])
            .unwrap();
        assert_eq!(v["message"], "success");
    }

    #[cfg(unix)]
    #[test]
    fn passes_extra_env_and_json_flag() {
        let v = run_cmdline_to_json(
            r#"sh -c 'printf "{\"doc\":\"%s\",\"json\":\"%s\"}" "$ONBOARD_DOCNAME" "$ONBOARD_TUI_JSON"'"#,
            None,
            &[("ONBOARD_DOCNAME", "JA-9".to_string())],
        )
        .unwrap();
        assert_eq!(v["doc"], "JA-9");
        assert_eq!(v["json"], "1");
    }

    #[cfg(unix)]
    #[test]
    fn failing_command_maps_stderr() {
        let err = run_cmdline_to_json(r#"sh -c 'echo boom >&2; exit 3'"#, None, &[]).unwrap_err();
        match err {
            BackendError::Failed { stderr, .. } => assert_eq!(stderr, "boom"),
            other => panic!("unexpected {other:?}"),
        }
        let err = run_cmdline_to_json(
            r#"sh -c 'echo "{\"message\": \"duplicate\"}" >&2; exit 1'"#,
            None,
            &[],
        )
        .unwrap_err();
        assert!(matches!(err, BackendError::Rejected(m) if m == "duplicate"));
    }

    #[cfg(unix)]
    #[test]
    fn early_exit_with_large_body_keeps_the_rejection() {
        // far larger than a pipe buffer, and the child never reads it
        let body = "A".repeat(4 * 1024 * 1024);
        let err = run_cmdline_to_json(
            r#"sh -c 'echo "{\"message\": \"duplicate\"}" >&2; exit 1'"#,
            Some(&body),
            &[],
        )
        .unwrap_err();
        assert!(matches!(err, BackendError::Rejected(ref m) if m == "duplicate"), "{err:?}");
    }

    #[cfg(unix)]
    #[test]
    fn large_body_is_fully_delivered() {
        let body = format!(r#"{{"ok": true, "blob": "{}"}}"#, "B".repeat(2 * 1024 * 1024));
        let v = run_cmdline_to_json("cat", Some(&body), &[]).unwrap();
        assert_eq!(v["blob"].as_str().map(str::len), Some(2 * 1024 * 1024));
    }

    #[cfg(unix)]
    #[test]
    fn non_json_stdout_is_an_envelope_error() {
        let err = run_cmdline_to_json("echo hello", None, &[]).unwrap_err();
        assert!(matches!(err, BackendError::Envelope(_)));
    }
}
