use crate::app::{update, AppMsg, Effect};
use crate::error::BackendError;
use crate::intake::attachment::AttachmentSlots;
use crate::intake::gate::SubmissionGate;
use crate::intake::profile::{build_form, Profile};
use crate::intake::sanitize::MarkupSanitizer;
use crate::model::{validate_app_config, AppConfig};
use crate::nav::tabs::TabNavigator;
use crate::services::backend::{Backend, CliBackend, SubmitStatus};
use crate::services::encoder::EncodeMsg;
use crate::widgets::form_widget::FormWidget;
use crate::widgets::header::draw_header;
use crate::widgets::status_bar::draw_footer_combined;
use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::prelude::*;
use ratatui::widgets::*;
use serde::Deserialize;
use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

const CONFIG_FILE: &str = "onboard.yaml";

/// Results reported by background threads, drained once per tick.
#[derive(Debug)]
pub enum LoadMsg {
    Encoded(EncodeMsg),
    Submitted {
        attempt: u32,
        result: Result<SubmitStatus, BackendError>,
    },
    SizeLimit(Result<Option<f64>, BackendError>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Success,
    Error,
}

pub struct Toast {
    pub text: String,
    pub level: ToastLevel,
    pub expires_at_tick: u64,
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum View {
    #[default]
    Form,
    Success,
}

impl View {
    fn as_str(self) -> &'static str {
        match self {
            View::Form => "form",
            View::Success => "success",
        }
    }
}

pub(crate) struct AppState {
    pub(crate) config: AppConfig,
    pub(crate) profile: &'static Profile,
    pub(crate) form: FormWidget,
    pub(crate) tabs: TabNavigator,
    pub(crate) slots: AttachmentSlots,
    pub(crate) gate: SubmissionGate,
    pub(crate) sanitizer: MarkupSanitizer,
    pub(crate) docname: String,
    pub(crate) size_limit_kb: f64,
    // A size-limit lookup is outstanding; submits wait for it
    pub(crate) size_limit_pending: bool,
    pub(crate) view: View,
    pub(crate) success_text: Option<String>,
    pub(crate) last_error: Option<String>,
    pub(crate) tick: u64,
    pub(crate) status_text: Option<String>,
    pub(crate) toast: Option<Toast>,
    // Number of backend calls actually started
    pub(crate) submitted: u32,
    backend: Option<Arc<dyn Backend>>,
    tx: Option<Sender<LoadMsg>>,
    rx: Option<Receiver<LoadMsg>>,
    pub(crate) theme: crate::theme::Theme,
    // Debug log (rendered in bottom debug pane)
    pub(crate) debug_log: VecDeque<String>,
}

impl AppState {
    pub(crate) fn new(config: AppConfig) -> Self {
        let profile = Profile::get(config.profile);
        let mut form = build_form(profile, &config.form_options());
        let mut tabs = TabNavigator::default();
        tabs.reset(&mut form);
        Self {
            profile,
            form: FormWidget::new(form),
            tabs,
            slots: AttachmentSlots::default(),
            gate: SubmissionGate::default(),
            sanitizer: MarkupSanitizer,
            docname: config.docname.clone().unwrap_or_default(),
            size_limit_kb: config.max_attachment_kb,
            size_limit_pending: false,
            view: View::Form,
            success_text: None,
            last_error: None,
            tick: 0,
            status_text: None,
            toast: None,
            submitted: 0,
            backend: None,
            tx: None,
            rx: None,
            theme: crate::theme::Theme::slate(),
            debug_log: VecDeque::new(),
            config,
        }
    }

    pub fn dbg(&mut self, msg: impl Into<String>) {
        const MAX_LOG_LINES: usize = 200;
        let msg = msg.into();
        tracing::debug!(target: "onboard_tui::ui", "{msg}");
        if self.debug_log.len() >= MAX_LOG_LINES {
            self.debug_log.pop_front();
        }
        self.debug_log.push_back(msg);
    }
}

fn run_effects(state: &mut AppState, effects: Vec<Effect>) {
    for eff in effects {
        match eff {
            Effect::EncodeFile(job) => {
                state.dbg(format!("encode {}", job.path.display()));
                if let Some(tx) = &state.tx {
                    crate::services::encoder::spawn_encode(job, tx.clone());
                }
            }
            Effect::SubmitApplication { ticket } => {
                state.dbg(format!(
                    "submit {} (attempt {})",
                    ticket.docname, ticket.attempt
                ));
                match (&state.backend, &state.tx) {
                    (Some(backend), Some(tx)) => {
                        state.submitted += 1;
                        crate::services::backend::spawn_submit(
                            Arc::clone(backend),
                            ticket,
                            tx.clone(),
                        );
                    }
                    _ => state.dbg("no backend configured"),
                }
            }
            Effect::LoadSizeLimit => {
                if let (Some(backend), Some(tx)) = (&state.backend, &state.tx) {
                    state.size_limit_pending = true;
                    crate::services::backend::spawn_size_limit(Arc::clone(backend), tx.clone());
                }
            }
            Effect::ShowToast {
                text,
                level,
                seconds,
            } => {
                let ticks = seconds.saturating_mul(5); // ~200ms tick
                let exp = state.tick.saturating_add(ticks);
                state.toast = Some(Toast {
                    text,
                    level,
                    expires_at_tick: exp,
                });
            }
        }
    }
}

fn pump(state: &mut AppState) {
    let mut drained: Vec<LoadMsg> = Vec::new();
    if let Some(rx) = &state.rx {
        while let Ok(msg) = rx.try_recv() {
            drained.push(msg);
        }
    }
    for msg in drained {
        let effects = match msg {
            LoadMsg::Encoded(m) => update(state, AppMsg::FilesEncoded(m)),
            LoadMsg::Submitted { attempt, result } => {
                update(state, AppMsg::SubmitDone { attempt, result })
            }
            LoadMsg::SizeLimit(r) => update(state, AppMsg::LoadedSizeLimit(r)),
        };
        run_effects(state, effects);
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes"))
        .unwrap_or(false)
}

pub fn run() -> Result<()> {
    let cfg = load_config()?;
    validate_app_config(&cfg).map_err(|e| anyhow::anyhow!("invalid config: {e}"))?;
    let log_path = crate::logging::log_path(cfg.log_file.as_deref());
    crate::logging::init(log_path.as_deref())?;
    tracing::info!(profile = ?cfg.profile, "starting onboard-tui");

    let mut state = AppState::new(cfg);
    if let Some(doc) = std::env::var("ONBOARD_DOCNAME")
        .ok()
        .filter(|d| !d.trim().is_empty())
    {
        state.docname = doc;
    }
    if state.docname.is_empty() {
        state.dbg("no document id (set ONBOARD_DOCNAME or docname)");
    }
    state.backend = Some(Arc::new(CliBackend {
        submit_cmd: state.config.submit_cmd.clone(),
        size_limit_cmd: state.config.size_limit_cmd.clone(),
    }));
    let (tx, rx) = mpsc::channel::<LoadMsg>();
    state.tx = Some(tx);
    state.rx = Some(rx);
    if state.config.size_limit_cmd.is_some() {
        run_effects(&mut state, vec![Effect::LoadSizeLimit]);
    }

    if env_flag("ONBOARD_TUI_HEADLESS") {
        return run_headless(&mut state);
    }

    // Setup terminal (interactive)
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    let tick_rate = Duration::from_millis(200);
    let mut last_tick = Instant::now();
    let res: Result<()> = loop {
        terminal.draw(|f| ui(f, &mut state))?;
        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != event::KeyEventKind::Press {
                    continue;
                }
                let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
                let editing = state.form.form.editing;
                match key.code {
                    KeyCode::Char('c') if ctrl => break Ok(()),
                    KeyCode::Char('s') if ctrl => {
                        let effs = update(&mut state, AppMsg::SaveTextArea);
                        run_effects(&mut state, effs);
                    }
                    KeyCode::Char('q') if !editing => break Ok(()),
                    KeyCode::Esc if state.view == View::Success => break Ok(()),
                    code => {
                        let effs = update(&mut state, AppMsg::Key(code));
                        run_effects(&mut state, effs);
                    }
                }
            }
        }
        pump(&mut state);
        if last_tick.elapsed() >= tick_rate {
            state.tick = state.tick.wrapping_add(1);
            last_tick = Instant::now();
        }
    };
    // Restore
    disable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    res
}

/// Values poured into the form before a headless submit.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct Prefill {
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    #[serde(default)]
    pub checked: Vec<String>,
    #[serde(default)]
    pub tables: BTreeMap<String, Vec<BTreeMap<String, String>>>,
    #[serde(default)]
    pub files: BTreeMap<String, Vec<PathBuf>>,
}

fn load_prefill(path: &Path) -> Result<Prefill> {
    let s = fs::read_to_string(path).with_context(|| format!("reading prefill {path:?}"))?;
    serde_yaml::from_str(&s).with_context(|| format!("parsing prefill {path:?}"))
}

pub(crate) fn apply_prefill(state: &mut AppState, prefill: Prefill) {
    for (name, value) in &prefill.fields {
        if !state.form.form.set_text(name, value) {
            state.dbg(format!("prefill: no field '{name}' takes '{value}'"));
        }
    }
    for name in &prefill.checked {
        if !state.form.form.set_checked(name, true) {
            state.dbg(format!("prefill: no checkbox '{name}'"));
        }
    }
    for (table, rows) in &prefill.tables {
        for (i, row) in rows.iter().enumerate() {
            while state.form.form.row_count(table) <= i {
                if state.form.form.add_row(table).is_none() {
                    break;
                }
            }
            for (column, value) in row {
                if !state.form.form.set_cell(table, i, column, value) {
                    state.dbg(format!("prefill: no cell {table}[{i}].{column}"));
                }
            }
        }
    }
    for (name, paths) in prefill.files {
        let Some(uid) = state.form.form.field(&name).map(|f| f.uid) else {
            state.dbg(format!("prefill: no file field '{name}'"));
            continue;
        };
        let shown: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
        state.form.form.set_text(&name, &shown.join(" "));
        let effs = update(state, AppMsg::FilesSelected { uid, paths });
        run_effects(state, effs);
    }
}

fn run_headless(state: &mut AppState) -> Result<()> {
    let ticks: u64 = std::env::var("ONBOARD_TUI_TICKS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(10);
    if let Some(path) = std::env::var_os("ONBOARD_TUI_PREFILL") {
        let prefill = load_prefill(Path::new(&path))?;
        apply_prefill(state, prefill);
    }
    let backend = ratatui::backend::TestBackend::new(80, 24);
    let mut terminal = Terminal::new(backend)?;
    let tick_rate = Duration::from_millis(200);
    let mut submit_sent = false;
    for _ in 0..ticks {
        terminal.draw(|f| ui(f, state))?;
        pump(state);
        if !submit_sent && state.slots.in_flight() == 0 && !state.size_limit_pending {
            let effs = update(state, AppMsg::SubmitRequested);
            run_effects(state, effs);
            submit_sent = true;
        }
        state.tick = state.tick.wrapping_add(1);
        std::thread::sleep(tick_rate);
    }
    let violations: Vec<serde_json::Value> = state
        .gate
        .violations()
        .iter()
        .map(|v| serde_json::json!({"field": v.field, "row": v.row, "tab": v.tab, "message": v.message}))
        .collect();
    let summary = serde_json::json!({
        "phase": state.gate.phase().as_str(),
        "error": state.last_error,
        "submitted": state.submitted,
        "view": state.view.as_str(),
        "active_tab": state.tabs.active(),
        "violations": violations,
        "banner": state.form.form.banner,
    });
    println!("{summary}");
    Ok(())
}

fn find_config_file() -> Result<Option<PathBuf>> {
    // 1) ONBOARD_TUI_CONFIG_DIR must contain the file when set
    if let Ok(base) = std::env::var("ONBOARD_TUI_CONFIG_DIR") {
        let entry = PathBuf::from(&base).join(CONFIG_FILE);
        if !entry.exists() {
            anyhow::bail!("ONBOARD_TUI_CONFIG_DIR is set but {entry:?} does not exist");
        }
        return Ok(Some(entry));
    }
    // 2) CWD, CWD/.tui, then <ancestor>/.tui
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    if let Some(p) = discover_from(&cwd) {
        return Ok(Some(p));
    }
    // Last attempt: ~/.tui/onboard.yaml
    if let Some(home) = std::env::var("HOME")
        .ok()
        .or_else(|| std::env::var("USERPROFILE").ok())
        .map(PathBuf::from)
    {
        let p = home.join(".tui").join(CONFIG_FILE);
        if p.exists() {
            return Ok(Some(p));
        }
    }
    Ok(None)
}

pub(crate) fn discover_from(start: &Path) -> Option<PathBuf> {
    let candidates = [
        start.join(CONFIG_FILE),
        start.join(".tui").join(CONFIG_FILE),
    ];
    if let Some(p) = candidates.iter().find(|p| p.exists()) {
        return Some(p.clone());
    }
    let mut cur = start;
    while let Some(parent) = cur.parent() {
        let p = parent.join(".tui").join(CONFIG_FILE);
        if p.exists() {
            return Some(p);
        }
        cur = parent;
    }
    None
}

pub(crate) fn load_config_file(path: &Path) -> Result<AppConfig> {
    let s = fs::read_to_string(path).with_context(|| format!("reading {path:?}"))?;
    serde_yaml::from_str(&s).with_context(|| format!("parsing {path:?}"))
}

/// Built-in defaults apply when no config file is found.
fn load_config() -> Result<AppConfig> {
    match find_config_file()? {
        Some(p) => load_config_file(&p),
        None => Ok(AppConfig::default()),
    }
}

fn ui(f: &mut Frame, state: &mut AppState) {
    // Clear expired toast
    if let Some(t) = &state.toast {
        if state.tick >= t.expires_at_tick {
            state.toast = None;
        }
    }

    let screen = f.area();
    let bg = Block::default().style(Style::default().bg(state.theme.bg));
    f.render_widget(bg, screen);

    const DEBUG_H: u16 = 4;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(2),
            Constraint::Min(0),
            Constraint::Length(DEBUG_H),
            Constraint::Length(1),
        ])
        .split(screen);

    draw_header(f, chunks[0], state);
    crate::widgets::tab_bar::draw_tab_bar(f, chunks[1], state);
    match state.view {
        View::Form => {
            // the tab's rows exist now, so a pending focus can land
            state.tabs.settle(&mut state.form.form);
            let tab = state.tabs.active();
            state.form.render(f, chunks[2], tab, true, state.tick);
        }
        View::Success => draw_success(f, chunks[2], state),
    }
    draw_debug(f, chunks[3], state);
    let help = match state.view {
        View::Form if state.form.form.editing => "Enter/Esc done  Ctrl+S save text  ←/→ choose",
        View::Form => "↑/↓ move  Enter edit  F1-F5/Tab tabs  +/- rows  q quit",
        View::Success => "Esc/q quit",
    };
    draw_footer_combined(f, chunks[4], state, help);
}

fn draw_success(f: &mut Frame, area: Rect, state: &AppState) {
    let block = crate::widgets::chrome::panel_block("Submitted", true);
    let text = state
        .success_text
        .clone()
        .unwrap_or_else(|| state.profile.success_text.to_string());
    let p = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(
            text,
            Style::default()
                .fg(state.theme.success)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!("Reference: {}", state.docname),
            crate::theme::text_muted(),
        )),
    ])
    .alignment(Alignment::Center)
    .block(block);
    f.render_widget(p, area);
}

fn draw_debug(f: &mut Frame, area: Rect, state: &AppState) {
    let b = Block::default()
        .borders(Borders::TOP)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            "Debug",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        ));
    // Take last `area.height` lines
    let h = area.height as usize;
    let total = state.debug_log.len();
    let start = total.saturating_sub(h);
    let lines: Vec<Line> = state
        .debug_log
        .iter()
        .skip(start)
        .map(|s| Line::raw(s.clone()))
        .collect();
    let p = Paragraph::new(lines)
        .style(Style::default().fg(Color::Gray))
        .block(b)
        .wrap(Wrap { trim: true });
    f.render_widget(p, area);
}
