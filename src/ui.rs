use crate::app::{update, AppMsg, Effect};
use crate::model::{AppConfig, FormSchema, Identity};
use crate::services::api::RegisterReply;
use crate::widgets::form_widget::FormWidget;
use crate::widgets::login::LoginWidget;
use crate::widgets::result_viewer::ResultViewerWidget;
use crate::widgets::Widget;
use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

/// Result of one loader thread, drained by the event loop every tick.
pub struct LoadMsg {
    pub kind: LoadKind,
    pub outcome: Result<LoadOutcome, String>,
}

pub enum LoadKind {
    Register { identity: Identity },
    Schema { generation: u64 },
}

pub enum LoadOutcome {
    Registered(RegisterReply),
    Schema(FormSchema),
}

#[derive(Clone, Copy, Debug)]
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
    Login,
    Form,
    Submitted,
}

/// Schema-fetch state machine of the orchestrator.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub(crate) enum FormLoad {
    #[default]
    Idle,
    Loading,
    Ready,
    Failed(String),
}

#[derive(Default)]
pub(crate) struct AppState {
    pub(crate) config: AppConfig,
    pub(crate) identity: Option<Identity>,
    pub(crate) view: View,
    pub(crate) login: LoginWidget,
    pub(crate) form: Option<FormWidget>,
    pub(crate) submitted: Option<ResultViewerWidget>,
    pub(crate) form_load: FormLoad,
    pub(crate) fetch_generation: u64,
    pub(crate) status_text: Option<String>,
    pub(crate) toast: Option<Toast>,
    pub(crate) tick: u64,
    pub(crate) debug_log: VecDeque<String>,
    tx: Option<Sender<LoadMsg>>,
    rx: Option<Receiver<LoadMsg>>,
}

impl AppState {
    pub fn dbg(&mut self, msg: impl Into<String>) {
        const MAX_LOG_LINES: usize = 200;
        if self.debug_log.len() >= MAX_LOG_LINES {
            self.debug_log.pop_front();
        }
        self.debug_log.push_back(msg.into());
    }
}

pub(crate) fn run_effects(state: &mut AppState, effects: Vec<Effect>) {
    for eff in effects {
        match eff {
            Effect::Register { identity } => {
                state.dbg(format!("register roll {}", identity.roll_number));
                state.login.busy = true;
                state.login.api_error = None;
                state.status_text = Some("Logging in...".into());
                if let Some(tx) = &state.tx {
                    crate::services::loader::spawn_register(
                        state.config.endpoint.clone(),
                        identity,
                        tx.clone(),
                    );
                }
            }
            Effect::FetchSchema {
                roll_number,
                generation,
            } => {
                state.dbg(format!("fetch schema for {roll_number} (gen {generation})"));
                if let Some(tx) = &state.tx {
                    crate::services::loader::spawn_fetch_schema(
                        state.config.endpoint.clone(),
                        state.config.schema_file.clone(),
                        roll_number,
                        generation,
                        tx.clone(),
                    );
                }
            }
            Effect::FinalizeSubmit { payload } => {
                state.dbg("form submitted");
                let effs = update(state, AppMsg::Submitted { payload });
                run_effects(state, effs);
            }
            Effect::ShowToast {
                text,
                level,
                seconds,
            } => {
                let ticks = seconds.saturating_mul(5); // ~200ms tick
                state.toast = Some(Toast {
                    text,
                    level,
                    expires_at_tick: state.tick.saturating_add(ticks),
                });
            }
            Effect::CopyToClipboard { text } => match arboard::Clipboard::new() {
                Ok(mut clipboard) => {
                    let _ = clipboard.set_text(text);
                    state.toast = Some(Toast {
                        text: "Copied to clipboard".into(),
                        level: ToastLevel::Info,
                        expires_at_tick: state.tick.saturating_add(10),
                    });
                }
                Err(e) => state.dbg(format!("clipboard: {e}")),
            },
        }
    }
}

/// Drain loader results and feed them through `update`.
fn pump_load_msgs(state: &mut AppState) {
    let mut drained: Vec<LoadMsg> = Vec::new();
    if let Some(rx) = &state.rx {
        while let Ok(msg) = rx.try_recv() {
            drained.push(msg);
        }
    }
    for msg in drained {
        let effects = match msg.kind {
            LoadKind::Register { identity } => {
                let outcome = match msg.outcome {
                    Ok(LoadOutcome::Registered(reply)) => Ok(reply),
                    Ok(_) => Err("unexpected loader payload".to_string()),
                    Err(e) => Err(e),
                };
                update(state, AppMsg::Registered { identity, outcome })
            }
            LoadKind::Schema { generation } => {
                let outcome = match msg.outcome {
                    Ok(LoadOutcome::Schema(schema)) => Ok(schema),
                    Ok(_) => Err("unexpected loader payload".to_string()),
                    Err(e) => Err(e),
                };
                update(state, AppMsg::SchemaLoaded { generation, outcome })
            }
        };
        run_effects(state, effects);
    }
}

/// Handle one key event. Returns true when the app should quit.
fn handle_key(state: &mut AppState, key: event::KeyEvent) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            // Save the textarea overlay, as its title hint promises.
            KeyCode::Char('s') => {
                if let Some(form) = &mut state.form {
                    form.commit_textarea();
                }
            }
            KeyCode::Char('c') => {
                if matches!(state.view, View::Submitted) {
                    if let Some(rv) = &state.submitted {
                        let text = rv.json_pretty.clone();
                        run_effects(state, vec![Effect::CopyToClipboard { text }]);
                    }
                } else {
                    return true;
                }
            }
            KeyCode::Char('q') => return true,
            _ => {}
        }
        return false;
    }

    let editing = match state.view {
        View::Login => state.login.editing,
        View::Form => state.form.as_ref().map(|f| f.editing).unwrap_or(false),
        View::Submitted => false,
    };
    match key.code {
        KeyCode::Esc if !editing => {
            match state.view {
                View::Submitted => {
                    state.submitted = None;
                    state.view = View::Form;
                }
                View::Form => {
                    let effs = update(state, AppMsg::Logout);
                    run_effects(state, effs);
                }
                View::Login => return true,
            }
            return false;
        }
        KeyCode::Char('r')
            if !editing
                && matches!(state.view, View::Form)
                && matches!(state.form_load, FormLoad::Failed(_)) =>
        {
            let effs = update(state, AppMsg::RetrySchemaLoad);
            run_effects(state, effs);
            return false;
        }
        _ => {}
    }

    let effects = match state.view {
        View::Login => state.login.on_key(key.code),
        View::Form => state
            .form
            .as_mut()
            .map(|f| f.on_key(key.code))
            .unwrap_or_default(),
        View::Submitted => state
            .submitted
            .as_mut()
            .map(|r| r.on_key(key.code))
            .unwrap_or_default(),
    };
    run_effects(state, effects);
    false
}

fn help_text(state: &AppState) -> &'static str {
    match state.view {
        View::Login => "↑/↓ move • Enter edit/login • Esc quit",
        View::Form => match state.form_load {
            FormLoad::Failed(_) => "r retry • Esc back to login",
            _ => "↑/↓ move • Enter edit/choose • ←/→ cycle • Esc back",
        },
        View::Submitted => "↑/↓ scroll • Ctrl+C copy • Esc back to form",
    }
}

fn ui(f: &mut Frame, state: &mut AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(f.area());
    crate::widgets::header::draw_header(f, chunks[0], state);

    let tick = state.tick;
    let body = chunks[1];
    match state.view {
        View::Login => {
            let area = centered(body, 52, 12);
            state.login.render(f, area, true, tick);
        }
        View::Form => match state.form_load.clone() {
            FormLoad::Loading => {
                let spinner = ["⠋", "⠙", "⠸", "⠴", "⠦", "⠇"][tick as usize % 6];
                let p = Paragraph::new(format!("{spinner} Loading form..."))
                    .block(crate::widgets::chrome::panel_block("Form", true));
                f.render_widget(p, centered(body, 40, 5));
            }
            FormLoad::Failed(err) => {
                let lines = vec![
                    Line::from(Span::styled(
                        "Failed to load form. Please try again.",
                        crate::theme::text_error(),
                    )),
                    Line::from(Span::styled(err, crate::theme::text_muted())),
                    Line::from(""),
                    Line::from(Span::styled("Press r to retry", crate::theme::text_active_bold())),
                ];
                let p = Paragraph::new(lines)
                    .block(crate::widgets::chrome::panel_block("Form", true));
                f.render_widget(p, centered(body, 60, 8));
            }
            FormLoad::Ready => {
                if let Some(form) = &mut state.form {
                    form.render(f, body, true, tick);
                }
            }
            FormLoad::Idle => {}
        },
        View::Submitted => {
            if let Some(rv) = &mut state.submitted {
                rv.render(f, body, true, tick);
            }
        }
    }

    crate::widgets::status_bar::draw_footer(f, chunks[2], state, help_text(state));
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    Rect {
        x: area.x + (area.width - w) / 2,
        y: area.y + (area.height - h) / 2,
        width: w,
        height: h,
    }
}

/// Locate and parse `dynform.yaml`; a missing file falls back to defaults.
/// `DYNFORM_ENDPOINT` and `DYNFORM_SCHEMA_FILE` override either way.
fn load_config() -> Result<AppConfig> {
    let path = if let Ok(dir) = std::env::var("DYNFORM_CONFIG_DIR") {
        PathBuf::from(dir).join("dynform.yaml")
    } else {
        PathBuf::from("dynform.yaml")
    };
    let mut cfg = if path.exists() {
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_yaml::from_str::<AppConfig>(&text)
            .with_context(|| format!("parsing {}", path.display()))?
    } else {
        AppConfig::default()
    };
    if let Ok(endpoint) = std::env::var("DYNFORM_ENDPOINT") {
        cfg.endpoint = endpoint;
    }
    if let Ok(file) = std::env::var("DYNFORM_SCHEMA_FILE") {
        cfg.schema_file = Some(file);
    }
    Ok(cfg)
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes"))
        .unwrap_or(false)
}

fn tick_housekeeping(state: &mut AppState) {
    state.tick = state.tick.wrapping_add(1);
    if let Some(t) = &state.toast {
        if state.tick >= t.expires_at_tick {
            state.toast = None;
        }
    }
}

pub fn run() -> Result<()> {
    let cfg = load_config()?;
    let mut state = AppState {
        config: cfg,
        ..Default::default()
    };
    let (tx, rx) = mpsc::channel::<LoadMsg>();
    state.tx = Some(tx);
    state.rx = Some(rx);

    // Headless smoke mode: render to a TestBackend for a fixed number of
    // ticks, optionally auto-logging-in, and print a one-line summary.
    if env_flag("DYNFORM_HEADLESS") {
        let ticks: u64 = std::env::var("DYNFORM_TICKS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(10);
        let auto_login: Option<Identity> = std::env::var("DYNFORM_AUTOLOGIN")
            .ok()
            .and_then(|v| {
                let (roll, name) = v.split_once(':')?;
                Some(Identity {
                    roll_number: roll.to_string(),
                    name: name.to_string(),
                })
            });
        let backend = ratatui::backend::TestBackend::new(80, 24);
        let mut terminal = Terminal::new(backend)?;
        let tick_rate = Duration::from_millis(200);
        let mut login_sent = false;
        for _ in 0..ticks {
            if !login_sent {
                if let Some(identity) = auto_login.clone() {
                    run_effects(&mut state, vec![Effect::Register { identity }]);
                }
                login_sent = true;
            }
            terminal.draw(|f| ui(f, &mut state))?;
            pump_load_msgs(&mut state);
            tick_housekeeping(&mut state);
            std::thread::sleep(tick_rate);
        }
        if env_flag("DYNFORM_SMOKE_SUMMARY") {
            let view = match state.view {
                View::Login => "Login",
                View::Form => "Form",
                View::Submitted => "Submitted",
            };
            let load = match &state.form_load {
                FormLoad::Idle => "Idle".to_string(),
                FormLoad::Loading => "Loading".to_string(),
                FormLoad::Ready => "Ready".to_string(),
                FormLoad::Failed(e) => format!("Failed: {e}"),
            };
            let section = state
                .form
                .as_ref()
                .map(|f| f.engine.current_section())
                .unwrap_or(0);
            let summary = serde_json::json!({
                "view": view,
                "load": load,
                "section": section,
                "logged_in": state.identity.is_some(),
            });
            println!("{summary}");
        }
        return Ok(());
    }

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    let tick_rate = Duration::from_millis(200);
    let mut last_tick = Instant::now();
    let res = loop {
        if let Err(e) = terminal.draw(|f| ui(f, &mut state)) {
            break Err(e.into());
        }
        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_millis(0));
        match event::poll(timeout) {
            Ok(true) => match event::read() {
                Ok(Event::Key(key)) if key.kind != event::KeyEventKind::Release => {
                    if handle_key(&mut state, key) {
                        break Ok(());
                    }
                }
                Ok(_) => {}
                Err(e) => break Err(e.into()),
            },
            Ok(false) => {}
            Err(e) => break Err(e.into()),
        }
        pump_load_msgs(&mut state);
        if last_tick.elapsed() >= tick_rate {
            tick_housekeeping(&mut state);
            last_tick = Instant::now();
        }
    };

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    res
}
