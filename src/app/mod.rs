use crate::engine::FormEngine;
use crate::model::{FormSchema, Identity};
use crate::services::api::{self, RegisterReply};
use crate::ui::{AppState, FormLoad, ToastLevel, View};
use crate::widgets::form_widget::FormWidget;
use crate::widgets::result_viewer::ResultViewerWidget;

/// Completed events fed into `update`: service results arriving over the
/// channel plus a few view-level transitions.
pub enum AppMsg {
    Registered {
        identity: Identity,
        outcome: Result<RegisterReply, String>,
    },
    SchemaLoaded {
        generation: u64,
        outcome: Result<FormSchema, String>,
    },
    RetrySchemaLoad,
    Logout,
    Submitted {
        payload: serde_json::Value,
    },
}

/// Work requested by `update` or a widget, executed by the event loop.
#[derive(Debug, Clone)]
pub enum Effect {
    Register {
        identity: Identity,
    },
    FetchSchema {
        roll_number: String,
        generation: u64,
    },
    FinalizeSubmit {
        payload: serde_json::Value,
    },
    ShowToast {
        text: String,
        level: ToastLevel,
        seconds: u64,
    },
    CopyToClipboard {
        text: String,
    },
}

pub fn update(state: &mut AppState, msg: AppMsg) -> Vec<Effect> {
    let mut effects: Vec<Effect> = Vec::new();
    match msg {
        AppMsg::Registered { identity, outcome } => {
            state.login.busy = false;
            state.status_text = None;
            match outcome {
                // The duplicate-user answer is a successful login, not an
                // error; the service reports it with success == false.
                Ok(reply) if reply.success || api::is_already_registered(&reply.message) => {
                    state.dbg(format!("login ok for roll {}", identity.roll_number));
                    state.identity = Some(identity);
                    state.view = View::Form;
                    begin_schema_fetch(state, &mut effects);
                }
                Ok(reply) => {
                    state.login.api_error = Some(reply.message);
                }
                Err(e) => {
                    state.login.api_error = Some(e);
                }
            }
        }
        AppMsg::SchemaLoaded { generation, outcome } => {
            if generation != state.fetch_generation {
                state.dbg(format!(
                    "dropping stale schema fetch (gen {generation}, current {})",
                    state.fetch_generation
                ));
                return effects;
            }
            state.status_text = None;
            match outcome {
                Ok(schema) => {
                    state.dbg(format!(
                        "schema loaded: {} section(s)",
                        schema.sections.len()
                    ));
                    state.form = Some(FormWidget::new(FormEngine::new(schema)));
                    state.form_load = FormLoad::Ready;
                }
                Err(e) => {
                    state.form = None;
                    state.form_load = FormLoad::Failed(e);
                    effects.push(Effect::ShowToast {
                        text: "Failed to load form".into(),
                        level: ToastLevel::Error,
                        seconds: 3,
                    });
                }
            }
        }
        AppMsg::RetrySchemaLoad => {
            if matches!(state.form_load, FormLoad::Failed(_)) {
                begin_schema_fetch(state, &mut effects);
            }
        }
        AppMsg::Logout => {
            state.identity = None;
            state.view = View::Login;
            state.form = None;
            state.submitted = None;
            state.form_load = FormLoad::Idle;
            state.status_text = None;
            // Whatever fetch may still be in flight is now stale.
            state.fetch_generation += 1;
            state.login.reset_errors();
        }
        AppMsg::Submitted { payload } => {
            state.submitted = Some(ResultViewerWidget::new("Submitted values", &payload));
            state.view = View::Submitted;
            effects.push(Effect::ShowToast {
                text: "Form submitted".into(),
                level: ToastLevel::Success,
                seconds: 3,
            });
        }
    }
    effects
}

/// Enter `Loading` and request the schema for the current identity. Bumps
/// the generation so only this fetch's resolution is ever applied.
fn begin_schema_fetch(state: &mut AppState, effects: &mut Vec<Effect>) {
    let Some(identity) = &state.identity else {
        return;
    };
    state.fetch_generation += 1;
    state.form_load = FormLoad::Loading;
    state.status_text = Some("Loading form...".into());
    effects.push(Effect::FetchSchema {
        roll_number: identity.roll_number.clone(),
        generation: state.fetch_generation,
    });
}

#[cfg(test)]
mod tests;
