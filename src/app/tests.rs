use super::*;
use crate::services::api::USER_EXISTS_MESSAGE;
use crate::widgets::form_widget::VALIDATION_MESSAGE;
use crate::widgets::Widget as _;
use crossterm::event::KeyCode;
use serde_json::json;

fn identity() -> Identity {
    Identity {
        roll_number: "R1".into(),
        name: "Alice".into(),
    }
}

fn two_section_schema() -> FormSchema {
    serde_json::from_value(json!({
        "formTitle": "Student Survey",
        "sections": [
            {
                "sectionId": "about",
                "title": "About you",
                "description": "",
                "fields": [
                    {"fieldId": "name", "type": "text", "label": "Name", "required": true},
                    {"fieldId": "phone", "type": "tel", "label": "Phone", "required": true}
                ]
            },
            {
                "sectionId": "contact",
                "title": "Contact",
                "description": "",
                "fields": [
                    {"fieldId": "email", "type": "email", "label": "Email", "required": true}
                ]
            }
        ]
    }))
    .unwrap()
}

fn registered_ok(state: &mut AppState) -> Vec<Effect> {
    update(
        state,
        AppMsg::Registered {
            identity: identity(),
            outcome: Ok(RegisterReply {
                success: true,
                message: "User registered successfully".into(),
            }),
        },
    )
}

/// Type a string into the currently selected field: Enter to edit, chars,
/// Enter to stop.
fn type_into(form: &mut crate::widgets::form_widget::FormWidget, text: &str) {
    form.on_key(KeyCode::Enter);
    for c in text.chars() {
        form.on_key(KeyCode::Char(c));
    }
    form.on_key(KeyCode::Enter);
}

#[test]
fn successful_registration_starts_schema_fetch() {
    let mut st = AppState::default();
    let effects = registered_ok(&mut st);
    assert_eq!(st.identity, Some(identity()));
    assert_eq!(st.view, View::Form);
    assert_eq!(st.form_load, FormLoad::Loading);
    match &effects[..] {
        [Effect::FetchSchema {
            roll_number,
            generation,
        }] => {
            assert_eq!(roll_number, "R1");
            assert_eq!(*generation, 1);
        }
        other => panic!("expected one FetchSchema effect, got {other:?}"),
    }
}

#[test]
fn user_exists_sentinel_still_logs_in() {
    let mut st = AppState::default();
    let effects = update(
        &mut st,
        AppMsg::Registered {
            identity: identity(),
            outcome: Ok(RegisterReply {
                success: false,
                message: USER_EXISTS_MESSAGE.into(),
            }),
        },
    );
    assert!(st.identity.is_some());
    assert_eq!(st.view, View::Form);
    assert!(st.login.api_error.is_none());
    assert!(matches!(effects[..], [Effect::FetchSchema { .. }]));
}

#[test]
fn other_registration_failures_surface_as_errors() {
    let mut st = AppState::default();
    let _ = update(
        &mut st,
        AppMsg::Registered {
            identity: identity(),
            outcome: Ok(RegisterReply {
                success: false,
                message: "Roll number format invalid".into(),
            }),
        },
    );
    assert!(st.identity.is_none());
    assert_eq!(st.view, View::Login);
    assert_eq!(
        st.login.api_error.as_deref(),
        Some("Roll number format invalid")
    );
}

#[test]
fn schema_success_builds_the_form() {
    let mut st = AppState::default();
    let _ = registered_ok(&mut st);
    let effects = update(
        &mut st,
        AppMsg::SchemaLoaded {
            generation: 1,
            outcome: Ok(two_section_schema()),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(st.form_load, FormLoad::Ready);
    let form = st.form.as_ref().unwrap();
    assert_eq!(form.engine.current_section(), 0);
    assert_eq!(form.engine.section_count(), 2);
}

#[test]
fn stale_generation_is_discarded() {
    let mut st = AppState::default();
    let _ = registered_ok(&mut st); // generation 1
    let _ = registered_ok(&mut st); // superseded by generation 2

    let _ = update(
        &mut st,
        AppMsg::SchemaLoaded {
            generation: 1,
            outcome: Ok(two_section_schema()),
        },
    );
    assert!(st.form.is_none());
    assert_eq!(st.form_load, FormLoad::Loading);

    let _ = update(
        &mut st,
        AppMsg::SchemaLoaded {
            generation: 2,
            outcome: Ok(two_section_schema()),
        },
    );
    assert_eq!(st.form_load, FormLoad::Ready);
    assert!(st.form.is_some());
}

#[test]
fn schema_failure_then_retry() {
    let mut st = AppState::default();
    let _ = registered_ok(&mut st);
    let _ = update(
        &mut st,
        AppMsg::SchemaLoaded {
            generation: 1,
            outcome: Err("connection refused".into()),
        },
    );
    assert_eq!(st.form_load, FormLoad::Failed("connection refused".into()));

    let effects = update(&mut st, AppMsg::RetrySchemaLoad);
    assert_eq!(st.form_load, FormLoad::Loading);
    match &effects[..] {
        [Effect::FetchSchema { generation, .. }] => assert_eq!(*generation, 2),
        other => panic!("expected FetchSchema, got {other:?}"),
    }
}

#[test]
fn logout_resets_and_invalidates_inflight_fetch() {
    let mut st = AppState::default();
    let _ = registered_ok(&mut st);
    let gen_before = st.fetch_generation;
    let _ = update(&mut st, AppMsg::Logout);
    assert_eq!(st.view, View::Login);
    assert!(st.identity.is_none());
    assert!(st.form.is_none());
    assert_eq!(st.form_load, FormLoad::Idle);
    // The resolution of the pending fetch must no longer match.
    assert!(st.fetch_generation > gen_before);
}

#[test]
fn submitted_payload_opens_result_view() {
    let mut st = AppState::default();
    let effects = update(
        &mut st,
        AppMsg::Submitted {
            payload: json!({"name": "Alice"}),
        },
    );
    assert_eq!(st.view, View::Submitted);
    assert!(st.submitted.is_some());
    assert!(matches!(
        effects[..],
        [Effect::ShowToast {
            level: ToastLevel::Success,
            ..
        }]
    ));
}

#[test]
fn previous_never_goes_below_section_zero() {
    let mut st = AppState::default();
    let _ = registered_ok(&mut st);
    let _ = update(
        &mut st,
        AppMsg::SchemaLoaded {
            generation: 1,
            outcome: Ok(two_section_schema()),
        },
    );
    let form = st.form.as_mut().unwrap();
    // Section 0 has 2 fields, so row 2 is the Previous button.
    form.on_key(KeyCode::Down);
    form.on_key(KeyCode::Down);
    form.on_key(KeyCode::Enter);
    assert_eq!(form.engine.current_section(), 0);
}

#[test]
fn end_to_end_walk_next_then_failed_submit() {
    let mut st = AppState::default();
    let _ = registered_ok(&mut st);
    let _ = update(
        &mut st,
        AppMsg::SchemaLoaded {
            generation: 1,
            outcome: Ok(two_section_schema()),
        },
    );
    let form = st.form.as_mut().unwrap();

    // Next with everything empty: stays put, errors recorded.
    form.on_key(KeyCode::Down);
    form.on_key(KeyCode::Down);
    form.on_key(KeyCode::Down); // row 3 = Next
    let effects = form.on_key(KeyCode::Enter);
    assert!(effects.is_empty());
    assert_eq!(form.engine.current_section(), 0);
    assert_eq!(form.message.as_deref(), Some(VALIDATION_MESSAGE));
    assert!(form.engine.error("name").is_some());

    // Fill section 1 and advance.
    form.on_key(KeyCode::Up);
    form.on_key(KeyCode::Up);
    form.on_key(KeyCode::Up); // back to row 0
    type_into(form, "Alice");
    form.on_key(KeyCode::Down);
    type_into(form, "1234567890");
    form.on_key(KeyCode::Down);
    form.on_key(KeyCode::Down); // Next
    let effects = form.on_key(KeyCode::Enter);
    assert!(effects.is_empty());
    assert_eq!(form.engine.current_section(), 1);
    assert_eq!(form.selected, 0, "view resets to top on advance");

    // Submit with the required email empty: stays on section 2 with an
    // error shown for that field.
    form.on_key(KeyCode::Down);
    form.on_key(KeyCode::Down); // row 2 = Submit (1 field)
    let effects = form.on_key(KeyCode::Enter);
    assert!(effects.is_empty());
    assert_eq!(form.engine.current_section(), 1);
    assert!(form.engine.error("email").is_some());

    // Fix it and submit for real.
    form.on_key(KeyCode::Up);
    form.on_key(KeyCode::Up);
    type_into(form, "alice@example.org");
    form.on_key(KeyCode::Down);
    form.on_key(KeyCode::Down);
    let effects = form.on_key(KeyCode::Enter);
    match &effects[..] {
        [Effect::FinalizeSubmit { payload }] => {
            assert_eq!(payload["name"], json!("Alice"));
            assert_eq!(payload["phone"], json!("1234567890"));
            assert_eq!(payload["email"], json!("alice@example.org"));
        }
        other => panic!("expected FinalizeSubmit, got {other:?}"),
    }
}

#[test]
fn format_error_blocks_next_until_fixed() {
    let mut st = AppState::default();
    let _ = registered_ok(&mut st);
    let _ = update(
        &mut st,
        AppMsg::SchemaLoaded {
            generation: 1,
            outcome: Ok(two_section_schema()),
        },
    );
    let form = st.form.as_mut().unwrap();
    type_into(form, "Alice");
    form.on_key(KeyCode::Down);
    type_into(form, "12345"); // too short for a phone number
    assert_eq!(
        form.engine.error("phone"),
        Some("Phone number must be exactly 10 digits")
    );
    form.on_key(KeyCode::Down);
    form.on_key(KeyCode::Down);
    assert!(form.on_key(KeyCode::Enter).is_empty());
    assert_eq!(form.engine.current_section(), 0);
}
