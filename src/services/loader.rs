use anyhow::{anyhow, Context, Result};
use serde_json::Value as JsonValue;
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::thread;

use crate::model::{FormSchema, Identity};
use crate::services::api::ApiClient;
use crate::ui::{LoadKind, LoadMsg, LoadOutcome};

/// Register (or log in) off-thread and report back over the channel.
pub fn spawn_register(endpoint: String, identity: Identity, tx: Sender<LoadMsg>) {
    thread::spawn(move || {
        let outcome = ApiClient::new(&endpoint)
            .register_or_login(&identity)
            .map(LoadOutcome::Registered)
            .map_err(|e| format!("{e:#}"));
        let _ = tx.send(LoadMsg {
            kind: LoadKind::Register { identity },
            outcome,
        });
    });
}

/// Fetch the form schema off-thread, tagged with the generation that
/// requested it so the orchestrator can discard stale resolutions.
/// A configured `schema_file` substitutes the network call entirely.
pub fn spawn_fetch_schema(
    endpoint: String,
    schema_file: Option<String>,
    roll_number: String,
    generation: u64,
    tx: Sender<LoadMsg>,
) {
    thread::spawn(move || {
        let result = match schema_file {
            Some(path) => load_schema_file(&path),
            None => ApiClient::new(&endpoint).fetch_form_schema(&roll_number),
        };
        let outcome = result
            .map(LoadOutcome::Schema)
            .map_err(|e| format!("{e:#}"));
        let _ = tx.send(LoadMsg {
            kind: LoadKind::Schema { generation },
            outcome,
        });
    });
}

/// Load a schema from a local YAML or JSON file. Accepts either a bare
/// schema or the service's `{ "form": … }` envelope.
pub fn load_schema_file(path: &str) -> Result<FormSchema> {
    let full_path = {
        let pb = PathBuf::from(path);
        if pb.is_absolute() {
            pb
        } else if let Ok(dir) = std::env::var("DYNFORM_CONFIG_DIR") {
            PathBuf::from(dir).join(path)
        } else {
            std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(path)
        }
    };
    let text = std::fs::read_to_string(&full_path)
        .with_context(|| format!("reading {}", full_path.display()))?;
    let value: JsonValue = if path.ends_with(".json") {
        serde_json::from_str(&text).with_context(|| format!("{path}: invalid JSON"))?
    } else {
        serde_yaml::from_str(&text).map_err(|e| {
            if let Some(loc) = e.location() {
                anyhow!("{}:{}:{}: {}", path, loc.line(), loc.column(), e)
            } else {
                anyhow!("{path}: {e}")
            }
        })?
    };
    schema_from_value(value)
}

/// Unwrap the optional `{ "form": … }` envelope and sanity-check the result.
pub(crate) fn schema_from_value(mut value: JsonValue) -> Result<FormSchema> {
    if let Some(form) = value.get_mut("form") {
        value = form.take();
    }
    let schema: FormSchema =
        serde_json::from_value(value).with_context(|| "parsing form schema")?;
    crate::model::validate_form_schema(&schema).map_err(|e| anyhow!(e))?;
    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn schema_from_value_unwraps_envelope() {
        let enveloped = json!({
            "message": "ok",
            "form": {
                "formTitle": "T",
                "sections": [{
                    "sectionId": "s",
                    "title": "S",
                    "description": "",
                    "fields": [{"fieldId": "a", "type": "text", "label": "A"}]
                }]
            }
        });
        let schema = schema_from_value(enveloped).unwrap();
        assert_eq!(schema.form_title, "T");
        assert_eq!(schema.sections.len(), 1);
    }

    #[test]
    fn schema_from_value_accepts_bare_schema() {
        let bare = json!({
            "formTitle": "Bare",
            "sections": [{
                "sectionId": "s",
                "title": "S",
                "description": "",
                "fields": [{"fieldId": "a", "type": "text", "label": "A"}]
            }]
        });
        assert_eq!(schema_from_value(bare).unwrap().form_title, "Bare");
    }

    #[test]
    fn schema_from_value_rejects_invalid_schema() {
        let empty = json!({"formTitle": "T", "sections": []});
        assert!(schema_from_value(empty).is_err());
    }
}
