use std::collections::HashMap;

use crate::model::FormSchema;

/// Current value of one field. `Many` keeps insertion order so toggling
/// an option twice restores the exact prior state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Many(Vec<String>),
    Flag(bool),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Empty for the purposes of the required check: blank string, empty
    /// multi-select, or an unchecked boolean toggle.
    pub fn is_unset(&self) -> bool {
        match self {
            Self::Text(s) => s.is_empty(),
            Self::Many(vs) => vs.is_empty(),
            Self::Flag(b) => !b,
        }
    }
}

pub const REQUIRED_MESSAGE: &str = "This field is required";

/// One recorded validation failure. `format` marks errors produced by the
/// renderer's per-keystroke validators (phone/email/date-age); structural
/// (required/length) errors are recomputed on every section validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub message: String,
    pub format: bool,
}

/// Owns schema, values, errors and the current section index for one
/// authenticated session. Performs no I/O and cannot fail; out-of-range
/// section indices are the caller's contract.
#[derive(Default)]
pub struct FormEngine {
    schema: FormSchema,
    values: HashMap<String, FieldValue>,
    errors: HashMap<String, FieldError>,
    section: usize,
}

impl FormEngine {
    pub fn new(schema: FormSchema) -> Self {
        let mut engine = Self::default();
        engine.load_schema(schema);
        engine
    }

    /// Replace the schema wholesale: values, errors and the section index
    /// are reset regardless of prior state.
    pub fn load_schema(&mut self, schema: FormSchema) {
        self.schema = schema;
        self.values.clear();
        self.errors.clear();
        self.section = 0;
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn current_section(&self) -> usize {
        self.section
    }

    pub fn section_count(&self) -> usize {
        self.schema.sections.len()
    }

    /// Unconditional navigation; bounds are checked by the caller.
    pub fn go_to_section(&mut self, index: usize) {
        self.section = index;
    }

    /// `(current+1, total)` for the progress gauge.
    pub fn progress(&self) -> (usize, usize) {
        (self.section + 1, self.section_count())
    }

    pub fn value(&self, field_id: &str) -> Option<&FieldValue> {
        self.values.get(field_id)
    }

    pub fn error(&self, field_id: &str) -> Option<&str> {
        self.errors.get(field_id).map(|e| e.message.as_str())
    }

    /// Sole write path for user edits. A supplied error is recorded as a
    /// format error; otherwise any existing entry for the field is removed
    /// (absence of a key means valid).
    pub fn set_field_value(
        &mut self,
        field_id: &str,
        value: FieldValue,
        format_error: Option<String>,
    ) {
        self.values.insert(field_id.to_string(), value);
        match format_error {
            Some(message) => {
                self.errors
                    .insert(field_id.to_string(), FieldError { message, format: true });
            }
            None => {
                self.errors.remove(field_id);
            }
        }
    }

    /// Add or remove one option of a multi-checkbox field, leaving the rest
    /// of the selection untouched.
    pub fn toggle_option(&mut self, field_id: &str, option_value: &str) {
        let mut current = match self.values.get(field_id) {
            Some(FieldValue::Many(vs)) => vs.clone(),
            _ => Vec::new(),
        };
        if let Some(pos) = current.iter().position(|v| v == option_value) {
            current.remove(pos);
        } else {
            current.push(option_value.to_string());
        }
        self.set_field_value(field_id, FieldValue::Many(current), None);
    }

    /// Validate every field of `sections[index]` in schema order. Returns
    /// true iff no field is invalid. Errors for fields of other sections are
    /// merged, never dropped.
    ///
    /// Precedence per field: required-empty, then min length, then max
    /// length, then a persisting format error (message left unchanged).
    /// A field that passes all of those has any stale structural entry
    /// removed, so a fixed field never keeps showing last pass's message.
    pub fn validate_section(&mut self, index: usize) -> bool {
        let Some(section) = self.schema.sections.get(index) else {
            return false;
        };
        let mut ok = true;
        for field in &section.fields {
            let value = self.values.get(&field.field_id);
            if field.required && value.map_or(true, |v| v.is_unset()) {
                let message = field
                    .required_message()
                    .unwrap_or(REQUIRED_MESSAGE)
                    .to_string();
                self.errors
                    .insert(field.field_id.clone(), FieldError { message, format: false });
                ok = false;
                continue;
            }
            if let Some(s) = value.and_then(|v| v.as_text()) {
                if let Some(min) = field.min_length {
                    if s.len() < min {
                        self.errors.insert(
                            field.field_id.clone(),
                            FieldError {
                                message: format!("Minimum length is {min} characters"),
                                format: false,
                            },
                        );
                        ok = false;
                        continue;
                    }
                }
                if let Some(max) = field.max_length {
                    if s.len() > max {
                        self.errors.insert(
                            field.field_id.clone(),
                            FieldError {
                                message: format!("Maximum length is {max} characters"),
                                format: false,
                            },
                        );
                        ok = false;
                        continue;
                    }
                }
            }
            match self.errors.get(&field.field_id) {
                Some(err) if err.format => {
                    ok = false;
                }
                Some(_) => {
                    self.errors.remove(&field.field_id);
                }
                None => {}
            }
        }
        ok
    }

    /// The accumulated values as a JSON object. Untouched fields are
    /// omitted, matching the lazily-populated value map.
    pub fn values_json(&self) -> serde_json::Value {
        let mut out = serde_json::Map::new();
        for section in &self.schema.sections {
            for field in &section.fields {
                if let Some(value) = self.values.get(&field.field_id) {
                    let v = match value {
                        FieldValue::Text(s) => serde_json::Value::String(s.clone()),
                        FieldValue::Many(vs) => serde_json::Value::Array(
                            vs.iter()
                                .map(|s| serde_json::Value::String(s.clone()))
                                .collect(),
                        ),
                        FieldValue::Flag(b) => serde_json::Value::Bool(*b),
                    };
                    out.insert(field.field_id.clone(), v);
                }
            }
        }
        serde_json::Value::Object(out)
    }
}
