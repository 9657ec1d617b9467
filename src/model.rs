use serde::{Deserialize, Deserializer, Serialize};

/// One selectable choice of a dropdown/radio/multi-checkbox field.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FieldOption {
    pub value: String,
    pub label: String,
    #[serde(default)]
    #[allow(dead_code)]
    pub data_test_id: Option<String>,
}

/// Closed set of field kinds the renderer knows how to draw. Anything the
/// server sends outside this set lands in `Unknown` (with the raw tag kept
/// for the placeholder) instead of breaking deserialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Tel,
    Email,
    Date,
    Textarea,
    Dropdown,
    Radio,
    Checkbox,
    Unknown(String),
}

impl FieldType {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "text" => Self::Text,
            "tel" => Self::Tel,
            "email" => Self::Email,
            "date" => Self::Date,
            "textarea" => Self::Textarea,
            "dropdown" => Self::Dropdown,
            "radio" => Self::Radio,
            "checkbox" => Self::Checkbox,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Single-line inputs that run the per-keystroke format validators.
    pub fn is_line_input(&self) -> bool {
        matches!(self, Self::Text | Self::Tel | Self::Email | Self::Date)
    }
}

impl<'de> Deserialize<'de> for FieldType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let tag = String::deserialize(deserializer)?;
        Ok(FieldType::from_tag(&tag))
    }
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct ValidationHint {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FieldSchema {
    pub field_id: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub label: String,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub min_length: Option<usize>,
    #[serde(default)]
    pub max_length: Option<usize>,
    #[serde(default)]
    pub options: Option<Vec<FieldOption>>,
    #[serde(default)]
    pub validation: Option<ValidationHint>,
    #[serde(default)]
    #[allow(dead_code)]
    pub data_test_id: Option<String>,
}

impl FieldSchema {
    /// Custom required-message from the schema, if any.
    pub fn required_message(&self) -> Option<&str> {
        self.validation.as_ref()?.message.as_deref()
    }

    /// A checkbox without options is a boolean toggle; with options it is a
    /// multi-select group.
    pub fn is_multi_checkbox(&self) -> bool {
        matches!(self.field_type, FieldType::Checkbox)
            && self.options.as_ref().map(|o| !o.is_empty()).unwrap_or(false)
    }
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SectionSchema {
    #[serde(deserialize_with = "de_lenient_id")]
    pub section_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub fields: Vec<FieldSchema>,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FormSchema {
    #[serde(default)]
    pub form_title: String,
    pub sections: Vec<SectionSchema>,
}

/// Wire envelope of `GET /get-form`.
#[derive(Debug, Deserialize, Clone)]
pub struct FormResponse {
    #[serde(default)]
    #[allow(dead_code)]
    pub message: Option<String>,
    pub form: FormSchema,
}

/// Roll-number/name pair identifying the session. Set once at login,
/// immutable until logout.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub roll_number: String,
    pub name: String,
}

pub const DEFAULT_ENDPOINT: &str = "https://dynamic-form-generator-9rl7.onrender.com";

/// App configuration, loaded from `dynform.yaml` when present. The endpoint
/// is the only required knob and has a built-in default; `schema_file`
/// substitutes a local YAML/JSON schema for the network fetch.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub schema_file: Option<String>,
    #[serde(default)]
    pub header: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            schema_file: None,
            header: None,
        }
    }
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

// The upstream service sometimes emits numeric section ids.
fn de_lenient_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let v = serde_json::Value::deserialize(deserializer)?;
    match v {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "sectionId must be a string or number, got {other}"
        ))),
    }
}

/// Sanity-check a freshly loaded schema before handing it to the engine.
/// Violations surface as a load error with a retry, never a crash.
pub fn validate_form_schema(schema: &FormSchema) -> Result<(), String> {
    use std::collections::HashSet;
    if schema.sections.is_empty() {
        return Err("form has no sections".into());
    }
    let mut ids = HashSet::new();
    for section in &schema.sections {
        for (i, field) in section.fields.iter().enumerate() {
            if !ids.insert(&field.field_id) {
                return Err(format!(
                    "duplicate fieldId '{}' (section '{}', index {})",
                    field.field_id, section.section_id, i
                ));
            }
            match field.field_type {
                FieldType::Dropdown | FieldType::Radio => {
                    if field.options.as_ref().map(|o| o.is_empty()).unwrap_or(true) {
                        return Err(format!(
                            "field '{}' of type {:?} requires non-empty options",
                            field.field_id, field.field_type
                        ));
                    }
                }
                _ => {}
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(v: serde_json::Value) -> FormSchema {
        serde_json::from_value(v).expect("schema should deserialize")
    }

    #[test]
    fn parses_camel_case_wire_format() {
        let schema = parse(json!({
            "formTitle": "Student Survey",
            "sections": [{
                "sectionId": 1,
                "title": "About you",
                "description": "Basics",
                "fields": [{
                    "fieldId": "phone",
                    "type": "tel",
                    "label": "Phone",
                    "required": true,
                    "minLength": 10,
                    "maxLength": 10,
                    "validation": {"message": "Phone is required"},
                    "dataTestId": "phone-input"
                }]
            }]
        }));
        assert_eq!(schema.form_title, "Student Survey");
        assert_eq!(schema.sections[0].section_id, "1");
        let field = &schema.sections[0].fields[0];
        assert_eq!(field.field_type, FieldType::Tel);
        assert_eq!(field.min_length, Some(10));
        assert_eq!(field.required_message(), Some("Phone is required"));
    }

    #[test]
    fn unrecognized_type_becomes_unknown() {
        let schema = parse(json!({
            "formTitle": "T",
            "sections": [{
                "sectionId": "s1",
                "title": "S",
                "description": "",
                "fields": [{"fieldId": "x", "type": "slider", "label": "X"}]
            }]
        }));
        assert_eq!(
            schema.sections[0].fields[0].field_type,
            FieldType::Unknown("slider".into())
        );
    }

    #[test]
    fn validate_detects_duplicate_field_ids() {
        let schema = parse(json!({
            "formTitle": "T",
            "sections": [
                {
                    "sectionId": "a",
                    "title": "A",
                    "description": "",
                    "fields": [{"fieldId": "email", "type": "email", "label": "Email"}]
                },
                {
                    "sectionId": "b",
                    "title": "B",
                    "description": "",
                    "fields": [{"fieldId": "email", "type": "text", "label": "Email again"}]
                }
            ]
        }));
        let err = validate_form_schema(&schema).unwrap_err();
        assert!(err.contains("duplicate fieldId 'email'"));
    }

    #[test]
    fn validate_requires_options_for_choice_fields() {
        let schema = parse(json!({
            "formTitle": "T",
            "sections": [{
                "sectionId": "a",
                "title": "A",
                "description": "",
                "fields": [{"fieldId": "pick", "type": "dropdown", "label": "Pick"}]
            }]
        }));
        let err = validate_form_schema(&schema).unwrap_err();
        assert!(err.contains("requires non-empty options"));
    }

    #[test]
    fn validate_rejects_empty_form() {
        let schema = FormSchema::default();
        assert!(validate_form_schema(&schema).is_err());
    }

    #[test]
    fn checkbox_with_and_without_options() {
        let schema = parse(json!({
            "formTitle": "T",
            "sections": [{
                "sectionId": "a",
                "title": "A",
                "description": "",
                "fields": [
                    {"fieldId": "subscribe", "type": "checkbox", "label": "Subscribe"},
                    {"fieldId": "interests", "type": "checkbox", "label": "Interests",
                     "options": [{"value": "rust", "label": "Rust"}]}
                ]
            }]
        }));
        assert!(!schema.sections[0].fields[0].is_multi_checkbox());
        assert!(schema.sections[0].fields[1].is_multi_checkbox());
    }

    #[test]
    fn config_default_endpoint_applies() {
        let cfg: AppConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(cfg.endpoint, DEFAULT_ENDPOINT);
        let cfg: AppConfig = serde_yaml::from_str("endpoint: http://localhost:9999").unwrap();
        assert_eq!(cfg.endpoint, "http://localhost:9999");
    }
}
