use chrono::NaiveDate;
use ratatui::prelude::*;
use regex::Regex;
use std::sync::OnceLock;

use crate::engine::FieldValue;
use crate::model::{FieldSchema, FieldType};

/// Max options shown at once for a dropdown list; longer lists scroll.
pub const OPTIONS_VISIBLE: usize = 8;

pub const SELECT_PLACEHOLDER: &str = "Select an option";

fn tel_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{10}$").unwrap())
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap())
}

/// Fractional age in 365.25-day years.
fn age_in_years(birth: NaiveDate, today: NaiveDate) -> f64 {
    (today - birth).num_days() as f64 / 365.25
}

/// Per-keystroke format check for single-line inputs. Runs before every
/// edit reaches the engine; an empty value always passes (required-ness is
/// a section-validation concern).
pub fn format_validation(field_type: &FieldType, raw: &str) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    match field_type {
        FieldType::Tel => {
            if !tel_regex().is_match(raw) {
                return Some("Phone number must be exactly 10 digits".into());
            }
            None
        }
        FieldType::Email => {
            if !email_regex().is_match(raw) {
                return Some("Please enter a valid email address".into());
            }
            None
        }
        FieldType::Date => {
            let Ok(birth) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") else {
                return Some("Please enter valid Date".into());
            };
            let age = age_in_years(birth, chrono::Local::now().date_naive());
            if age <= 16.0 {
                return Some("Age must be greater than 16 years".into());
            }
            if age >= 160.0 {
                return Some("Enter valid age :)".into());
            }
            None
        }
        _ => None,
    }
}

/// Draw-time context for one field: its current value/error from the engine
/// plus the transient view state owned by the form widget.
pub struct FieldCtx<'a> {
    pub value: Option<&'a FieldValue>,
    pub error: Option<&'a str>,
    pub selected: bool,
    pub editing: bool,
    pub cursor_on: bool,
    pub option_cursor: usize,
    pub option_offset: usize,
}

/// Number of cursor positions when editing a choice field. Dropdowns get a
/// leading empty sentinel entry.
pub fn option_rows(field: &FieldSchema) -> usize {
    let n = field.options.as_ref().map(|o| o.len()).unwrap_or(0);
    match field.field_type {
        FieldType::Dropdown => n + 1,
        _ => n,
    }
}

fn value_style(ctx: &FieldCtx) -> Style {
    if ctx.selected {
        if ctx.editing {
            crate::theme::text_editing_bold()
        } else {
            crate::theme::text_active_bold()
        }
    } else {
        Style::default()
    }
}

fn label_prefix(field: &FieldSchema, ctx: &FieldCtx) -> String {
    let sel = if ctx.selected { '›' } else { ' ' };
    let req = if field.required { " *" } else { "" };
    format!("{sel} {}{req}: ", field.label)
}

/// Render one field into `lines`. Total over the closed `FieldType` set;
/// unknown types degrade to a visible placeholder.
pub fn draw_field(lines: &mut Vec<Line<'static>>, field: &FieldSchema, ctx: &FieldCtx) {
    match &field.field_type {
        FieldType::Text | FieldType::Tel | FieldType::Email | FieldType::Date => {
            let raw = ctx.value.and_then(|v| v.as_text()).unwrap_or("");
            let mut spans = vec![Span::raw(label_prefix(field, ctx))];
            if raw.is_empty() && !(ctx.editing && ctx.selected) {
                let hint = field.placeholder.clone().unwrap_or_default();
                spans.push(Span::styled(
                    if hint.is_empty() { String::new() } else { format!("({hint})") },
                    crate::theme::text_muted(),
                ));
            } else {
                let mut val = raw.to_string();
                if ctx.editing && ctx.selected && ctx.cursor_on {
                    val.push('▏');
                }
                spans.push(Span::styled(val, value_style(ctx)));
            }
            lines.push(Line::from(spans));
        }
        FieldType::Textarea => {
            lines.push(Line::from(Span::raw(label_prefix(field, ctx))));
            let text = ctx.value.and_then(|v| v.as_text()).unwrap_or("");
            if text.is_empty() {
                let hint = field
                    .placeholder
                    .clone()
                    .unwrap_or_else(|| "press Enter to write".into());
                lines.push(Line::from(vec![
                    Span::raw("  "),
                    Span::styled(format!("({hint})"), crate::theme::text_muted()),
                ]));
            } else {
                let style = value_style(ctx);
                for body_line in text.lines() {
                    lines.push(Line::from(vec![
                        Span::raw("  "),
                        Span::styled(body_line.to_string(), style),
                    ]));
                }
            }
        }
        FieldType::Dropdown => {
            let current = ctx.value.and_then(|v| v.as_text()).unwrap_or("");
            let options = field.options.as_deref().unwrap_or(&[]);
            let summary = options
                .iter()
                .find(|o| o.value == current)
                .map(|o| o.label.clone());
            let mut spans = vec![Span::raw(label_prefix(field, ctx))];
            match summary {
                Some(label) => spans.push(Span::styled(label, value_style(ctx))),
                None => spans.push(Span::styled(
                    SELECT_PLACEHOLDER.to_string(),
                    crate::theme::text_muted(),
                )),
            }
            lines.push(Line::from(spans));
            if ctx.editing && ctx.selected {
                // Sentinel first, then the schema's options, windowed.
                let mut rows: Vec<(String, String)> =
                    vec![(String::new(), SELECT_PLACEHOLDER.to_string())];
                rows.extend(options.iter().map(|o| (o.value.clone(), o.label.clone())));
                let start = ctx.option_offset.min(rows.len());
                let end = (start + OPTIONS_VISIBLE).min(rows.len());
                for (oi, (value, label)) in rows.iter().enumerate().take(end).skip(start) {
                    let mark = if *value == current { "(•)" } else { "( )" };
                    let cur = if oi == ctx.option_cursor { '›' } else { ' ' };
                    let style = if oi == ctx.option_cursor {
                        crate::theme::list_cursor_style()
                    } else {
                        crate::theme::text_muted()
                    };
                    lines.push(Line::from(Span::styled(
                        format!("  {cur} {mark} {label}"),
                        style,
                    )));
                }
            }
        }
        FieldType::Radio => {
            lines.push(Line::from(Span::raw(label_prefix(field, ctx))));
            let current = ctx.value.and_then(|v| v.as_text()).unwrap_or("");
            for (oi, opt) in field.options.as_deref().unwrap_or(&[]).iter().enumerate() {
                let mark = if opt.value == current { "(•)" } else { "( )" };
                let cur = if ctx.editing && ctx.selected && oi == ctx.option_cursor {
                    '›'
                } else {
                    ' '
                };
                let style = if ctx.editing && ctx.selected && oi == ctx.option_cursor {
                    crate::theme::list_cursor_style()
                } else if opt.value == current {
                    value_style(ctx)
                } else {
                    Style::default()
                };
                lines.push(Line::from(Span::styled(
                    format!("  {cur} {mark} {}", opt.label),
                    style,
                )));
            }
        }
        FieldType::Checkbox if field.is_multi_checkbox() => {
            lines.push(Line::from(Span::raw(label_prefix(field, ctx))));
            let picked: &[String] = match ctx.value {
                Some(FieldValue::Many(vs)) => vs,
                _ => &[],
            };
            for (oi, opt) in field.options.as_deref().unwrap_or(&[]).iter().enumerate() {
                let mark = if picked.iter().any(|v| v == &opt.value) {
                    "[x]"
                } else {
                    "[ ]"
                };
                let cur = if ctx.editing && ctx.selected && oi == ctx.option_cursor {
                    '›'
                } else {
                    ' '
                };
                let style = if ctx.editing && ctx.selected && oi == ctx.option_cursor {
                    crate::theme::list_cursor_style()
                } else {
                    Style::default()
                };
                lines.push(Line::from(Span::styled(
                    format!("  {cur} {mark} {}", opt.label),
                    style,
                )));
            }
        }
        FieldType::Checkbox => {
            // Boolean toggle: the label sits on the control line itself.
            let checked = matches!(ctx.value, Some(FieldValue::Flag(true)));
            let sel = if ctx.selected { '›' } else { ' ' };
            let req = if field.required { " *" } else { "" };
            let mark = if checked { "[x]" } else { "[ ]" };
            let style = if ctx.selected {
                crate::theme::text_active_bold()
            } else {
                Style::default()
            };
            lines.push(Line::from(vec![
                Span::raw(format!("{sel} ")),
                Span::styled(format!("{mark} "), style),
                Span::raw(format!("{}{req}", field.label)),
            ]));
        }
        FieldType::Unknown(tag) => {
            lines.push(Line::from(vec![
                Span::raw(label_prefix(field, ctx)),
                Span::styled(
                    format!("(unsupported field type: {tag})"),
                    crate::theme::text_muted(),
                ),
            ]));
        }
    }
    if let Some(err) = ctx.error {
        lines.push(Line::from(Span::styled(
            format!("  ! {err}"),
            crate::theme::text_error(),
        )));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn tel_requires_exactly_ten_digits() {
        assert!(format_validation(&FieldType::Tel, "12345").is_some());
        assert!(format_validation(&FieldType::Tel, "12345678901").is_some());
        assert!(format_validation(&FieldType::Tel, "12345abcde").is_some());
        assert_eq!(format_validation(&FieldType::Tel, "1234567890"), None);
        assert_eq!(
            format_validation(&FieldType::Tel, "12345").as_deref(),
            Some("Phone number must be exactly 10 digits")
        );
    }

    #[test]
    fn email_pattern() {
        assert_eq!(format_validation(&FieldType::Email, "a@b.co"), None);
        assert_eq!(
            format_validation(&FieldType::Email, "first.last+tag@sub.domain.org"),
            None
        );
        assert!(format_validation(&FieldType::Email, "nobody").is_some());
        assert!(format_validation(&FieldType::Email, "a@b").is_some());
        assert_eq!(
            format_validation(&FieldType::Email, "a@b").as_deref(),
            Some("Please enter a valid email address")
        );
    }

    #[test]
    fn empty_value_bypasses_format_checks() {
        assert_eq!(format_validation(&FieldType::Tel, ""), None);
        assert_eq!(format_validation(&FieldType::Email, ""), None);
        assert_eq!(format_validation(&FieldType::Date, ""), None);
    }

    #[test]
    fn date_age_bounds_are_strict() {
        let today = chrono::Local::now().date_naive();
        // Exactly 16 years in 365.25-day terms: rejected.
        let sixteen = today - Duration::days((16.0 * 365.25) as i64);
        let raw = sixteen.format("%Y-%m-%d").to_string();
        assert_eq!(
            format_validation(&FieldType::Date, &raw).as_deref(),
            Some("Age must be greater than 16 years")
        );

        let adult = today - Duration::days((30.0 * 365.25) as i64);
        let raw = adult.format("%Y-%m-%d").to_string();
        assert_eq!(format_validation(&FieldType::Date, &raw), None);

        let ancient = today - Duration::days((200.0 * 365.25) as i64);
        let raw = ancient.format("%Y-%m-%d").to_string();
        assert_eq!(
            format_validation(&FieldType::Date, &raw).as_deref(),
            Some("Enter valid age :)")
        );
    }

    #[test]
    fn unparsable_date_is_its_own_message() {
        assert_eq!(
            format_validation(&FieldType::Date, "not-a-date").as_deref(),
            Some("Please enter valid Date")
        );
    }

    #[test]
    fn non_line_types_have_no_format_rules() {
        assert_eq!(format_validation(&FieldType::Textarea, "anything"), None);
        assert_eq!(format_validation(&FieldType::Text, "anything"), None);
    }

    #[test]
    fn dropdown_gets_a_sentinel_row() {
        let field: FieldSchema = serde_json::from_value(serde_json::json!({
            "fieldId": "pick",
            "type": "dropdown",
            "label": "Pick",
            "options": [
                {"value": "a", "label": "A"},
                {"value": "b", "label": "B"}
            ]
        }))
        .unwrap();
        assert_eq!(option_rows(&field), 3);
    }
}
