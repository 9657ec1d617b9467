use std::collections::HashMap;

use crossterm::event::KeyCode;
use ratatui::crossterm::event as rt_event;
use ratatui::prelude::*;
use ratatui::widgets::{Clear, Gauge, Paragraph, Wrap};
use tui_textarea::TextArea;

use crate::app::Effect;
use crate::engine::{FieldValue, FormEngine};
use crate::model::{FieldSchema, FieldType};
use crate::widgets::field::{format_validation, option_rows, OPTIONS_VISIBLE};
use crate::widgets::section::{render_section, scroll_offset};

pub const VALIDATION_MESSAGE: &str = "Please fix the highlighted errors";

/// The form view. Owns the engine (and with it schema, values, errors and
/// the section index) plus the transient view state: which row is selected,
/// whether it is being edited, and the option cursor for choice fields.
///
/// Row layout per section: `0..n` are the fields, `n` is Previous and
/// `n + 1` is Next (or Submit on the last section).
pub struct FormWidget {
    pub engine: FormEngine,
    pub selected: usize,
    pub editing: bool,
    pub option_cursor: usize,
    pub option_offset: usize,
    pub message: Option<String>,
    ta_map: HashMap<String, TextArea<'static>>,
}

impl FormWidget {
    pub fn new(engine: FormEngine) -> Self {
        Self {
            engine,
            selected: 0,
            editing: false,
            option_cursor: 0,
            option_offset: 0,
            message: None,
            ta_map: HashMap::new(),
        }
    }

    fn field_count(&self) -> usize {
        self.engine
            .schema()
            .sections
            .get(self.engine.current_section())
            .map(|s| s.fields.len())
            .unwrap_or(0)
    }

    fn prev_idx(&self) -> usize {
        self.field_count()
    }

    fn next_idx(&self) -> usize {
        self.field_count() + 1
    }

    fn is_last_section(&self) -> bool {
        self.engine.current_section() + 1 >= self.engine.section_count()
    }

    fn selected_field(&self) -> Option<FieldSchema> {
        self.engine
            .schema()
            .sections
            .get(self.engine.current_section())?
            .fields
            .get(self.selected)
            .cloned()
    }

    /// Reset the view to the top of the current section ("scroll to top").
    fn go_top(&mut self) {
        self.selected = 0;
        self.editing = false;
        self.option_cursor = 0;
        self.option_offset = 0;
    }

    fn raw_text(&self, field_id: &str) -> String {
        self.engine
            .value(field_id)
            .and_then(|v| v.as_text())
            .unwrap_or("")
            .to_string()
    }

    /// Apply one character edit (push or pop) to a line input, running the
    /// format validator before the value reaches the engine.
    fn edit_line_input(&mut self, field: &FieldSchema, push: Option<char>) {
        let mut raw = self.raw_text(&field.field_id);
        match push {
            Some(c) => raw.push(c),
            None => {
                raw.pop();
            }
        }
        let err = format_validation(&field.field_type, &raw);
        self.engine
            .set_field_value(&field.field_id, FieldValue::Text(raw), err);
    }

    /// Position of the field's current value in its option list (for the
    /// cursor when editing starts). Dropdown row 0 is the empty sentinel.
    fn current_option_row(&self, field: &FieldSchema) -> usize {
        let current = self.raw_text(&field.field_id);
        let options = field.options.as_deref().unwrap_or(&[]);
        let pos = options.iter().position(|o| o.value == current);
        match field.field_type {
            FieldType::Dropdown => pos.map(|p| p + 1).unwrap_or(0),
            _ => pos.unwrap_or(0),
        }
    }

    fn begin_edit(&mut self, field: &FieldSchema) {
        self.editing = true;
        self.option_cursor = self.current_option_row(field);
        self.option_offset = self
            .option_cursor
            .saturating_sub(OPTIONS_VISIBLE.saturating_sub(1));
        if matches!(field.field_type, FieldType::Textarea) {
            let mut ta = TextArea::default();
            let text = self.raw_text(&field.field_id);
            if !text.is_empty() {
                ta.insert_str(&text);
            }
            ta.set_block(
                ratatui::widgets::Block::default()
                    .borders(ratatui::widgets::Borders::ALL)
                    .title(format!("Editing: {} — Ctrl+S Save • Esc Cancel", field.label)),
            );
            self.ta_map.insert(field.field_id.clone(), ta);
        }
    }

    fn editing_textarea(&self) -> Option<FieldSchema> {
        if !self.editing {
            return None;
        }
        let field = self.selected_field()?;
        matches!(field.field_type, FieldType::Textarea).then_some(field)
    }

    /// Save the textarea overlay back into the engine. Bound to Ctrl+S in
    /// the event loop, mirroring the overlay's title hint.
    pub fn commit_textarea(&mut self) -> bool {
        let Some(field) = self.editing_textarea() else {
            return false;
        };
        if let Some(ta) = self.ta_map.get(&field.field_id) {
            let text = ta.lines().join("\n");
            self.engine
                .set_field_value(&field.field_id, FieldValue::Text(text), None);
            self.editing = false;
            self.message = None;
            return true;
        }
        false
    }

    fn route_to_textarea(&mut self, key: KeyCode) -> bool {
        let Some(field) = self.editing_textarea() else {
            return false;
        };
        // The app's crossterm and the one bundled with ratatui are separate
        // crate versions, so the key code is re-built rather than passed on.
        let Some(code) = to_rt_keycode(key) else {
            return true;
        };
        if let Some(ta) = self.ta_map.get_mut(&field.field_id) {
            let _ = ta.input(rt_event::KeyEvent::new(code, rt_event::KeyModifiers::NONE));
            return true;
        }
        false
    }

    /// Previous: no-op on the first section.
    fn go_previous(&mut self) {
        let idx = self.engine.current_section();
        if idx > 0 {
            self.engine.go_to_section(idx - 1);
            self.go_top();
            self.message = None;
        }
    }

    /// Next/Submit: validate the current section first; never advances past
    /// the last section and never advances while invalid.
    fn go_next_or_submit(&mut self) -> Vec<Effect> {
        let idx = self.engine.current_section();
        if !self.engine.validate_section(idx) {
            self.message = Some(VALIDATION_MESSAGE.into());
            return Vec::new();
        }
        self.message = None;
        if self.is_last_section() {
            vec![Effect::FinalizeSubmit {
                payload: self.engine.values_json(),
            }]
        } else {
            self.engine.go_to_section(idx + 1);
            self.go_top();
            Vec::new()
        }
    }

    fn quick_cycle_choice(&mut self, field: &FieldSchema, forward: bool) {
        let options = field.options.as_deref().unwrap_or(&[]);
        if options.is_empty() {
            return;
        }
        let current = self.raw_text(&field.field_id);
        let pos = options.iter().position(|o| o.value == current);
        let next = match (pos, forward) {
            (Some(p), true) => (p + 1) % options.len(),
            (Some(p), false) => (p + options.len() - 1) % options.len(),
            (None, true) => 0,
            (None, false) => options.len() - 1,
        };
        self.engine.set_field_value(
            &field.field_id,
            FieldValue::Text(options[next].value.clone()),
            None,
        );
    }

    fn option_cursor_up(&mut self) {
        if self.option_cursor > 0 {
            self.option_cursor -= 1;
        }
        if self.option_cursor < self.option_offset {
            self.option_offset = self.option_cursor;
        }
    }

    fn option_cursor_down(&mut self, rows: usize) {
        if self.option_cursor + 1 < rows {
            self.option_cursor += 1;
        }
        if self.option_cursor >= self.option_offset + OPTIONS_VISIBLE {
            self.option_offset = self.option_cursor + 1 - OPTIONS_VISIBLE;
        }
    }

    fn commit_choice_at_cursor(&mut self, field: &FieldSchema) {
        match field.field_type {
            FieldType::Dropdown => {
                let options = field.options.as_deref().unwrap_or(&[]);
                let value = if self.option_cursor == 0 {
                    String::new()
                } else {
                    options
                        .get(self.option_cursor - 1)
                        .map(|o| o.value.clone())
                        .unwrap_or_default()
                };
                self.engine
                    .set_field_value(&field.field_id, FieldValue::Text(value), None);
                self.editing = false;
            }
            FieldType::Radio => {
                if let Some(opt) = field
                    .options
                    .as_deref()
                    .unwrap_or(&[])
                    .get(self.option_cursor)
                {
                    self.engine.set_field_value(
                        &field.field_id,
                        FieldValue::Text(opt.value.clone()),
                        None,
                    );
                }
                self.editing = false;
            }
            _ => {}
        }
    }

    fn toggle_multi_at_cursor(&mut self, field: &FieldSchema) {
        if let Some(opt) = field
            .options
            .as_deref()
            .unwrap_or(&[])
            .get(self.option_cursor)
        {
            let value = opt.value.clone();
            self.engine.toggle_option(&field.field_id, &value);
        }
    }
}

impl crate::widgets::Widget for FormWidget {
    fn render(&mut self, f: &mut Frame, area: Rect, focused: bool, tick: u64) {
        let mut cursor_on = tick % 2 == 0;
        if self.editing_textarea().is_some() {
            cursor_on = false;
        }

        let title = if self.editing {
            format!("{} — editing", self.engine.schema().form_title)
        } else {
            self.engine.schema().form_title.clone()
        };
        let block = crate::widgets::chrome::panel_block(&title, focused);
        let inner = block.inner(area);
        f.render_widget(block, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(1)])
            .split(inner);

        let (current, total) = self.engine.progress();
        let gauge = Gauge::default()
            .ratio(current as f64 / total.max(1) as f64)
            .label(format!("Section {current} of {total}"))
            .gauge_style(Style::default().fg(Color::Rgb(64, 160, 255)));
        f.render_widget(gauge, chunks[0]);

        let section_idx = self.engine.current_section();
        let Some(section) = self.engine.schema().sections.get(section_idx).cloned() else {
            return;
        };
        let selected_row = (self.selected < section.fields.len()).then_some(self.selected);
        let mut view = render_section(
            &section,
            &self.engine,
            selected_row,
            self.editing,
            cursor_on,
            self.option_cursor,
            self.option_offset,
        );

        // Previous / Next / Submit row, then the form-level message.
        view.lines.push(Line::from(""));
        let buttons_line = view.lines.len();
        let prev_enabled = section_idx > 0;
        let mut prev_style = if prev_enabled {
            Style::default().fg(Color::Cyan)
        } else {
            crate::theme::text_muted()
        };
        if self.selected == self.prev_idx() {
            prev_style = crate::theme::list_cursor_style();
        }
        let mut next_style = crate::theme::text_active_bold();
        if self.selected == self.next_idx() {
            next_style = crate::theme::list_cursor_style();
        }
        let next_label = if self.is_last_section() {
            "[ Submit ]"
        } else {
            "[ Next ]"
        };
        view.lines.push(Line::from(vec![
            Span::styled("  [ Previous ]  ", prev_style),
            Span::styled(next_label.to_string(), next_style),
        ]));
        if let Some(msg) = &self.message {
            view.lines
                .push(Line::from(Span::styled(msg.clone(), crate::theme::text_error())));
        }

        let anchor = if self.selected < view.row_lines.len() {
            view.row_lines[self.selected]
        } else {
            buttons_line
        };
        let scroll_y = scroll_offset(anchor, chunks[1].height) as u16;
        let body = Paragraph::new(view.lines)
            .wrap(Wrap { trim: false })
            .scroll((scroll_y, 0));
        f.render_widget(body, chunks[1]);

        // Textarea overlay on top of everything else.
        if let Some(field) = self.editing_textarea() {
            if let Some(ta) = self.ta_map.get_mut(&field.field_id) {
                let rect = centered_rect(80, 70, area);
                f.render_widget(Clear, rect);
                f.render_widget(&*ta, rect);
            }
        }
    }

    fn on_key(&mut self, key: KeyCode) -> Vec<Effect> {
        let mut effects: Vec<Effect> = Vec::new();
        // The textarea overlay swallows everything except Esc (cancel) and
        // the Ctrl+S commit handled by the event loop.
        if !matches!(key, KeyCode::Esc) && self.route_to_textarea(key) {
            return effects;
        }
        match key {
            KeyCode::Up => {
                if self.editing {
                    if let Some(field) = self.selected_field() {
                        match field.field_type {
                            FieldType::Dropdown | FieldType::Radio => self.option_cursor_up(),
                            FieldType::Checkbox if field.is_multi_checkbox() => {
                                self.option_cursor_up()
                            }
                            _ => {}
                        }
                    }
                } else if self.selected > 0 {
                    self.selected -= 1;
                }
            }
            KeyCode::Down => {
                if self.editing {
                    if let Some(field) = self.selected_field() {
                        match field.field_type {
                            FieldType::Dropdown | FieldType::Radio => {
                                self.option_cursor_down(option_rows(&field))
                            }
                            FieldType::Checkbox if field.is_multi_checkbox() => {
                                self.option_cursor_down(option_rows(&field))
                            }
                            _ => {}
                        }
                    }
                } else if self.selected < self.next_idx() {
                    self.selected += 1;
                }
            }
            KeyCode::Left => {
                if self.editing {
                    if let Some(field) = self.selected_field() {
                        self.commit_choice_at_cursor(&field);
                    }
                } else if self.selected == self.next_idx() {
                    self.selected = self.prev_idx();
                } else if let Some(field) = self.selected_field() {
                    if matches!(field.field_type, FieldType::Dropdown | FieldType::Radio) {
                        self.quick_cycle_choice(&field, false);
                    }
                }
            }
            KeyCode::Right => {
                if self.editing {
                    if let Some(field) = self.selected_field() {
                        self.commit_choice_at_cursor(&field);
                    }
                } else if self.selected == self.prev_idx() {
                    self.selected = self.next_idx();
                } else if let Some(field) = self.selected_field() {
                    if matches!(field.field_type, FieldType::Dropdown | FieldType::Radio) {
                        self.quick_cycle_choice(&field, true);
                    }
                }
            }
            KeyCode::Enter => {
                if self.editing {
                    if let Some(field) = self.selected_field() {
                        match field.field_type {
                            FieldType::Dropdown | FieldType::Radio => {
                                self.commit_choice_at_cursor(&field)
                            }
                            FieldType::Checkbox if field.is_multi_checkbox() => {
                                self.toggle_multi_at_cursor(&field)
                            }
                            _ => self.editing = false,
                        }
                    }
                } else if self.selected == self.prev_idx() {
                    self.go_previous();
                } else if self.selected == self.next_idx() {
                    effects.extend(self.go_next_or_submit());
                } else if let Some(field) = self.selected_field() {
                    match &field.field_type {
                        FieldType::Checkbox if !field.is_multi_checkbox() => {
                            let checked =
                                matches!(self.engine.value(&field.field_id), Some(FieldValue::Flag(true)));
                            self.engine.set_field_value(
                                &field.field_id,
                                FieldValue::Flag(!checked),
                                None,
                            );
                        }
                        FieldType::Unknown(_) => {}
                        _ => self.begin_edit(&field),
                    }
                }
            }
            KeyCode::Backspace => {
                if self.editing {
                    if let Some(field) = self.selected_field() {
                        if field.field_type.is_line_input() {
                            self.edit_line_input(&field, None);
                        }
                    }
                }
            }
            KeyCode::Esc => {
                if self.editing {
                    self.editing = false;
                }
                self.message = None;
            }
            KeyCode::Char(c) => {
                if self.editing {
                    if let Some(field) = self.selected_field() {
                        if field.field_type.is_line_input() {
                            self.edit_line_input(&field, Some(c));
                        } else if c == ' ' && field.is_multi_checkbox() {
                            self.toggle_multi_at_cursor(&field);
                        }
                    }
                } else if c == ' ' {
                    if let Some(field) = self.selected_field() {
                        match &field.field_type {
                            FieldType::Checkbox if !field.is_multi_checkbox() => {
                                let checked = matches!(
                                    self.engine.value(&field.field_id),
                                    Some(FieldValue::Flag(true))
                                );
                                self.engine.set_field_value(
                                    &field.field_id,
                                    FieldValue::Flag(!checked),
                                    None,
                                );
                            }
                            FieldType::Checkbox => {
                                // Multi-select: Space both opens the list and
                                // toggles the option under the cursor.
                                self.begin_edit(&field);
                                self.toggle_multi_at_cursor(&field);
                            }
                            _ => {}
                        }
                    }
                }
            }
            _ => {}
        }
        effects
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

fn to_rt_keycode(key: KeyCode) -> Option<rt_event::KeyCode> {
    Some(match key {
        KeyCode::Char(c) => rt_event::KeyCode::Char(c),
        KeyCode::Enter => rt_event::KeyCode::Enter,
        KeyCode::Backspace => rt_event::KeyCode::Backspace,
        KeyCode::Delete => rt_event::KeyCode::Delete,
        KeyCode::Left => rt_event::KeyCode::Left,
        KeyCode::Right => rt_event::KeyCode::Right,
        KeyCode::Up => rt_event::KeyCode::Up,
        KeyCode::Down => rt_event::KeyCode::Down,
        KeyCode::Home => rt_event::KeyCode::Home,
        KeyCode::End => rt_event::KeyCode::End,
        KeyCode::PageUp => rt_event::KeyCode::PageUp,
        KeyCode::PageDown => rt_event::KeyCode::PageDown,
        KeyCode::Tab => rt_event::KeyCode::Tab,
        _ => return None,
    })
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let v = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Percentage((100 - percent_y) / 2),
                Constraint::Percentage(percent_y),
                Constraint::Percentage((100 - percent_y) / 2),
            ]
            .as_ref(),
        )
        .split(area);
    let h = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage((100 - percent_x) / 2),
                Constraint::Percentage(percent_x),
                Constraint::Percentage((100 - percent_x) / 2),
            ]
            .as_ref(),
        )
        .split(v[1]);
    h[1]
}
