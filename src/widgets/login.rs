use crossterm::event::KeyCode;
use ratatui::prelude::*;
use ratatui::widgets::{Paragraph, Wrap};

use crate::app::Effect;
use crate::model::Identity;

const ROW_ROLL: usize = 0;
const ROW_NAME: usize = 1;
const ROW_LOGIN: usize = 2;

/// Login gate: collects the roll-number/name identity. Both inputs are
/// required; the service call only fires once they are non-blank.
#[derive(Default)]
pub struct LoginWidget {
    pub roll_number: String,
    pub name: String,
    pub selected: usize,
    pub editing: bool,
    pub roll_error: Option<String>,
    pub name_error: Option<String>,
    pub api_error: Option<String>,
    pub busy: bool,
}

impl LoginWidget {
    /// Reset for a fresh login after logout; typed values are kept so a
    /// re-login is one Enter away.
    pub fn reset_errors(&mut self) {
        self.roll_error = None;
        self.name_error = None;
        self.api_error = None;
        self.busy = false;
        self.editing = false;
    }

    fn validate(&mut self) -> bool {
        let mut ok = true;
        if self.roll_number.trim().is_empty() {
            self.roll_error = Some("Roll number is required".into());
            ok = false;
        } else {
            self.roll_error = None;
        }
        if self.name.trim().is_empty() {
            self.name_error = Some("Name is required".into());
            ok = false;
        } else {
            self.name_error = None;
        }
        ok
    }

    fn submit(&mut self) -> Vec<Effect> {
        if !self.validate() {
            return Vec::new();
        }
        vec![Effect::Register {
            identity: Identity {
                roll_number: self.roll_number.clone(),
                name: self.name.clone(),
            },
        }]
    }

    fn active_buffer(&mut self) -> Option<&mut String> {
        match self.selected {
            ROW_ROLL => Some(&mut self.roll_number),
            ROW_NAME => Some(&mut self.name),
            _ => None,
        }
    }

    fn field_line(
        &self,
        label: &str,
        value: &str,
        row: usize,
        cursor_on: bool,
    ) -> Line<'static> {
        let sel = if self.selected == row { '›' } else { ' ' };
        let mut val = value.to_string();
        if self.editing && self.selected == row && cursor_on {
            val.push('▏');
        }
        let style = if self.selected == row {
            if self.editing {
                crate::theme::text_editing_bold()
            } else {
                crate::theme::text_active_bold()
            }
        } else {
            Style::default()
        };
        Line::from(vec![
            Span::raw(format!("{sel} {label} *: ")),
            Span::styled(val, style),
        ])
    }
}

impl crate::widgets::Widget for LoginWidget {
    fn render(&mut self, f: &mut Frame, area: Rect, focused: bool, tick: u64) {
        let cursor_on = tick % 2 == 0;
        let mut lines: Vec<Line> = Vec::new();
        if let Some(err) = &self.api_error {
            lines.push(Line::from(Span::styled(
                err.clone(),
                crate::theme::text_error(),
            )));
            lines.push(Line::from(""));
        }
        lines.push(self.field_line("Roll Number", &self.roll_number, ROW_ROLL, cursor_on));
        if let Some(err) = &self.roll_error {
            lines.push(Line::from(Span::styled(
                format!("  ! {err}"),
                crate::theme::text_error(),
            )));
        }
        lines.push(self.field_line("Name", &self.name, ROW_NAME, cursor_on));
        if let Some(err) = &self.name_error {
            lines.push(Line::from(Span::styled(
                format!("  ! {err}"),
                crate::theme::text_error(),
            )));
        }
        lines.push(Line::from(""));
        let login_label = if self.busy { "[ Logging in… ]" } else { "[ Login ]" };
        let login_style = if self.busy {
            crate::theme::text_muted()
        } else if self.selected == ROW_LOGIN {
            crate::theme::list_cursor_style()
        } else {
            crate::theme::text_active_bold()
        };
        lines.push(Line::from(Span::styled(
            format!("  {login_label}"),
            login_style,
        )));

        let block = crate::widgets::chrome::panel_block("Student Login", focused);
        let p = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
        f.render_widget(p, area);
    }

    fn on_key(&mut self, key: KeyCode) -> Vec<Effect> {
        if self.busy {
            return Vec::new();
        }
        match key {
            KeyCode::Up => {
                if !self.editing && self.selected > 0 {
                    self.selected -= 1;
                }
            }
            KeyCode::Down | KeyCode::Tab => {
                if !self.editing && self.selected < ROW_LOGIN {
                    self.selected += 1;
                }
            }
            KeyCode::Enter => {
                if self.editing {
                    self.editing = false;
                } else if self.selected == ROW_LOGIN {
                    return self.submit();
                } else {
                    self.editing = true;
                }
            }
            KeyCode::Backspace => {
                if self.editing {
                    if let Some(buf) = self.active_buffer() {
                        buf.pop();
                    }
                }
            }
            KeyCode::Esc => {
                self.editing = false;
            }
            KeyCode::Char(c) => {
                if self.editing {
                    if let Some(buf) = self.active_buffer() {
                        buf.push(c);
                    }
                }
            }
            _ => {}
        }
        Vec::new()
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widgets::Widget as _;

    #[test]
    fn blank_inputs_never_reach_the_service() {
        let mut login = LoginWidget {
            selected: ROW_LOGIN,
            ..Default::default()
        };
        let effects = login.on_key(KeyCode::Enter);
        assert!(effects.is_empty());
        assert_eq!(login.roll_error.as_deref(), Some("Roll number is required"));
        assert_eq!(login.name_error.as_deref(), Some("Name is required"));
    }

    #[test]
    fn whitespace_only_counts_as_blank() {
        let mut login = LoginWidget {
            roll_number: "  ".into(),
            name: "Alice".into(),
            selected: ROW_LOGIN,
            ..Default::default()
        };
        assert!(login.on_key(KeyCode::Enter).is_empty());
        assert!(login.roll_error.is_some());
        assert!(login.name_error.is_none());
    }

    #[test]
    fn valid_identity_emits_register_effect() {
        let mut login = LoginWidget {
            roll_number: "R1".into(),
            name: "Alice".into(),
            selected: ROW_LOGIN,
            ..Default::default()
        };
        let effects = login.on_key(KeyCode::Enter);
        assert_eq!(effects.len(), 1);
        match &effects[0] {
            Effect::Register { identity } => {
                assert_eq!(identity.roll_number, "R1");
                assert_eq!(identity.name, "Alice");
            }
            other => panic!("expected Register effect, got {other:?}"),
        }
    }

    #[test]
    fn busy_login_ignores_input() {
        let mut login = LoginWidget {
            roll_number: "R1".into(),
            name: "Alice".into(),
            selected: ROW_LOGIN,
            busy: true,
            ..Default::default()
        };
        assert!(login.on_key(KeyCode::Enter).is_empty());
    }
}
