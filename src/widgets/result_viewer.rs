use crossterm::event::KeyCode;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::app::Effect;
use crate::widgets::chrome::panel_block;

/// Scrollable view of the submitted payload. The form itself stays alive
/// underneath; Esc returns to it.
pub struct ResultViewerWidget {
    pub title: String,
    pub json_pretty: String,
    scroll_y: u16,
    last_viewport_h: u16,
}

impl ResultViewerWidget {
    pub fn new(title: impl Into<String>, value: &serde_json::Value) -> Self {
        let json_pretty =
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
        Self {
            title: title.into(),
            json_pretty,
            scroll_y: 0,
            last_viewport_h: 0,
        }
    }

    fn max_scroll(&self) -> u16 {
        let total = self.json_pretty.lines().count() as u16;
        total.saturating_sub(self.last_viewport_h.max(1))
    }
}

impl crate::widgets::Widget for ResultViewerWidget {
    fn render(&mut self, f: &mut Frame, area: Rect, focused: bool, _tick: u64) {
        let block = panel_block(&self.title, focused);
        self.last_viewport_h = block.inner(area).height;
        let p = Paragraph::new(self.json_pretty.clone())
            .block(block)
            .scroll((self.scroll_y.min(self.max_scroll()), 0));
        f.render_widget(p, area);
    }

    fn on_key(&mut self, key: KeyCode) -> Vec<Effect> {
        match key {
            KeyCode::Up => self.scroll_y = self.scroll_y.saturating_sub(1),
            KeyCode::Down => self.scroll_y = (self.scroll_y + 1).min(self.max_scroll()),
            KeyCode::PageUp => {
                self.scroll_y = self.scroll_y.saturating_sub(self.last_viewport_h.max(1))
            }
            KeyCode::PageDown => {
                self.scroll_y =
                    (self.scroll_y + self.last_viewport_h.max(1)).min(self.max_scroll())
            }
            KeyCode::Home => self.scroll_y = 0,
            KeyCode::End => self.scroll_y = self.max_scroll(),
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
