use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::ui::AppState;

pub fn draw_header(f: &mut Frame, area: Rect, state: &AppState) {
    let title = state
        .config
        .header
        .clone()
        .unwrap_or_else(|| "Dynamic Form System".to_string());
    let mut lines = vec![Line::from(Span::styled(
        title,
        crate::theme::title_style().add_modifier(Modifier::BOLD),
    ))];
    if let Some(identity) = &state.identity {
        lines.push(Line::from(vec![
            Span::raw("Welcome, "),
            Span::styled(
                identity.name.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(" (Roll: {})", identity.roll_number),
                crate::theme::text_muted(),
            ),
        ]));
    }
    f.render_widget(Paragraph::new(lines), area);
}
