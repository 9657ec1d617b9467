use ratatui::prelude::*;

use crate::engine::FormEngine;
use crate::model::SectionSchema;
use crate::widgets::field::{draw_field, FieldCtx};

/// Rendered lines of the active section plus, per field row, the index of
/// its first line (used to keep the selected row inside the viewport).
pub struct SectionView {
    pub lines: Vec<Line<'static>>,
    pub row_lines: Vec<usize>,
}

/// Render the active section: title, description, then every field in
/// schema order. Inactive sections are never passed in here; the form
/// widget only renders the section the engine points at.
#[allow(clippy::too_many_arguments)]
pub fn render_section(
    section: &SectionSchema,
    engine: &FormEngine,
    selected_row: Option<usize>,
    editing: bool,
    cursor_on: bool,
    option_cursor: usize,
    option_offset: usize,
) -> SectionView {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut row_lines: Vec<usize> = Vec::new();

    lines.push(Line::from(Span::styled(
        section.title.clone(),
        crate::theme::title_style().add_modifier(Modifier::BOLD),
    )));
    if !section.description.is_empty() {
        lines.push(Line::from(Span::styled(
            section.description.clone(),
            crate::theme::text_muted(),
        )));
    }
    lines.push(Line::from(""));

    for (i, field) in section.fields.iter().enumerate() {
        row_lines.push(lines.len());
        let selected = selected_row == Some(i);
        let ctx = FieldCtx {
            value: engine.value(&field.field_id),
            error: engine.error(&field.field_id),
            selected,
            editing: selected && editing,
            cursor_on,
            option_cursor,
            option_offset,
        };
        draw_field(&mut lines, field, &ctx);
    }

    SectionView { lines, row_lines }
}

/// First visible line so that `anchor` stays inside a window of `inner_h`
/// lines.
pub(crate) fn scroll_offset(anchor: usize, inner_h: u16) -> usize {
    if inner_h == 0 {
        return 0;
    }
    let ih = inner_h as usize;
    if anchor + 1 <= ih {
        0
    } else {
        anchor + 1 - ih
    }
}
