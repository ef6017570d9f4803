//! Window layout: the board on the left, the settings form, controls and HUD on the right.

use canvas::graphics::{Color, Renderer2d, line_advance_y, text_width, DEFAULT_TEXT_SCALE};
use canvas::surface::{Surface, SurfaceSize};
use canvas::ui::{Insets, Rect};

use crate::hud::Hud;
use crate::render::{BOARD_BUDGET_PX, COLOR_BACKGROUND};
use crate::rule_engine::RuleEngine;
use crate::session::HostSession;
use crate::settings::{FormField, SettingsForm};

const MARGIN: u32 = 16;
const PADDING: u32 = 12;
const PANEL_W: u32 = 260;
const FIELD_H: u32 = 24;
const BUTTON_H: u32 = 28;
const BUTTON_GAP: u32 = 12;
const HUD_STEP: u32 = 20;

const COLOR_WINDOW_BG: Color = [10, 10, 14, 255];
const COLOR_PANEL_BG: Color = [16, 16, 22, 255];
const COLOR_PANEL_BORDER: Color = [40, 40, 55, 255];
const COLOR_TEXT: Color = [235, 235, 245, 255];
const COLOR_TEXT_DIM: Color = [148, 163, 184, 255];
const COLOR_FIELD_BG: Color = [2, 6, 23, 255];
const COLOR_FOCUS: Color = [0x38, 0xbd, 0xf8, 255];
const COLOR_BUTTON_BG: Color = [30, 41, 59, 255];
const COLOR_STATUS: Color = [0xfa, 0xcc, 0x15, 255];
const COLOR_STATUS_HIGHLIGHT: Color = [0xf8, 0x71, 0x71, 255];

pub const WINDOW_SIZE: SurfaceSize = SurfaceSize::new(
    MARGIN + BOARD_BUDGET_PX + MARGIN + PANEL_W + MARGIN,
    MARGIN + BOARD_BUDGET_PX + MARGIN,
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelButton {
    Reset,
    Pause,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PanelLayout {
    pub board: Rect,
    pub panel: Rect,
    pub fields: [Rect; 3],
    pub reset_button: Rect,
    pub pause_button: Rect,
    pub hud_x: u32,
    pub hud_y: u32,
}

impl PanelLayout {
    pub fn compute() -> Self {
        let board = Rect::new(MARGIN, MARGIN, BOARD_BUDGET_PX, BOARD_BUDGET_PX);
        let panel = Rect::new(
            board.x + board.w + MARGIN,
            MARGIN,
            PANEL_W,
            BOARD_BUDGET_PX,
        );
        let inner = panel.inset(Insets::all(PADDING));
        let label_h = line_advance_y(DEFAULT_TEXT_SCALE) + 2;

        // Title line, then each field is a label line over its input box.
        let mut fields = [Rect::default(); 3];
        let mut above = Rect::new(inner.x, inner.y, inner.w, label_h);
        for field in fields.iter_mut() {
            *field = above.below(label_h, FIELD_H);
            above = *field;
        }

        let buttons = above.below(BUTTON_GAP, BUTTON_H);
        let (reset_button, pause_button) = buttons.split_columns(BUTTON_GAP);

        Self {
            board,
            panel,
            fields,
            reset_button,
            pause_button,
            hud_x: inner.x,
            hud_y: buttons.bottom() + 2 * BUTTON_GAP,
        }
    }

    pub fn field_rect(&self, field: FormField) -> Rect {
        match field {
            FormField::Rows => self.fields[0],
            FormField::Cols => self.fields[1],
            FormField::Drops => self.fields[2],
        }
    }

    pub fn field_at(&self, x: u32, y: u32) -> Option<FormField> {
        FormField::ALL
            .into_iter()
            .find(|f| self.field_rect(*f).contains(x, y))
    }

    pub fn button_at(&self, x: u32, y: u32) -> Option<PanelButton> {
        if self.reset_button.contains(x, y) {
            Some(PanelButton::Reset)
        } else if self.pause_button.contains(x, y) {
            Some(PanelButton::Pause)
        } else {
            None
        }
    }
}

/// Draws one full window frame from the session's current state.
pub fn draw_window<E: RuleEngine>(
    r: &mut dyn Renderer2d,
    layout: &PanelLayout,
    session: &HostSession<E>,
    focus: Option<FormField>,
) {
    r.clear(COLOR_WINDOW_BG);

    r.fill_rect(layout.board, COLOR_BACKGROUND);
    let surface = session.surface();
    r.blit_rgba(layout.board.x, layout.board.y, surface.size(), surface.frame());

    r.fill_rect(layout.panel, COLOR_PANEL_BG);
    r.rect_outline(layout.panel, COLOR_PANEL_BORDER);
    draw_form(r, layout, session.form(), focus);
    draw_button(r, layout.reset_button, "RESET");
    draw_button(r, layout.pause_button, session.hud().pause_label.text());
    draw_hud(r, layout, session.hud());
}

fn draw_form(r: &mut dyn Renderer2d, layout: &PanelLayout, form: &SettingsForm, focus: Option<FormField>) {
    let title_y = layout.panel.y + PADDING;
    r.draw_text(layout.hud_x, title_y, "TETRIS", COLOR_TEXT);

    let label_h = line_advance_y(DEFAULT_TEXT_SCALE) + 2;
    for field in FormField::ALL {
        let rect = layout.field_rect(field);
        r.draw_text(rect.x, rect.y - label_h, field.label(), COLOR_TEXT_DIM);
        r.fill_rect(rect, COLOR_FIELD_BG);
        let border = if focus == Some(field) {
            COLOR_FOCUS
        } else {
            COLOR_PANEL_BORDER
        };
        r.rect_outline(rect, border);
        let text_y = rect.y + (FIELD_H - line_advance_y(DEFAULT_TEXT_SCALE)) / 2 + 1;
        r.draw_text(rect.x + 6, text_y, form.field(field), COLOR_TEXT);
    }
}

fn draw_button(r: &mut dyn Renderer2d, rect: Rect, label: &str) {
    r.fill_rect(rect, COLOR_BUTTON_BG);
    r.rect_outline(rect, COLOR_PANEL_BORDER);
    let w = text_width(label, DEFAULT_TEXT_SCALE);
    let x = rect.x + rect.w.saturating_sub(w) / 2;
    let y = rect.y + (rect.h - line_advance_y(DEFAULT_TEXT_SCALE)) / 2 + 1;
    r.draw_text(x, y, label, COLOR_TEXT);
}

fn draw_hud(r: &mut dyn Renderer2d, layout: &PanelLayout, hud: &Hud) {
    let x = layout.hud_x;
    let mut y = layout.hud_y;
    for (label, value) in [
        ("SCORE", hud.score.as_str()),
        ("LINES", hud.lines.as_str()),
        ("DROPS LEFT", hud.drops_left.as_str()),
    ] {
        r.draw_text(x, y, label, COLOR_TEXT_DIM);
        let vx = x + text_width("DROPS LEFT ", DEFAULT_TEXT_SCALE);
        r.draw_text(vx, y, value, COLOR_TEXT);
        y += HUD_STEP;
    }

    y += HUD_STEP / 2;
    r.draw_text(x, y, "STATUS", COLOR_TEXT_DIM);
    y += HUD_STEP;
    let color = if hud.status.highlight {
        COLOR_STATUS_HIGHLIGHT
    } else {
        COLOR_STATUS
    };
    r.draw_text(x, y, &hud.status.text, color);

    y += 2 * HUD_STEP;
    r.draw_text(x, y, "ARROWS MOVE", COLOR_TEXT_DIM);
    r.draw_text(x, y + HUD_STEP, "UP/X Z ROTATE", COLOR_TEXT_DIM);
    r.draw_text(x, y + 2 * HUD_STEP, "SPACE DROP", COLOR_TEXT_DIM);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_fits_window() {
        let layout = PanelLayout::compute();
        let right = layout.panel.x + layout.panel.w;
        assert!(right <= WINDOW_SIZE.width);
        assert!(layout.board.y + layout.board.h <= WINDOW_SIZE.height);
        assert!(layout.hud_y + 10 * HUD_STEP <= layout.panel.y + layout.panel.h);
    }

    #[test]
    fn hit_tests_find_fields_and_buttons() {
        let layout = PanelLayout::compute();
        for field in FormField::ALL {
            let rect = layout.field_rect(field);
            assert_eq!(layout.field_at(rect.x + 1, rect.y + 1), Some(field));
            assert_eq!(layout.button_at(rect.x + 1, rect.y + 1), None);
        }
        let reset = layout.reset_button;
        let pause = layout.pause_button;
        assert_eq!(layout.button_at(reset.x, reset.y), Some(PanelButton::Reset));
        assert_eq!(
            layout.button_at(pause.x + pause.w - 1, pause.y + pause.h - 1),
            Some(PanelButton::Pause)
        );
        assert_eq!(layout.button_at(layout.board.x + 5, layout.board.y + 5), None);
        assert_eq!(layout.field_at(layout.board.x + 5, layout.board.y + 5), None);
    }

    #[test]
    fn fields_do_not_overlap_buttons() {
        let layout = PanelLayout::compute();
        let last = layout.field_rect(FormField::Drops);
        assert!(last.y + last.h <= layout.reset_button.y);
    }
}
