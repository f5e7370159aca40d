use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::Widget,
};

use crate::controller::MenuController;

const GOLDEN: Color = Color::Rgb(255, 225, 124);
const PRIMARY: Color = Color::Rgb(237, 34, 93);
const DIM: Color = Color::Rgb(86, 95, 137);

/// The always-visible toggle for one menu.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Trigger<'a> {
    pub label: &'a str,
    pub aria_label: &'a str,
    pub expanded: bool,
    pub focused: bool,
}

impl<'a> Trigger<'a> {
    pub fn of(menu: &'a MenuController, focused: bool) -> Self {
        Trigger {
            label: menu.props().anchor_text(),
            aria_label: menu.props().aria_label(),
            expanded: menu.is_open(),
            focused,
        }
    }

    /// Cells the trigger occupies: one space of padding on each side.
    pub fn width(&self) -> u16 {
        self.label.chars().count() as u16 + 2
    }

    /// What a screen reader would say for the focused trigger.
    pub fn announcement(&self) -> String {
        let state = if self.expanded { "expanded" } else { "collapsed" };
        format!("button \"{}\" {state}", self.aria_label)
    }
}

impl Widget for Trigger<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        let mut style = Style::default().fg(DIM);
        if self.expanded {
            style = Style::default().fg(Color::Black).bg(GOLDEN);
        }
        if self.focused {
            style = style.fg(PRIMARY).add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
        }
        buf.set_stringn(area.x, area.y, format!(" {} ", self.label), area.width as usize, style);
    }
}
