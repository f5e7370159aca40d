use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::app::{App, HitMap, MAX_NAME_LEN};
use crate::menu::{Align, RenderedItem};
use crate::trigger::Trigger;

// ── Colors ─────────────────────────────────────────────────────────────────

const BLUE: Color = Color::Rgb(122, 162, 247);
const GREEN: Color = Color::Rgb(158, 206, 106);
const ORANGE: Color = Color::Rgb(255, 158, 100);
const CYAN: Color = Color::Rgb(115, 218, 202);
const YELLOW: Color = Color::Rgb(224, 175, 104);
const DIM: Color = Color::Rgb(86, 95, 137);
const DARK_BLUE: Color = Color::Rgb(192, 202, 245);
const GOLDEN: Color = Color::Rgb(255, 225, 124);
const PRIMARY: Color = Color::Rgb(237, 34, 93);

// ── Layout constants ────────────────────────────────────────────────────────

const DATE_W: usize = 14;
const TRIGGER_COL_W: u16 = 5;

// ── Main render entry point ─────────────────────────────────────────────────

pub fn render(f: &mut Frame, app: &mut App) {
    let size = f.area();
    app.width = size.width;
    app.height = size.height;
    app.hits = HitMap::default();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3), Constraint::Length(4)])
        .split(size);

    render_location_bar(f, app, chunks[0]);
    render_sketch_table(f, app, chunks[1]);
    render_controls_panel(f, app, chunks[2]);

    // Overlays
    if let Some(i) = app.rows.iter().position(|r| r.menu.is_open()) {
        render_menu_list(f, app, i, size);
    }
    if app.rename.is_some() {
        render_rename_overlay(f, app);
    }
    if app.pending_delete.is_some() {
        render_delete_overlay(f, app);
    }
}

// ── Location Bar ──────────────────────────────────────────────────────────────

fn render_location_bar(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(BLUE));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let who = if app.session.authenticated {
        Span::styled(format!("{}  ", app.session.user), Style::default().fg(GREEN))
    } else {
        Span::styled("guest  ".to_string(), Style::default().fg(DIM))
    };
    let line = Line::from(vec![
        who,
        Span::styled(app.location(), Style::default().fg(CYAN)),
    ]);
    f.render_widget(Paragraph::new(line), inner);
}

// ── Sketch Table ──────────────────────────────────────────────────────────────

fn render_sketch_table(f: &mut Frame, app: &mut App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ORANGE))
        .title(Span::styled("Sketches", Style::default().fg(ORANGE).add_modifier(Modifier::BOLD)));
    let inner = block.inner(area);
    f.render_widget(block, area);

    if inner.height == 0 || inner.width <= TRIGGER_COL_W {
        return;
    }
    let name_w = (inner.width as usize)
        .saturating_sub(TRIGGER_COL_W as usize + 2 * DATE_W)
        .max(8);

    let header = format!(
        "{:<name_w$}{:<DATE_W$}{:<DATE_W$}",
        "Sketch", "Date Created", "Date Updated"
    );
    f.render_widget(
        Paragraph::new(Span::styled(header, Style::default().fg(DIM).add_modifier(Modifier::BOLD))),
        Rect { height: 1, ..inner },
    );

    let ws = app.workspace.borrow();
    for (i, row) in app.rows.iter().enumerate() {
        let y = inner.y + 1 + i as u16;
        if y >= inner.y + inner.height {
            break;
        }
        let Ok(project) = ws.project(&row.project_id) else {
            continue;
        };
        let focused = app.focus == Some(i) && app.rename.is_none();

        let mut name = truncate(&project.name, name_w.saturating_sub(1));
        if app.rename.as_ref().is_some_and(|r| r.project_id == project.id) {
            name = "(renaming…)".to_string();
        }
        let style = if focused {
            Style::default().fg(ORANGE).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(DARK_BLUE)
        };
        let text = format!(
            "{:<name_w$}{:<DATE_W$}{:<DATE_W$}",
            name, project.created, project.updated
        );
        f.render_widget(
            Paragraph::new(Span::styled(text, style)),
            Rect::new(inner.x, y, inner.width - TRIGGER_COL_W, 1),
        );

        let trigger = Trigger::of(&row.menu, focused);
        let trigger_area = Rect::new(
            inner.x + inner.width - TRIGGER_COL_W + 1,
            y,
            trigger.width().min(TRIGGER_COL_W - 1),
            1,
        );
        f.render_widget(trigger, trigger_area);
        app.hits.triggers.push((i, trigger_area));
    }

    if app.rows.is_empty() {
        f.render_widget(
            Paragraph::new(Span::styled("No sketches.", Style::default().fg(DIM))),
            Rect::new(inner.x, inner.y + 1, inner.width, 1).intersection(inner),
        );
    }
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

// ── Controls Panel ────────────────────────────────────────────────────────────

fn render_controls_panel(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(GREEN));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let help = if app.pending_delete.is_some() {
        "Delete:  y/Enter Confirm  n/Esc Cancel"
    } else if app.rename.is_some() {
        "Rename:  Type to edit  Enter Save  Esc Cancel"
    } else if app.any_menu_open() {
        "Menu:  ↑↓ Move  Home/End Jump  Enter/Space Select  Esc Close  Tab Leave"
    } else {
        "Nav: Tab/Shift+Tab Focus  Enter/Space Open menu  a Sign in/out  q Quit"
    };

    // Screen-reader style announcement of the focused control.
    let mut status = match app.focus.and_then(|i| app.rows.get(i)) {
        Some(row) => Trigger::of(&row.menu, true).announcement(),
        None => String::new(),
    };
    if !app.status_msg.is_empty() {
        if !status.is_empty() {
            status.push_str("  │  ");
        }
        status.push_str(&app.status_msg);
    }

    let text = Text::from(vec![
        Line::styled(help, Style::default().fg(YELLOW)),
        Line::styled(status, Style::default().fg(DIM)),
    ]);
    f.render_widget(Paragraph::new(text), inner);
}

// ── Menu List Overlay ─────────────────────────────────────────────────────────

fn render_menu_list(f: &mut Frame, app: &mut App, row: usize, screen: Rect) {
    let Some(&(_, trigger)) = app.hits.triggers.iter().find(|(i, _)| *i == row) else {
        return;
    };
    let menu = &mut app.rows[row].menu;
    let items = menu.rendered_items();
    let area = list_rect(&items, trigger, menu.props().align, screen);
    if area.width < 3 || area.height < 3 {
        return;
    }
    f.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ORANGE));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let mut rects = Vec::with_capacity(items.len());
    for item in &items {
        let y = inner.y + item.index as u16;
        if y >= inner.y + inner.height {
            break;
        }
        let rect = Rect::new(inner.x, y, inner.width, 1);
        let suffix = if item.link { " ↗" } else { "" };
        let label = format!(" {}{suffix}", item.name);
        let style = if item.selected {
            Style::default().fg(Color::Black).bg(GOLDEN).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(DARK_BLUE)
        };
        f.render_widget(
            Paragraph::new(Span::styled(format!("{label:<w$}", w = inner.width as usize), style)),
            rect,
        );
        rects.push(rect);
    }

    // Focus follows the highlight one frame later.
    if let Some(focus) = menu.focus_for_frame() {
        if let Some(rect) = rects.get(focus) {
            f.set_cursor_position((rect.x, rect.y));
        }
    }
    app.hits.list = Some((row, area, rects));
}

fn list_rect(items: &[RenderedItem], trigger: Rect, align: Align, screen: Rect) -> Rect {
    let widest = items
        .iter()
        .map(|i| i.name.chars().count() + if i.link { 2 } else { 0 })
        .max()
        .unwrap_or(0);
    let width = ((widest + 3) as u16 + 2).min(screen.width);
    let height = (items.len() as u16 + 2).min(screen.height.saturating_sub(trigger.y + 1));

    let x = match align {
        Align::Left => trigger.x,
        Align::Right => (trigger.x + trigger.width).saturating_sub(width),
    };
    let x = x.min(screen.width.saturating_sub(width));
    Rect::new(x, trigger.y + 1, width, height)
}

// ── Rename Overlay ────────────────────────────────────────────────────────────

fn render_rename_overlay(f: &mut Frame, app: &App) {
    let Some(field) = &app.rename else {
        return;
    };
    let area = overlay_rect(f.area(), 50, 7);
    f.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ORANGE))
        .title(Span::styled("Rename Sketch", Style::default().fg(ORANGE).add_modifier(Modifier::BOLD)));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let visible_w = (inner.width as usize).saturating_sub(8);
    let count = field.value.chars().count();
    let shown: String = field.value.chars().skip(count.saturating_sub(visible_w)).collect();
    let lines = vec![
        Line::default(),
        Line::styled(format!("Name: {shown}_"), Style::default().fg(DARK_BLUE)),
        Line::styled(format!("{count}/{MAX_NAME_LEN}"), Style::default().fg(DIM)),
        Line::styled("⏎ Save  Esc Cancel", Style::default().fg(DIM)),
    ];
    f.render_widget(Paragraph::new(Text::from(lines)), inner);
}

// ── Delete Confirmation ───────────────────────────────────────────────────────

fn render_delete_overlay(f: &mut Frame, app: &App) {
    let Some(name) = app.pending_delete_name() else {
        return;
    };
    let area = overlay_rect(f.area(), 50, 6);
    f.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(PRIMARY))
        .title(Span::styled("Delete Sketch", Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD)));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let lines = vec![
        Line::default(),
        Line::styled(
            format!("Are you sure you want to delete \"{}\"?", truncate(&name, 24)),
            Style::default().fg(DARK_BLUE),
        ),
        Line::styled("y/⏎ Delete  n/Esc Cancel", Style::default().fg(DIM)),
    ];
    f.render_widget(Paragraph::new(Text::from(lines)), inner);
}

fn overlay_rect(screen: Rect, min_w: u16, min_h: u16) -> Rect {
    let w = min_w.min(screen.width.saturating_sub(4));
    let h = min_h.min(screen.height.saturating_sub(4));
    Rect {
        x: 2,
        y: 2,
        width: w,
        height: h,
    }
}
