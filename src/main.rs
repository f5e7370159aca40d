pub mod app;
pub mod config;
pub mod controller;
pub mod coordinator;
pub mod dismiss;
pub mod error;
pub mod listener;
pub mod machine;
pub mod menu;
pub mod render;
pub mod trigger;

use std::fs::File;
use std::io;
use std::panic;
use std::sync::Mutex;
use std::time::Instant;

use anyhow::{Context, anyhow};
use clap::Parser;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers,
        MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use app::App;
use config::{Cli, Config};
use machine::MenuKey;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;
    install_panic_hook();
    let config = Config::from(&cli);
    info!(?config, "starting");

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(config);
    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
    }

    Ok(())
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    // Stdout belongs to the UI; without a file there is nowhere to log to.
    let Some(path) = &cli.log_file else {
        return Ok(());
    };
    let file = File::create(path).with_context(|| format!("cannot open log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow!("cannot install logger: {e}"))
}

/// Panics (including ones caught around menu actions) go to the log
/// instead of being printed over the alternate screen.
fn install_panic_hook() {
    panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_default();
        error!(%location, "panic: {}", controller::panic_message(info.payload()));
    }));
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> anyhow::Result<()> {
    loop {
        // Deferred closes and external close signals run between events.
        app.tick(Instant::now());
        terminal.draw(|f| render::render(f, app))?;

        if !event::poll(app.config.tick)? {
            continue;
        }

        let now = Instant::now();
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if handle_key(app, key, now) {
                    return Ok(());
                }
            }
            Event::Mouse(mouse) => handle_mouse(app, mouse, now),
            _ => {}
        }
    }
}

fn menu_key(code: KeyCode) -> Option<MenuKey> {
    match code {
        KeyCode::Up => Some(MenuKey::Up),
        KeyCode::Down => Some(MenuKey::Down),
        KeyCode::Home => Some(MenuKey::Home),
        KeyCode::End => Some(MenuKey::End),
        KeyCode::Enter => Some(MenuKey::Enter),
        KeyCode::Char(' ') => Some(MenuKey::Space),
        KeyCode::Esc => Some(MenuKey::Escape),
        _ => None,
    }
}

/// Returns true when the app should quit.
fn handle_key(app: &mut App, key: KeyEvent, now: Instant) -> bool {
    let code = key.code;

    // Global: Ctrl+C always quits
    if code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if app.pending_delete.is_some() {
        handle_delete_keys(app, code, now);
        return false;
    }

    if app.rename.is_some() {
        handle_rename_keys(app, code, now);
        return false;
    }

    app.status_msg.clear();

    // Captured by an open menu first.
    if let Some(k) = menu_key(code) {
        if app.route_menu_key(k, now) {
            return false;
        }
    }

    handle_page_keys(app, code, now)
}

// ── Page ───────────────────────────────────────────────────────────────────────

fn handle_page_keys(app: &mut App, code: KeyCode, now: Instant) -> bool {
    match code {
        KeyCode::Char('q') if !app.any_menu_open() => return true,
        KeyCode::Tab => app.focus_next(now),
        KeyCode::BackTab => app.focus_prev(now),
        KeyCode::Enter | KeyCode::Char(' ') => app.toggle_focused(now),
        KeyCode::Char('a') => app.toggle_auth(now),
        KeyCode::Esc => app.set_focus(None, now),
        _ => {}
    }
    false
}

// ── Rename field ───────────────────────────────────────────────────────────────

fn handle_rename_keys(app: &mut App, code: KeyCode, now: Instant) {
    match code {
        KeyCode::Enter => app.commit_rename(now),
        KeyCode::Esc => app.cancel_rename(),
        KeyCode::Backspace => app.rename_backspace(),
        KeyCode::Char(c) => app.rename_input(c),
        _ => {}
    }
}

// ── Delete confirmation ────────────────────────────────────────────────────────

fn handle_delete_keys(app: &mut App, code: KeyCode, now: Instant) {
    match code {
        KeyCode::Char('y') | KeyCode::Enter => app.confirm_delete(now),
        KeyCode::Char('n') | KeyCode::Esc => app.cancel_delete(),
        _ => {}
    }
}

// ── Pointer ────────────────────────────────────────────────────────────────────

fn handle_mouse(app: &mut App, mouse: MouseEvent, now: Instant) {
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => app.pointer_down(mouse.column, mouse.row, now),
        MouseEventKind::Up(MouseButton::Left) => app.pointer_up(mouse.column, mouse.row, now),
        _ => {}
    }
}
