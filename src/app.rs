use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use anyhow::{Context, bail};
use ratatui::layout::Rect;
use tracing::{info, warn};

use crate::config::Config;
use crate::controller::{MenuContext, MenuController};
use crate::coordinator::OverlayCoordinator;
use crate::listener::KeyboardHub;
use crate::machine::MenuKey;
use crate::menu::{MenuItem, MenuProps};

pub const MAX_NAME_LEN: usize = 128;
pub const TOGGLE_LABEL: &str = "Toggle Open/Close Sketch Options";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub owner: String,
    pub created: &'static str,
    pub updated: &'static str,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub user: String,
    pub authenticated: bool,
}

impl Session {
    pub fn owns(&self, project: &Project) -> bool {
        self.authenticated && project.owner == self.user
    }
}

/// Page data the menu callbacks act on.
#[derive(Debug, Default)]
pub struct Workspace {
    pub projects: Vec<Project>,
    pub collection: Vec<String>,
    pub downloads: Vec<String>,
    pub rename_request: Option<String>,
    pub delete_request: Option<String>,
    pub last_event: Option<String>,
    /// Set by menu actions; the page re-syncs its rows only when it is.
    pub dirty: bool,
    next_id: u32,
}

impl Workspace {
    pub fn sample(user: &str) -> Self {
        let mut ws = Workspace::default();
        for (name, owner, created, updated) in [
            ("Bouncing Ball", user, "Jan 4, 2024", "Feb 12, 2024"),
            ("Perlin Flow Field", user, "Mar 9, 2024", "Mar 9, 2024"),
            ("Generative Waves", user, "Apr 21, 2024", "May 2, 2024"),
            ("Hello p5", "p5", "Jun 1, 2023", "Jun 1, 2023"),
            ("Color Wheel", "p5", "Aug 15, 2023", "Sep 30, 2023"),
        ] {
            ws.insert(name.to_string(), owner.to_string(), created, updated);
        }
        ws
    }

    fn insert(&mut self, name: String, owner: String, created: &'static str, updated: &'static str) -> String {
        self.next_id += 1;
        let id = format!("sk{:04}", self.next_id);
        self.projects.push(Project {
            id: id.clone(),
            name,
            owner,
            created,
            updated,
        });
        id
    }

    pub fn project(&self, id: &str) -> anyhow::Result<&Project> {
        self.projects
            .iter()
            .find(|p| p.id == id)
            .with_context(|| format!("no project with id {id}"))
    }

    pub fn rename(&mut self, id: &str, name: &str) -> anyhow::Result<()> {
        let name = name.trim();
        if name.is_empty() {
            bail!("project name cannot be blank");
        }
        if name.chars().count() > MAX_NAME_LEN {
            bail!("project name is longer than {MAX_NAME_LEN} characters");
        }
        let project = self
            .projects
            .iter_mut()
            .find(|p| p.id == id)
            .with_context(|| format!("no project with id {id}"))?;
        project.name = name.to_string();
        self.last_event = Some(format!("Renamed to {name}"));
        Ok(())
    }

    pub fn duplicate(&mut self, id: &str, owner: &str) -> anyhow::Result<()> {
        let name = format!("{} copy", self.project(id)?.name);
        if name.chars().count() > MAX_NAME_LEN {
            bail!("duplicate name is longer than {MAX_NAME_LEN} characters");
        }
        self.insert(name.clone(), owner.to_string(), "just now", "just now");
        self.last_event = Some(format!("Created {name}"));
        Ok(())
    }

    pub fn download(&mut self, id: &str) -> anyhow::Result<()> {
        let name = self.project(id)?.name.clone();
        self.downloads.push(id.to_string());
        self.last_event = Some(format!("Downloaded {name}.zip"));
        Ok(())
    }

    pub fn add_to_collection(&mut self, id: &str) -> anyhow::Result<()> {
        let name = self.project(id)?.name.clone();
        if self.collection.iter().any(|c| c == id) {
            bail!("{name} is already in the collection");
        }
        self.collection.push(id.to_string());
        self.last_event = Some(format!("Added {name} to collection"));
        Ok(())
    }

    pub fn delete(&mut self, id: &str) -> anyhow::Result<()> {
        let index = self
            .projects
            .iter()
            .position(|p| p.id == id)
            .with_context(|| format!("no project with id {id}"))?;
        let project = self.projects.remove(index);
        self.collection.retain(|c| c != id);
        self.last_event = Some(format!("Deleted {}", project.name));
        Ok(())
    }
}

pub fn slugify(name: &str, sep: char) -> String {
    let mut out = String::new();
    for ch in name.trim().chars() {
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
        } else if !out.ends_with(sep) && !out.is_empty() {
            out.push(sep);
        }
    }
    while out.ends_with(sep) {
        out.pop();
    }
    out
}

pub fn sketch_url(project: &Project) -> String {
    if project.owner == "p5" {
        format!("/{}/sketches/{}", project.owner, slugify(&project.name, '_'))
    } else {
        format!("/{}/sketches/{}", project.owner, project.id)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Visit {
    pub href: String,
    pub new_tab: bool,
}

pub struct Row {
    pub project_id: String,
    pub menu: MenuController,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenameField {
    pub project_id: String,
    pub value: String,
}

/// Screen regions recorded by the last frame, used for pointer hit tests.
#[derive(Clone, Debug, Default)]
pub struct HitMap {
    pub triggers: Vec<(usize, Rect)>,
    pub list: Option<(usize, Rect, Vec<Rect>)>,
}

fn contains(rect: Rect, col: u16, row: u16) -> bool {
    col >= rect.x && col < rect.x + rect.width && row >= rect.y && row < rect.y + rect.height
}

pub struct App {
    pub config: Config,
    pub session: Session,
    pub workspace: Rc<RefCell<Workspace>>,
    pub rows: Vec<Row>,
    pub focus: Option<usize>,
    pub rename: Option<RenameField>,
    pub pending_delete: Option<String>,
    pub visits: Rc<RefCell<Vec<Visit>>>,
    pub status_msg: String,
    pub hits: HitMap,
    pub width: u16,
    pub height: u16,
    /// Bumped on every row re-sync.
    pub revision: u64,
    cx: MenuContext,
}

impl App {
    pub fn new(config: Config) -> Self {
        let visits: Rc<RefCell<Vec<Visit>>> = Rc::default();
        let log = Rc::clone(&visits);
        let cx = MenuContext {
            keyboard: KeyboardHub::new(),
            overlays: OverlayCoordinator::new(),
            navigator: Rc::new(move |href: &str, target: Option<&str>| {
                log.borrow_mut().push(Visit {
                    href: href.to_string(),
                    new_tab: target == Some("_blank"),
                });
            }),
            grace: config.grace,
        };
        let session = Session {
            user: config.user.clone(),
            authenticated: config.authenticated,
        };
        let workspace = Rc::new(RefCell::new(Workspace::sample(&config.user)));

        let mut app = App {
            config,
            session,
            workspace,
            rows: Vec::new(),
            focus: None,
            rename: None,
            pending_delete: None,
            visits,
            status_msg: String::new(),
            hits: HitMap::default(),
            width: 80,
            height: 24,
            revision: 0,
            cx,
        };
        app.sync_rows(Instant::now());
        app
    }

    pub fn keyboard(&self) -> &KeyboardHub {
        &self.cx.keyboard
    }

    pub fn overlays(&self) -> &OverlayCoordinator {
        &self.cx.overlays
    }

    pub fn location(&self) -> String {
        self.visits
            .borrow()
            .iter()
            .rev()
            .find(|v| !v.new_tab)
            .map(|v| v.href.clone())
            .unwrap_or_else(|| format!("/{}/sketches", self.session.user))
    }

    fn project_items(&self, project: &Project) -> Vec<MenuItem> {
        let owner = self.session.owns(project);
        let signed_in = self.session.authenticated;
        let url = sketch_url(project);
        let ws = &self.workspace;
        let id = &project.id;

        vec![
            MenuItem::link("Open", url.clone()),
            MenuItem::link("Open in New Tab", url).with_target("_blank"),
            act(ws, id, |ws, id| {
                ws.project(id)?;
                ws.rename_request = Some(id.to_string());
                Ok(())
            }, "Rename")
            .hide_if(!owner),
            act(ws, id, Workspace::download, "Download"),
            {
                let user = self.session.user.clone();
                act(ws, id, move |ws, id| ws.duplicate(id, &user), "Duplicate").hide_if(!signed_in)
            },
            act(ws, id, Workspace::add_to_collection, "Add to collection").hide_if(!signed_in),
            act(ws, id, |ws, id| {
                ws.project(id)?;
                ws.delete_request = Some(id.to_string());
                Ok(())
            }, "Delete")
            .hide_if(!owner),
        ]
    }

    /// Rebuild row menus from the workspace. Menus are keyed by project id
    /// and keep their state across syncs; removed rows drop their menu.
    pub fn sync_rows(&mut self, now: Instant) {
        let projects = self.workspace.borrow().projects.clone();
        let focused_id = self.focus.and_then(|i| self.rows.get(i)).map(|r| r.project_id.clone());
        let mut old: Vec<Row> = std::mem::take(&mut self.rows);

        let mut rows = Vec::with_capacity(projects.len());
        for project in &projects {
            let items = self.project_items(project);
            match old.iter().position(|r| r.project_id == project.id) {
                Some(pos) => {
                    let mut row = old.swap_remove(pos);
                    if let Err(err) = row.menu.set_items(items, now) {
                        warn!(project = %project.id, "rejected menu items: {err}");
                    }
                    rows.push(row);
                }
                None => match MenuProps::new(items, TOGGLE_LABEL) {
                    Ok(props) => rows.push(Row {
                        project_id: project.id.clone(),
                        menu: MenuController::new(props.align(self.config.align), &self.cx),
                    }),
                    Err(err) => warn!(project = %project.id, "rejected menu: {err}"),
                },
            }
        }
        drop(old);
        self.rows = rows;
        self.revision += 1;

        self.focus = match focused_id {
            Some(id) => self
                .rows
                .iter()
                .position(|r| r.project_id == id)
                .or_else(|| self.focus.map(|i| i.min(self.rows.len().saturating_sub(1))))
                .filter(|_| !self.rows.is_empty()),
            None => None,
        };
    }

    /// Pick up what item callbacks did to the workspace. Nothing happens
    /// unless an action ran since the last call.
    pub fn after_action(&mut self, now: Instant) {
        let (rename, delete, event) = {
            let mut ws = self.workspace.borrow_mut();
            if !std::mem::take(&mut ws.dirty) {
                return;
            }
            (ws.rename_request.take(), ws.delete_request.take(), ws.last_event.take())
        };
        if let Some(event) = event {
            self.status_msg = event;
        }
        self.sync_rows(now);
        if let Some(id) = rename {
            self.begin_rename(&id, now);
        }
        if let Some(id) = delete {
            self.request_delete(&id, now);
        }
    }

    pub fn tick(&mut self, now: Instant) {
        for row in &mut self.rows {
            row.menu.tick(now);
        }
        self.after_action(now);
    }

    pub fn set_focus(&mut self, focus: Option<usize>, now: Instant) {
        if focus == self.focus {
            return;
        }
        if let Some(row) = self.focus.and_then(|i| self.rows.get_mut(i)) {
            row.menu.focus_out(now);
        }
        if let Some(row) = focus.and_then(|i| self.rows.get_mut(i)) {
            row.menu.focus_in(now);
        }
        self.focus = focus;
    }

    pub fn focus_next(&mut self, now: Instant) {
        if self.rows.is_empty() {
            return;
        }
        let next = match self.focus {
            Some(i) => (i + 1) % self.rows.len(),
            None => 0,
        };
        self.set_focus(Some(next), now);
    }

    pub fn focus_prev(&mut self, now: Instant) {
        if self.rows.is_empty() {
            return;
        }
        let prev = match self.focus {
            Some(0) | None => self.rows.len() - 1,
            Some(i) => i - 1,
        };
        self.set_focus(Some(prev), now);
    }

    pub fn toggle_focused(&mut self, now: Instant) {
        if let Some(row) = self.focus.and_then(|i| self.rows.get_mut(i)) {
            row.menu.toggle(now);
        }
    }

    /// Offer a key to whichever menu holds the keyboard.
    pub fn route_menu_key(&mut self, key: MenuKey, now: Instant) -> bool {
        let consumed = match self.rows.iter_mut().find(|r| r.menu.has_keyboard()) {
            Some(row) => row.menu.key(key, now),
            None => false,
        };
        if consumed {
            self.after_action(now);
        }
        consumed
    }

    pub fn any_menu_open(&self) -> bool {
        self.rows.iter().any(|r| r.menu.is_open())
    }

    pub fn toggle_auth(&mut self, now: Instant) {
        self.session.authenticated = !self.session.authenticated;
        info!(authenticated = self.session.authenticated, "session changed");
        self.status_msg = if self.session.authenticated {
            format!("Signed in as {}", self.session.user)
        } else {
            "Signed out".to_string()
        };
        self.sync_rows(now);
    }

    pub fn pointer_down(&mut self, col: u16, row: u16, now: Instant) {
        // Pressing anywhere blurs the rename field, which saves it.
        if self.rename.is_some() {
            self.commit_rename(now);
        }
        if self.pending_delete.is_some() {
            self.cancel_delete();
            return;
        }
        if let Some(i) = self.hit_list(col, row).map(|(i, _)| i) {
            self.cx.overlays.pointer_down(Some(self.rows[i].menu.overlay_id()));
            return;
        }
        let trigger = self
            .hits
            .triggers
            .iter()
            .find(|(_, rect)| contains(*rect, col, row))
            .map(|(i, _)| *i)
            .filter(|&i| i < self.rows.len());
        match trigger {
            Some(i) => {
                self.cx.overlays.pointer_down(Some(self.rows[i].menu.overlay_id()));
                self.set_focus(Some(i), now);
                self.rows[i].menu.toggle(now);
            }
            None => {
                self.cx.overlays.pointer_down(None);
                self.set_focus(None, now);
            }
        }
    }

    pub fn pointer_up(&mut self, col: u16, row: u16, now: Instant) {
        if let Some((i, item)) = self.hit_list(col, row) {
            self.rows[i].menu.pointer_release(item, now);
            self.after_action(now);
        }
    }

    fn hit_list(&self, col: u16, row: u16) -> Option<(usize, Option<usize>)> {
        let (i, area, items) = self.hits.list.as_ref()?;
        if *i >= self.rows.len() || !self.rows[*i].menu.is_open() || !contains(*area, col, row) {
            return None;
        }
        let item = items.iter().position(|r| contains(*r, col, row));
        Some((*i, item))
    }

    pub fn begin_rename(&mut self, id: &str, now: Instant) {
        let name = match self.workspace.borrow().project(id) {
            Ok(p) => p.name.clone(),
            Err(err) => {
                warn!("cannot rename: {err:#}");
                return;
            }
        };
        if let Some(i) = self.rows.iter().position(|r| r.project_id == id) {
            self.set_focus(Some(i), now);
        }
        self.rename = Some(RenameField {
            project_id: id.to_string(),
            value: name,
        });
    }

    pub fn rename_input(&mut self, ch: char) {
        if let Some(field) = &mut self.rename {
            if field.value.chars().count() < MAX_NAME_LEN {
                field.value.push(ch);
            }
        }
    }

    pub fn rename_backspace(&mut self) {
        if let Some(field) = &mut self.rename {
            field.value.pop();
        }
    }

    /// Save the field and close it. A blank name is dropped without a word.
    pub fn commit_rename(&mut self, now: Instant) {
        let Some(field) = self.rename.take() else {
            return;
        };
        if field.value.trim().is_empty() {
            return;
        }
        let result = self.workspace.borrow_mut().rename(&field.project_id, &field.value);
        match result {
            Ok(()) => {
                let event = self.workspace.borrow_mut().last_event.take();
                if let Some(event) = event {
                    self.status_msg = event;
                }
                self.sync_rows(now);
            }
            Err(err) => self.status_msg = format!("Rename failed: {err}"),
        }
    }

    pub fn cancel_rename(&mut self) {
        self.rename = None;
    }

    pub fn request_delete(&mut self, id: &str, now: Instant) {
        if let Err(err) = self.workspace.borrow().project(id) {
            warn!("cannot delete: {err:#}");
            return;
        }
        if let Some(i) = self.rows.iter().position(|r| r.project_id == id) {
            self.set_focus(Some(i), now);
        }
        self.pending_delete = Some(id.to_string());
    }

    /// Name of the project awaiting delete confirmation.
    pub fn pending_delete_name(&self) -> Option<String> {
        let id = self.pending_delete.as_deref()?;
        self.workspace.borrow().project(id).ok().map(|p| p.name.clone())
    }

    pub fn confirm_delete(&mut self, now: Instant) {
        let Some(id) = self.pending_delete.take() else {
            return;
        };
        let result = self.workspace.borrow_mut().delete(&id);
        match result {
            Ok(()) => {
                let event = self.workspace.borrow_mut().last_event.take();
                if let Some(event) = event {
                    self.status_msg = event;
                }
                self.sync_rows(now);
            }
            Err(err) => {
                warn!("delete failed: {err:#}");
                self.status_msg = format!("Delete failed: {err}");
            }
        }
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }
}

/// An `Invoke` item bound to one project.
fn act<F>(ws: &Rc<RefCell<Workspace>>, id: &str, f: F, name: &str) -> MenuItem
where
    F: Fn(&mut Workspace, &str) -> anyhow::Result<()> + 'static,
{
    let ws = Rc::clone(ws);
    let id = id.to_string();
    MenuItem::invoke(name, move || {
        let mut ws = ws.borrow_mut();
        ws.dirty = true;
        f(&mut ws, &id)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> App {
        App::new(Config::default())
    }

    fn visible_names(app: &App, row: usize) -> Vec<String> {
        app.rows[row]
            .menu
            .props()
            .visible_items()
            .iter()
            .map(|i| i.name.clone())
            .collect()
    }

    #[test]
    fn owner_sees_every_item() {
        let app = app();
        assert_eq!(
            visible_names(&app, 0),
            ["Open", "Open in New Tab", "Rename", "Download", "Duplicate", "Add to collection", "Delete"]
        );
    }

    #[test]
    fn non_owner_loses_rename_and_delete() {
        let app = app();
        let names = visible_names(&app, 3);
        assert!(!names.contains(&"Rename".to_string()));
        assert!(!names.contains(&"Delete".to_string()));
        assert!(names.contains(&"Duplicate".to_string()));
    }

    #[test]
    fn signing_out_hides_account_items() {
        let mut app = app();
        app.toggle_auth(Instant::now());
        assert_eq!(visible_names(&app, 0), ["Open", "Open in New Tab", "Download"]);
    }

    #[test]
    fn p5_sketch_urls_use_slugs() {
        let ws = Workspace::sample("alice");
        assert_eq!(sketch_url(&ws.projects[0]), "/alice/sketches/sk0001");
        assert_eq!(sketch_url(&ws.projects[3]), "/p5/sketches/hello_p5");
        assert_eq!(slugify("  Perlin -- Flow!  ", '_'), "perlin_flow");
    }

    #[test]
    fn delete_waits_for_confirmation() {
        let mut app = app();
        let now = Instant::now();
        let before = app.rows.len();
        app.set_focus(Some(0), now);
        app.toggle_focused(now);
        assert_eq!(app.keyboard().attached(), 1);
        assert!(app.route_menu_key(MenuKey::End, now));
        assert!(app.route_menu_key(MenuKey::Enter, now));
        assert_eq!(app.rows.len(), before);
        assert!(!app.any_menu_open());
        assert_eq!(app.keyboard().attached(), 0);
        assert_eq!(app.pending_delete_name().as_deref(), Some("Bouncing Ball"));

        app.confirm_delete(now);
        assert!(app.pending_delete.is_none());
        assert_eq!(app.rows.len(), before - 1);
        assert_eq!(app.overlays().registered(), before - 1);
        assert_eq!(app.focus, Some(0));
        assert!(app.status_msg.starts_with("Deleted"));
    }

    #[test]
    fn cancelled_delete_keeps_the_project() {
        let mut app = app();
        let now = Instant::now();
        app.set_focus(Some(0), now);
        app.toggle_focused(now);
        app.route_menu_key(MenuKey::End, now);
        app.route_menu_key(MenuKey::Enter, now);
        assert!(app.pending_delete.is_some());
        app.cancel_delete();
        app.confirm_delete(now);
        assert_eq!(app.workspace.borrow().projects.len(), 5);
    }

    #[test]
    fn pressing_elsewhere_saves_the_rename() {
        let mut app = app();
        let now = Instant::now();
        let id = app.rows[0].project_id.clone();
        app.begin_rename(&id, now);
        app.rename_input('X');
        app.pointer_down(0, 0, now);
        assert!(app.rename.is_none());
        assert_eq!(app.workspace.borrow().projects[0].name, "Bouncing BallX");
    }

    #[test]
    fn blank_rename_is_dropped_quietly() {
        let mut app = app();
        let now = Instant::now();
        let id = app.rows[0].project_id.clone();
        app.begin_rename(&id, now);
        for _ in 0.."Bouncing Ball".len() {
            app.rename_backspace();
        }
        app.rename_input(' ');
        app.pointer_down(0, 0, now);
        assert!(app.rename.is_none());
        assert!(app.status_msg.is_empty());
        assert_eq!(app.workspace.borrow().projects[0].name, "Bouncing Ball");
    }

    #[test]
    fn idle_ticks_do_not_rebuild_rows() {
        let mut app = app();
        let t0 = Instant::now();
        let revision = app.revision;
        for n in 0..10 {
            app.tick(t0 + std::time::Duration::from_millis(50 * n));
        }
        assert_eq!(app.revision, revision);

        app.set_focus(Some(0), t0);
        app.toggle_focused(t0);
        for key in [MenuKey::Down, MenuKey::Down, MenuKey::Down, MenuKey::Down, MenuKey::Enter] {
            app.route_menu_key(key, t0);
        }
        assert_eq!(app.workspace.borrow().downloads.len(), 1);
        assert_eq!(app.revision, revision + 1);
        app.tick(t0);
        assert_eq!(app.revision, revision + 1);
    }

    #[test]
    fn rename_flow() {
        let mut app = app();
        let now = Instant::now();
        app.set_focus(Some(1), now);
        app.toggle_focused(now);
        for key in [MenuKey::Down, MenuKey::Down, MenuKey::Down, MenuKey::Enter] {
            app.route_menu_key(key, now);
        }
        let field = app.rename.clone().unwrap();
        assert_eq!(field.value, "Perlin Flow Field");
        for _ in 0.."Field".len() {
            app.rename_backspace();
        }
        app.rename_input('!');
        app.commit_rename(now);
        assert_eq!(app.workspace.borrow().projects[1].name, "Perlin Flow !");
        assert!(app.rename.is_none());
    }

    #[test]
    fn failing_action_leaves_menu_closed() {
        let mut app = app();
        let now = Instant::now();
        let id = app.rows[0].project_id.clone();
        app.workspace.borrow_mut().add_to_collection(&id).unwrap();
        app.set_focus(Some(0), now);
        app.toggle_focused(now);
        for key in [MenuKey::End, MenuKey::Up, MenuKey::Enter] {
            app.route_menu_key(key, now);
        }
        assert!(!app.any_menu_open());
        assert_eq!(app.workspace.borrow().collection.len(), 1);
    }

    #[test]
    fn open_link_records_a_visit() {
        let mut app = app();
        let now = Instant::now();
        app.set_focus(Some(3), now);
        app.toggle_focused(now);
        app.route_menu_key(MenuKey::Down, now);
        app.route_menu_key(MenuKey::Enter, now);
        assert_eq!(app.location(), "/p5/sketches/hello_p5");
    }

    #[test]
    fn tabbing_away_closes_after_grace() {
        let mut app = app();
        let t0 = Instant::now();
        app.set_focus(Some(0), t0);
        app.toggle_focused(t0);
        app.focus_next(t0);
        app.tick(t0 + std::time::Duration::from_millis(50));
        assert!(app.rows[0].menu.is_open());
        app.tick(t0 + app.config.grace);
        assert!(!app.rows[0].menu.is_open());
    }

    #[test]
    fn opening_a_second_menu_closes_the_first() {
        let mut app = app();
        let now = Instant::now();
        app.set_focus(Some(0), now);
        app.toggle_focused(now);
        app.set_focus(Some(1), now);
        app.toggle_focused(now);
        app.tick(now);
        assert!(!app.rows[0].menu.is_open());
        assert!(app.rows[1].menu.is_open());
        assert_eq!(app.keyboard().attached(), 1);
    }

    #[test]
    fn pointer_release_in_list_activates_item() {
        let mut app = app();
        let now = Instant::now();
        app.hits.triggers = vec![(0, Rect::new(70, 2, 3, 1))];
        app.pointer_down(71, 2, now);
        assert!(app.rows[0].menu.is_open());
        let items: Vec<Rect> = (0..7).map(|i| Rect::new(50, 3 + i, 20, 1)).collect();
        app.hits.list = Some((0, Rect::new(50, 3, 20, 7), items));
        app.pointer_down(55, 6, now);
        assert!(app.rows[0].menu.is_open());
        app.pointer_up(55, 6, now);
        assert!(!app.rows[0].menu.is_open());
        assert_eq!(app.workspace.borrow().downloads.len(), 1);
    }

    #[test]
    fn duplicate_refuses_overlong_names() {
        let mut ws = Workspace::sample("alice");
        let id = ws.projects[0].id.clone();
        ws.rename(&id, &"x".repeat(MAX_NAME_LEN)).unwrap();
        assert!(ws.duplicate(&id, "alice").is_err());
        assert!(ws.rename(&id, "   ").is_err());
    }
}
