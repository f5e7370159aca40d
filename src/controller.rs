use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::coordinator::{OverlayCoordinator, OverlayHandle, OverlayId};
use crate::dismiss::{DismissTimers, Fired};
use crate::error::MenuError;
use crate::listener::{KeyListenerGuard, KeyboardHub};
use crate::machine::{CloseCause, Effect, MenuEvent, MenuKey, MenuState, transition};
use crate::menu::{Callback, ItemAction, MenuItem, MenuProps, RenderedItem, rendered_items};

/// Follows `Navigate` items. A terminal has no default link activation, so
/// the host decides what "going to" an href means.
pub trait Navigator {
    fn navigate(&self, href: &str, target: Option<&str>);
}

impl<F: Fn(&str, Option<&str>)> Navigator for F {
    fn navigate(&self, href: &str, target: Option<&str>) {
        self(href, target)
    }
}

/// Shared handles every menu on a page is wired to.
#[derive(Clone)]
pub struct MenuContext {
    pub keyboard: KeyboardHub,
    pub overlays: OverlayCoordinator,
    pub navigator: Rc<dyn Navigator>,
    pub grace: Duration,
}

pub struct MenuController {
    props: MenuProps,
    state: MenuState,
    timers: DismissTimers,
    keyboard: KeyboardHub,
    listener: Option<KeyListenerGuard>,
    overlay: OverlayHandle,
    navigator: Rc<dyn Navigator>,
    pending_focus: Option<usize>,
    focused: Option<usize>,
    last_close: Option<CloseCause>,
}

impl MenuController {
    pub fn new(props: MenuProps, cx: &MenuContext) -> Self {
        MenuController {
            props,
            state: MenuState::default(),
            timers: DismissTimers::new(cx.grace),
            keyboard: cx.keyboard.clone(),
            listener: None,
            overlay: cx.overlays.register(),
            navigator: Rc::clone(&cx.navigator),
            pending_focus: None,
            focused: None,
            last_close: None,
        }
    }

    pub fn props(&self) -> &MenuProps {
        &self.props
    }

    pub fn is_open(&self) -> bool {
        self.state.open
    }

    pub fn active(&self) -> Option<usize> {
        self.state.active
    }

    pub fn active_item(&self) -> Option<&MenuItem> {
        self.state.active.and_then(|i| self.props.visible_item(i))
    }

    pub fn overlay_id(&self) -> OverlayId {
        self.overlay.id()
    }

    pub fn is_listening(&self) -> bool {
        self.listener.is_some()
    }

    /// True when this menu is the one that receives captured keys.
    pub fn has_keyboard(&self) -> bool {
        match &self.listener {
            Some(guard) => self.keyboard.top() == Some(guard.id()),
            None => false,
        }
    }

    pub fn last_close(&self) -> Option<CloseCause> {
        self.last_close
    }

    pub fn rendered_items(&self) -> Vec<RenderedItem> {
        if !self.state.open {
            return Vec::new();
        }
        rendered_items(&self.props, self.state.active)
    }

    /// Replace the caller's item list (visibility recomputed by the caller).
    pub fn set_items(&mut self, items: Vec<MenuItem>, now: Instant) -> Result<(), MenuError> {
        self.props.set_items(items)?;
        self.dispatch(MenuEvent::ItemsChanged, now);
        if self.pending_focus.is_some_and(|i| Some(i) != self.state.active) {
            self.pending_focus = self.state.active;
        }
        if self.focused.is_some_and(|i| Some(i) != self.state.active) {
            self.focused = self.state.active;
        }
        Ok(())
    }

    pub fn toggle(&mut self, now: Instant) {
        self.dispatch(MenuEvent::Toggle, now);
    }

    pub fn focus_in(&mut self, now: Instant) {
        self.dispatch(MenuEvent::FocusIn, now);
    }

    pub fn focus_out(&mut self, now: Instant) {
        self.dispatch(MenuEvent::FocusOut, now);
    }

    /// Captured key from the keyboard hub. Returns whether it was consumed.
    pub fn key(&mut self, key: MenuKey, now: Instant) -> bool {
        if !self.is_listening() {
            return false;
        }
        self.dispatch(MenuEvent::Key(key), now);
        true
    }

    /// Pointer released inside the open list, optionally over an item.
    /// The release arms the deferred close before the click is handled.
    pub fn pointer_release(&mut self, item: Option<usize>, now: Instant) {
        self.dispatch(MenuEvent::PointerReleased, now);
        if let Some(index) = item {
            self.dispatch(MenuEvent::ItemClicked(index), now);
        }
    }

    /// One turn of the event loop: external close signals and due timers.
    pub fn tick(&mut self, now: Instant) {
        if self.overlay.take_close_request() {
            self.dispatch(MenuEvent::ExternalClose, now);
        }
        for fired in self.timers.poll(now) {
            let event = match fired {
                Fired::GraceElapsed => MenuEvent::GraceElapsed,
                Fired::ReleaseTick => MenuEvent::ReleaseTick,
            };
            self.dispatch(event, now);
        }
    }

    /// Called once per drawn frame, after the list (and its highlight) has
    /// been drawn: focus requested by the last navigation lands here, so the
    /// cursor follows the highlight within the same frame.
    pub fn focus_for_frame(&mut self) -> Option<usize> {
        if let Some(index) = self.pending_focus.take() {
            self.focused = Some(index);
        }
        self.focused
    }

    pub fn dispatch(&mut self, event: MenuEvent, now: Instant) {
        let (next, effects) = transition(self.state, event, self.props.visible_len());
        if next != self.state {
            debug!(
                menu = self.props.aria_label(),
                ?event,
                open = next.open,
                active = ?next.active,
                "menu transition"
            );
        }
        self.state = next;
        for effect in effects {
            self.apply(effect, now);
        }
    }

    fn apply(&mut self, effect: Effect, now: Instant) {
        match effect {
            Effect::AttachKeyListener => {
                if self.listener.is_none() {
                    self.listener = Some(self.keyboard.listen());
                }
            }
            Effect::DetachKeyListener => self.listener = None,
            Effect::AnnounceOpen => {
                self.pending_focus = None;
                self.focused = None;
                self.overlay.announce_open();
            }
            Effect::FocusItem(index) => self.pending_focus = Some(index),
            Effect::Activate(index) => self.activate(index),
            Effect::StartGraceTimer => {
                self.timers.start_grace(now);
            }
            Effect::CancelGraceTimer => {
                self.timers.cancel_grace();
            }
            Effect::ScheduleReleaseClose => self.timers.schedule_release(),
            Effect::Closed(cause) => {
                self.pending_focus = None;
                self.focused = None;
                self.last_close = Some(cause);
                debug!(menu = self.props.aria_label(), ?cause, "menu closed");
            }
        }
    }

    fn activate(&self, index: usize) {
        let Some(item) = self.props.visible_item(index) else {
            warn!(index, "activation of missing menu item");
            return;
        };
        match &item.action {
            ItemAction::Navigate { href, target } => {
                info!(item = %item.name, href = %href, "following menu link");
                self.navigator.navigate(href, target.as_deref());
            }
            ItemAction::Invoke(callback) => run_action(&item.name, callback),
        }
    }
}

/// Run an item callback. Failures (returned or panicked) are logged and
/// never reach the caller.
fn run_action(name: &str, callback: &Callback) {
    info!(item = %name, "running menu action");
    match panic::catch_unwind(AssertUnwindSafe(|| (**callback)())) {
        Ok(Ok(())) => {}
        Ok(Err(err)) => error!(item = %name, "menu action failed: {err:#}"),
        Err(payload) => {
            error!(item = %name, "menu action panicked: {}", panic_message(&*payload));
        }
    }
}

pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    type Visits = Rc<RefCell<Vec<(String, Option<String>)>>>;

    fn context() -> (MenuContext, Visits) {
        let visits: Visits = Rc::default();
        let log = Rc::clone(&visits);
        let cx = MenuContext {
            keyboard: KeyboardHub::new(),
            overlays: OverlayCoordinator::new(),
            navigator: Rc::new(move |href: &str, target: Option<&str>| {
                log.borrow_mut().push((href.to_string(), target.map(str::to_string)));
            }),
            grace: Duration::from_millis(200),
        };
        (cx, visits)
    }

    fn counter(name: &str, hits: &Rc<Cell<u32>>) -> MenuItem {
        let hits = Rc::clone(hits);
        MenuItem::invoke(name, move || {
            hits.set(hits.get() + 1);
            Ok(())
        })
    }

    /// Rename, Download, and a hidden Delete.
    fn sketch_menu(cx: &MenuContext, hits: &Rc<Cell<u32>>) -> MenuController {
        let items = vec![
            counter("Rename", hits),
            counter("Download", hits),
            counter("Delete", hits).hide_if(true),
        ];
        MenuController::new(MenuProps::new(items, "Toggle sketch menu").unwrap(), cx)
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn arrow_down_skips_hidden_items() {
        let (cx, _) = context();
        let hits = Rc::new(Cell::new(0));
        let mut menu = sketch_menu(&cx, &hits);
        let t0 = Instant::now();
        menu.toggle(t0);
        assert_eq!(menu.active(), None);
        menu.key(MenuKey::Down, t0);
        assert_eq!(menu.active_item().unwrap().name, "Rename");
        menu.key(MenuKey::Down, t0);
        assert_eq!(menu.active_item().unwrap().name, "Download");
        menu.key(MenuKey::Down, t0);
        assert_eq!(menu.active(), Some(1));
    }

    #[test]
    fn end_lands_on_last_visible() {
        let (cx, _) = context();
        let hits = Rc::new(Cell::new(0));
        let mut menu = sketch_menu(&cx, &hits);
        let t0 = Instant::now();
        menu.toggle(t0);
        menu.key(MenuKey::End, t0);
        assert_eq!(menu.active(), Some(1));
        assert_eq!(menu.active_item().unwrap().name, "Download");
    }

    #[test]
    fn focus_returning_within_grace_keeps_menu_open() {
        let (cx, _) = context();
        let hits = Rc::new(Cell::new(0));
        let mut menu = sketch_menu(&cx, &hits);
        let t0 = Instant::now();
        menu.focus_in(t0);
        menu.toggle(t0);
        menu.focus_out(t0);
        menu.focus_in(t0 + ms(100));
        menu.tick(t0 + ms(100));
        menu.tick(t0 + ms(300));
        assert!(menu.is_open());
    }

    #[test]
    fn focus_gone_past_grace_closes() {
        let (cx, _) = context();
        let hits = Rc::new(Cell::new(0));
        let mut menu = sketch_menu(&cx, &hits);
        let t0 = Instant::now();
        menu.focus_in(t0);
        menu.toggle(t0);
        menu.key(MenuKey::Down, t0);
        menu.focus_out(t0);
        menu.tick(t0 + ms(150));
        assert!(menu.is_open());
        menu.tick(t0 + ms(200));
        assert!(!menu.is_open());
        assert_eq!(menu.active(), None);
        assert_eq!(menu.last_close(), Some(CloseCause::FocusLost));
        assert!(!menu.is_listening());
    }

    #[test]
    fn pointer_release_on_invoke_item_runs_once_then_closes() {
        let (cx, _) = context();
        let hits = Rc::new(Cell::new(0));
        let mut menu = sketch_menu(&cx, &hits);
        let t0 = Instant::now();
        menu.toggle(t0);
        menu.pointer_release(Some(1), t0);
        assert_eq!(hits.get(), 1);
        assert!(!menu.is_open());
        menu.tick(t0);
        assert_eq!(hits.get(), 1);
        assert!(!menu.is_open());
    }

    #[test]
    fn pointer_release_between_items_closes_next_tick() {
        let (cx, _) = context();
        let hits = Rc::new(Cell::new(0));
        let mut menu = sketch_menu(&cx, &hits);
        let t0 = Instant::now();
        menu.toggle(t0);
        menu.pointer_release(None, t0);
        assert!(menu.is_open());
        menu.tick(t0);
        assert!(!menu.is_open());
        assert_eq!(menu.last_close(), Some(CloseCause::PointerRelease));
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn failing_action_is_swallowed_and_menu_closes() {
        let (cx, _) = context();
        let items = vec![
            MenuItem::invoke("Duplicate", || anyhow::bail!("name too long")),
            MenuItem::invoke("Explode", || panic!("boom")),
        ];
        let mut menu = MenuController::new(MenuProps::new(items, "Toggle").unwrap(), &cx);
        let t0 = Instant::now();
        for key in [MenuKey::Home, MenuKey::End] {
            menu.toggle(t0);
            menu.key(key, t0);
            menu.key(MenuKey::Enter, t0);
            assert!(!menu.is_open());
            assert_eq!(menu.active(), None);
            assert_eq!(menu.last_close(), Some(CloseCause::Activated));
        }
        assert_eq!(cx.keyboard.attached(), 0);
    }

    #[test]
    fn panic_payloads_are_readable() {
        let result: std::thread::Result<()> = panic::catch_unwind(|| panic!("boom"));
        let payload = result.unwrap_err();
        assert_eq!(panic_message(&*payload), "boom");
        let name = "Rename";
        let result: std::thread::Result<()> = panic::catch_unwind(|| panic!("{name} exploded"));
        let payload = result.unwrap_err();
        assert_eq!(panic_message(&*payload), "Rename exploded");
        assert_eq!(panic_message(&42u8), "unknown panic");
    }

    #[test]
    fn enter_on_link_navigates_and_closes() {
        let (cx, visits) = context();
        let items = vec![
            MenuItem::link("Open", "/p5/sketches/abc"),
            MenuItem::link("Open in new tab", "/p5/sketches/abc").with_target("_blank"),
        ];
        let mut menu = MenuController::new(MenuProps::new(items, "Toggle").unwrap(), &cx);
        let t0 = Instant::now();
        menu.toggle(t0);
        menu.key(MenuKey::Up, t0);
        menu.key(MenuKey::Space, t0);
        assert!(!menu.is_open());
        assert_eq!(
            visits.borrow().as_slice(),
            &[("/p5/sketches/abc".to_string(), Some("_blank".to_string()))]
        );
    }

    #[test]
    fn listener_tracks_open_state_across_cycles() {
        let (cx, _) = context();
        let hits = Rc::new(Cell::new(0));
        let mut menu = sketch_menu(&cx, &hits);
        let t0 = Instant::now();
        for _ in 0..5 {
            menu.toggle(t0);
            assert_eq!(cx.keyboard.attached(), 1);
            assert!(menu.has_keyboard());
            menu.key(MenuKey::Escape, t0);
            assert_eq!(cx.keyboard.attached(), 0);
        }
        assert!(!menu.key(MenuKey::Down, t0));
    }

    #[test]
    fn dropping_an_open_menu_releases_listener_and_registration() {
        let (cx, _) = context();
        let hits = Rc::new(Cell::new(0));
        let mut menu = sketch_menu(&cx, &hits);
        menu.toggle(Instant::now());
        assert_eq!(cx.keyboard.attached(), 1);
        drop(menu);
        assert_eq!(cx.keyboard.attached(), 0);
        assert_eq!(cx.overlays.registered(), 0);
    }

    #[test]
    fn opening_another_menu_closes_this_one() {
        let (cx, _) = context();
        let hits = Rc::new(Cell::new(0));
        let mut a = sketch_menu(&cx, &hits);
        let mut b = sketch_menu(&cx, &hits);
        let t0 = Instant::now();
        a.toggle(t0);
        b.toggle(t0);
        a.tick(t0);
        b.tick(t0);
        assert!(!a.is_open());
        assert_eq!(a.last_close(), Some(CloseCause::External));
        assert!(b.is_open());
        assert!(b.has_keyboard());
    }

    #[test]
    fn press_outside_closes() {
        let (cx, _) = context();
        let hits = Rc::new(Cell::new(0));
        let mut menu = sketch_menu(&cx, &hits);
        let t0 = Instant::now();
        menu.toggle(t0);
        cx.overlays.pointer_down(Some(menu.overlay_id()));
        menu.tick(t0);
        assert!(menu.is_open());
        cx.overlays.pointer_down(None);
        menu.tick(t0);
        assert!(!menu.is_open());
    }

    #[test]
    fn focus_follows_highlight_when_the_frame_is_drawn() {
        let (cx, _) = context();
        let hits = Rc::new(Cell::new(0));
        let mut menu = sketch_menu(&cx, &hits);
        let t0 = Instant::now();
        menu.toggle(t0);
        assert_eq!(menu.focus_for_frame(), None);
        menu.key(MenuKey::Down, t0);
        // Highlight is already in the drawn items; the cursor lands once the
        // frame asks for it.
        assert!(menu.rendered_items()[0].selected);
        assert_eq!(menu.focus_for_frame(), Some(0));
        assert_eq!(menu.focus_for_frame(), Some(0));
        menu.key(MenuKey::Escape, t0);
        assert_eq!(menu.focus_for_frame(), None);
        assert!(menu.rendered_items().is_empty());
    }

    #[test]
    fn shrinking_items_while_open_clamps_active() {
        let (cx, _) = context();
        let hits = Rc::new(Cell::new(0));
        let mut menu = sketch_menu(&cx, &hits);
        let t0 = Instant::now();
        menu.toggle(t0);
        menu.key(MenuKey::End, t0);
        let items = vec![counter("Rename", &hits), counter("Download", &hits).hide_if(true)];
        menu.set_items(items, t0).unwrap();
        assert_eq!(menu.active(), Some(0));
        assert_eq!(menu.focus_for_frame(), Some(0));
        assert!(menu.set_items(vec![], t0).is_err());
    }
}
