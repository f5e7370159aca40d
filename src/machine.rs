//! Pure interaction state machine for a popup menu.
//!
//! `transition` takes the current state, one input event and the number of
//! visible items, and returns the next state plus the side effects the
//! controller has to carry out. Nothing here touches timers, listeners or
//! item callbacks.

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MenuKey {
    Up,
    Down,
    Home,
    End,
    Enter,
    Space,
    Escape,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CloseCause {
    Toggle,
    Escape,
    Activated,
    PointerRelease,
    FocusLost,
    External,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MenuEvent {
    Toggle,
    Key(MenuKey),
    /// Pointer click on the item at this visible index.
    ItemClicked(usize),
    /// Pointer released anywhere inside the open list.
    PointerReleased,
    FocusIn,
    FocusOut,
    GraceElapsed,
    ReleaseTick,
    ExternalClose,
    /// The visible item count changed underneath an open menu.
    ItemsChanged,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Effect {
    AttachKeyListener,
    DetachKeyListener,
    AnnounceOpen,
    /// Move input focus to this visible item on the next frame.
    FocusItem(usize),
    /// Run the action of this visible item.
    Activate(usize),
    StartGraceTimer,
    CancelGraceTimer,
    ScheduleReleaseClose,
    Closed(CloseCause),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct MenuState {
    pub open: bool,
    pub active: Option<usize>,
    pub focus_held: bool,
}

impl MenuState {
    fn closed(self) -> Self {
        MenuState {
            open: false,
            active: None,
            focus_held: self.focus_held,
        }
    }
}

pub fn transition(state: MenuState, event: MenuEvent, visible_len: usize) -> (MenuState, Vec<Effect>) {
    let mut effects = Vec::new();
    let next = step(state, event, visible_len, &mut effects);
    debug_assert!(next.open || next.active.is_none());
    debug_assert!(next.active.is_none_or(|i| i < visible_len));
    (next, effects)
}

fn step(state: MenuState, event: MenuEvent, len: usize, fx: &mut Vec<Effect>) -> MenuState {
    match event {
        MenuEvent::Toggle if state.open => close(state, CloseCause::Toggle, fx),
        MenuEvent::Toggle => {
            fx.push(Effect::AttachKeyListener);
            fx.push(Effect::AnnounceOpen);
            MenuState {
                open: true,
                active: None,
                focus_held: state.focus_held,
            }
        }
        MenuEvent::FocusIn => {
            fx.push(Effect::CancelGraceTimer);
            MenuState { focus_held: true, ..state }
        }
        MenuEvent::FocusOut => {
            if state.open {
                fx.push(Effect::StartGraceTimer);
            }
            MenuState { focus_held: false, ..state }
        }
        MenuEvent::GraceElapsed if state.focus_held => state,
        MenuEvent::GraceElapsed => close(state, CloseCause::FocusLost, fx),
        MenuEvent::ReleaseTick => close(state, CloseCause::PointerRelease, fx),
        MenuEvent::ExternalClose => close(state, CloseCause::External, fx),
        _ if !state.open => state,
        MenuEvent::PointerReleased => {
            fx.push(Effect::ScheduleReleaseClose);
            state
        }
        MenuEvent::ItemClicked(i) if i < len => {
            fx.push(Effect::Activate(i));
            close(state, CloseCause::Activated, fx)
        }
        MenuEvent::ItemClicked(_) => state,
        MenuEvent::ItemsChanged => {
            let active = match state.active {
                Some(_) if len == 0 => None,
                Some(i) => Some(i.min(len - 1)),
                None => None,
            };
            MenuState { active, ..state }
        }
        MenuEvent::Key(key) => on_key(state, key, len, fx),
    }
}

fn on_key(state: MenuState, key: MenuKey, len: usize, fx: &mut Vec<Effect>) -> MenuState {
    if key == MenuKey::Escape {
        return close(state, CloseCause::Escape, fx);
    }
    if len == 0 {
        return state;
    }
    let max = len - 1;
    let target = match (key, state.active) {
        (MenuKey::Down, None) => Some(0),
        (MenuKey::Down, Some(i)) if i < max => Some(i + 1),
        (MenuKey::Up, None) => Some(max),
        (MenuKey::Up, Some(i)) if i > 0 => Some(i - 1),
        (MenuKey::Home, _) => Some(0),
        (MenuKey::End, _) => Some(max),
        (MenuKey::Enter | MenuKey::Space, Some(i)) => {
            fx.push(Effect::Activate(i));
            return close(state, CloseCause::Activated, fx);
        }
        _ => None,
    };
    match target {
        Some(i) => {
            fx.push(Effect::FocusItem(i));
            MenuState { active: Some(i), ..state }
        }
        None => state,
    }
}

fn close(state: MenuState, cause: CloseCause, fx: &mut Vec<Effect>) -> MenuState {
    if !state.open {
        return state;
    }
    fx.push(Effect::CancelGraceTimer);
    fx.push(Effect::DetachKeyListener);
    fx.push(Effect::Closed(cause));
    state.closed()
}
