use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use tracing::debug;

pub type OverlayId = u64;

#[derive(Debug, Default)]
struct Inner {
    next_id: OverlayId,
    /// Registered overlays and whether a close has been requested.
    overlays: BTreeMap<OverlayId, bool>,
}

/// Keeps at most one overlay open: anything registered here gets asked to
/// close when another one opens or when a press lands outside it.
#[derive(Clone, Debug, Default)]
pub struct OverlayCoordinator {
    inner: Rc<RefCell<Inner>>,
}

impl OverlayCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self) -> OverlayHandle {
        let mut inner = self.inner.borrow_mut();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.overlays.insert(id, false);
        OverlayHandle {
            id,
            inner: Rc::clone(&self.inner),
        }
    }

    /// A pointer press landed on `hit` (or on no overlay at all).
    pub fn pointer_down(&self, hit: Option<OverlayId>) {
        self.request_all_except(hit);
    }

    pub fn dismiss_all(&self) {
        self.request_all_except(None);
    }

    pub fn registered(&self) -> usize {
        self.inner.borrow().overlays.len()
    }

    fn request_all_except(&self, keep: Option<OverlayId>) {
        let mut inner = self.inner.borrow_mut();
        for (id, requested) in inner.overlays.iter_mut() {
            if Some(*id) != keep {
                *requested = true;
            }
        }
    }
}

#[derive(Debug)]
pub struct OverlayHandle {
    id: OverlayId,
    inner: Rc<RefCell<Inner>>,
}

impl OverlayHandle {
    pub fn id(&self) -> OverlayId {
        self.id
    }

    /// This overlay just opened; every other one should close.
    pub fn announce_open(&self) {
        let mut inner = self.inner.borrow_mut();
        // A stale request from before the open must not close us right away.
        if let Some(requested) = inner.overlays.get_mut(&self.id) {
            *requested = false;
        }
        for (id, requested) in inner.overlays.iter_mut() {
            if *id != self.id {
                *requested = true;
            }
        }
        debug!(overlay = self.id, "overlay opened");
    }

    pub fn take_close_request(&self) -> bool {
        let mut inner = self.inner.borrow_mut();
        match inner.overlays.get_mut(&self.id) {
            Some(requested) => std::mem::take(requested),
            None => false,
        }
    }
}

impl Drop for OverlayHandle {
    fn drop(&mut self) {
        self.inner.borrow_mut().overlays.remove(&self.id);
    }
}
