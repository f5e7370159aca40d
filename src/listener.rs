use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

pub type ListenerId = u64;

#[derive(Debug, Default)]
struct HubInner {
    next_id: ListenerId,
    attached: Vec<ListenerId>,
}

/// Capture-phase keyboard subscriptions. Whoever subscribed last sees keys
/// first; a subscription lives exactly as long as its guard.
#[derive(Clone, Debug, Default)]
pub struct KeyboardHub {
    inner: Rc<RefCell<HubInner>>,
}

impl KeyboardHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listen(&self) -> KeyListenerGuard {
        let mut inner = self.inner.borrow_mut();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.attached.push(id);
        debug!(listener = id, total = inner.attached.len(), "key listener attached");
        KeyListenerGuard {
            id,
            hub: Rc::clone(&self.inner),
        }
    }

    pub fn attached(&self) -> usize {
        self.inner.borrow().attached.len()
    }

    /// The subscriber that receives captured keys.
    pub fn top(&self) -> Option<ListenerId> {
        self.inner.borrow().attached.last().copied()
    }
}

#[derive(Debug)]
pub struct KeyListenerGuard {
    id: ListenerId,
    hub: Rc<RefCell<HubInner>>,
}

impl KeyListenerGuard {
    pub fn id(&self) -> ListenerId {
        self.id
    }
}

impl Drop for KeyListenerGuard {
    fn drop(&mut self) {
        let mut inner = self.hub.borrow_mut();
        inner.attached.retain(|&id| id != self.id);
        debug!(listener = self.id, total = inner.attached.len(), "key listener detached");
    }
}
