//! Components: named units of message-driven behavior owned by a hub.

use std::sync::{Arc, OnceLock};
use std::thread::{self, ThreadId};

use crate::app::AppSender;
use crate::message::Message;

/// A unit of behavior scheduled on exactly one hub.
///
/// All methods taking a [`HubContext`] execute on the owning hub's thread
/// only (hub-affinity invariant): the context cannot be constructed
/// anywhere else, so marshaling is a property of the types rather than a
/// runtime check on every call.
pub trait Component: Send {
    /// Unique name within the app.
    fn name(&self) -> &str;

    /// Tag of the hub this component must be scheduled on.
    fn hub_tag(&self) -> &'static str;

    /// Called once after registration, in hub context.
    fn activate(&mut self, _ctx: &mut HubContext<'_>) {}

    /// Deliver a message. Must not block: the hub's delivery pass is shared
    /// with every other component on the hub.
    fn receive(&mut self, _msg: &Message, _ctx: &mut HubContext<'_>) {}

    /// Release resources before deregistration, in hub context.
    fn cleanup(&mut self, _ctx: &mut HubContext<'_>) {}
}

/// Execution-context identity of a hub, for hub-affinity assertions.
///
/// The hub publishes its thread id when its context comes up; [`check`]
/// panics when called from any other thread. Calling a hub-affine
/// operation from the wrong context is a programming error, not a runtime
/// condition to recover from.
///
/// [`check`]: Affinity::check
#[derive(Clone)]
pub struct Affinity {
    tag: &'static str,
    thread: Arc<OnceLock<ThreadId>>,
}

impl Affinity {
    /// Create an unbound identity. For hub implementations; the hub binds
    /// it once its execution context exists.
    pub fn new(tag: &'static str) -> Self {
        Self {
            tag,
            thread: Arc::new(OnceLock::new()),
        }
    }

    /// Record the current thread as the hub's context. First call wins.
    pub fn bind_current(&self) {
        let _ = self.thread.set(thread::current().id());
    }

    pub fn tag(&self) -> &'static str {
        self.tag
    }

    /// True when the calling thread is the hub's context.
    pub fn is_current(&self) -> bool {
        self.thread.get().copied() == Some(thread::current().id())
    }

    /// Panic unless called from the hub's context.
    pub fn check(&self) {
        if !self.is_current() {
            panic!(
                "hub-affine operation for hub {:?} invoked outside its context",
                self.tag
            );
        }
    }
}

/// Per-dispatch context handed to hub-affine component methods.
pub struct HubContext<'a> {
    component: &'a str,
    app: &'a AppSender,
    affinity: &'a Affinity,
}

impl<'a> HubContext<'a> {
    pub(crate) fn new(component: &'a str, app: &'a AppSender, affinity: &'a Affinity) -> Self {
        Self {
            component,
            app,
            affinity,
        }
    }

    /// Name of the component currently being dispatched.
    pub fn component(&self) -> &str {
        self.component
    }

    /// Identity of the owning hub's execution context.
    pub fn affinity(&self) -> &Affinity {
        self.affinity
    }

    /// Send a message to the app for fan-out to every hub.
    ///
    /// Fills `src` with the current component and stamps `ts` if unset.
    /// The message becomes visible to every hub's dispatch pass, in the
    /// app's total order.
    pub fn send(&mut self, mut msg: Message) {
        debug_assert!(self.affinity.is_current());
        msg.src = Some(self.component.to_owned());
        if msg.ts.is_none() {
            msg.ts = Some(Message::now());
        }
        self.app.send(msg);
    }
}
