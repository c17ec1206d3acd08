//! Hubs: execution-context owners for groups of components.
//!
//! A hub is the only path by which code may safely call into a component.
//! [`ThreadHub`] runs a dedicated OS thread draining a command channel;
//! every cross-thread entry point marshals through that channel, so
//! component code always executes hub-affine.

use std::panic::{self, AssertUnwindSafe};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, error, warn};

use crate::app::AppSender;
use crate::component::{Affinity, Component, HubContext};
use crate::error::{Error, Result};
use crate::message::{Message, MessageKind};

/// App-facing surface of a hub: thread-safe delivery and lifecycle.
///
/// The app fans every message out through this trait; each implementation
/// marshals the delivery pass into its own execution context.
pub trait HubPort: Send {
    fn tag(&self) -> &'static str;

    /// Deliver a message to the hub's components. Thread-safe; the actual
    /// dispatch happens inside the hub's context.
    fn deliver(&self, msg: Message);

    /// Register a message component, if this hub kind hosts them.
    fn add_component(&self, component: Box<dyn Component>) -> Result<()>;

    /// Wait for the hub's execution context to finish. Best-effort.
    fn join(&mut self);
}

enum HubCommand {
    Deliver(Message),
    Add(Box<dyn Component>),
    Remove(String),
    Run(Box<dyn FnOnce() + Send>),
}

/// A hub backed by a dedicated OS thread.
///
/// Covers both the cooperative event-loop hubs and the blocking-integration
/// hubs of the runtime: in either case the context is a thread serializing
/// commands from a queue.
pub struct ThreadHub {
    tag: &'static str,
    tx: Sender<HubCommand>,
    affinity: Affinity,
    join: Option<JoinHandle<()>>,
}

impl ThreadHub {
    /// Spawn the hub thread and return the hub.
    pub fn spawn(tag: &'static str, app: AppSender) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        let affinity = Affinity::new(tag);
        let thread_affinity = affinity.clone();
        let join = std::thread::Builder::new()
            .name(tag.to_owned())
            .spawn(move || hub_main(tag, rx, app, thread_affinity))
            .expect("failed to spawn hub thread");

        Self {
            tag,
            tx,
            affinity,
            join: Some(join),
        }
    }

    /// Cloneable handle for component registration and marshaling.
    pub fn handle(&self) -> HubHandle {
        HubHandle {
            tag: self.tag,
            tx: self.tx.clone(),
            affinity: self.affinity.clone(),
        }
    }
}

impl HubPort for ThreadHub {
    fn tag(&self) -> &'static str {
        self.tag
    }

    fn deliver(&self, msg: Message) {
        let _ = self.tx.send(HubCommand::Deliver(msg));
    }

    fn add_component(&self, component: Box<dyn Component>) -> Result<()> {
        self.handle().add_component(component);
        Ok(())
    }

    fn join(&mut self) {
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                error!(hub = self.tag, "hub thread panicked");
            }
        }
    }
}

/// Cloneable handle to a [`ThreadHub`].
#[derive(Clone)]
pub struct HubHandle {
    tag: &'static str,
    tx: Sender<HubCommand>,
    affinity: Affinity,
}

impl HubHandle {
    pub fn tag(&self) -> &'static str {
        self.tag
    }

    /// Identity of the hub's execution context.
    pub fn affinity(&self) -> &Affinity {
        &self.affinity
    }

    /// Register a component. Idempotent: a duplicate name is ignored.
    ///
    /// Registration order determines delivery order for broadcasts. After
    /// successful registration the hub broadcasts [`MessageKind::NewComponent`]
    /// through the app.
    pub fn add_component(&self, component: Box<dyn Component>) {
        let _ = self.tx.send(HubCommand::Add(component));
    }

    /// Deregister a component. Its cleanup hook runs hub-affine first.
    /// Removing an unknown name is a no-op.
    pub fn remove_component(&self, name: impl Into<String>) {
        let _ = self.tx.send(HubCommand::Remove(name.into()));
    }

    /// Run a closure inside the hub's context at the next opportunity.
    pub fn run_in_hub(&self, f: impl FnOnce() + Send + 'static) {
        let _ = self.tx.send(HubCommand::Run(Box::new(f)));
    }

    /// Deliver a message to this hub only, bypassing the app queue.
    pub fn deliver(&self, msg: Message) {
        let _ = self.tx.send(HubCommand::Deliver(msg));
    }

    /// Handle for posting messages straight to one component from any
    /// thread; delivery is marshaled into the hub context.
    pub fn component_handle(&self, name: impl Into<String>) -> ComponentHandle {
        ComponentHandle {
            name: name.into(),
            hub: self.clone(),
        }
    }
}

/// Posts messages to a single component from any thread.
///
/// The cross-thread-call mechanism of the runtime: instead of exposing a
/// component's methods (which are hub-affine), holders of a handle post
/// messages which the owning hub delivers in its own context.
#[derive(Clone)]
pub struct ComponentHandle {
    name: String,
    hub: HubHandle,
}

impl ComponentHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Post a message addressed to this component.
    pub fn post(&self, mut msg: Message) {
        msg.dst = Some(self.name.clone());
        self.hub.deliver(msg);
    }
}

fn hub_main(tag: &'static str, rx: Receiver<HubCommand>, app: AppSender, affinity: Affinity) {
    affinity.bind_current();
    let mut components: Vec<Box<dyn Component>> = Vec::new();

    while let Ok(cmd) = rx.recv() {
        match cmd {
            HubCommand::Deliver(msg) => {
                let shutdown = matches!(msg.kind, MessageKind::Shutdown);
                dispatch(tag, &mut components, &msg, &app, &affinity);
                if shutdown {
                    break;
                }
            }
            HubCommand::Add(mut component) => {
                let name = component.name().to_owned();
                if components.iter().any(|c| c.name() == name) {
                    warn!(hub = tag, component = %name, "duplicate component ignored");
                    continue;
                }
                {
                    let mut ctx = HubContext::new(&name, &app, &affinity);
                    component.activate(&mut ctx);
                }
                components.push(component);
                debug!(hub = tag, component = %name, "new component");
                let mut msg = Message::new(MessageKind::NewComponent);
                msg.src = Some(name);
                msg.ts = Some(Message::now());
                app.send(msg);
            }
            HubCommand::Remove(name) => {
                if let Some(pos) = components.iter().position(|c| c.name() == name) {
                    let mut component = components.remove(pos);
                    let mut ctx = HubContext::new(&name, &app, &affinity);
                    component.cleanup(&mut ctx);
                    debug!(hub = tag, component = %name, "removed component");
                }
            }
            HubCommand::Run(f) => f(),
        }
    }

    // Cooperative teardown: run every cleanup hook, then ask the app to
    // forget us. A panicking hook must not stop the rest of the drain.
    for component in &mut components {
        let name = component.name().to_owned();
        let mut ctx = HubContext::new(&name, &app, &affinity);
        if panic::catch_unwind(AssertUnwindSafe(|| component.cleanup(&mut ctx))).is_err() {
            error!(hub = tag, component = %name, "cleanup panicked during shutdown");
        }
    }
    components.clear();
    debug!(hub = tag, "hub shutting down");
    app.remove_hub(tag);
}

fn dispatch(
    tag: &'static str,
    components: &mut [Box<dyn Component>],
    msg: &Message,
    app: &AppSender,
    affinity: &Affinity,
) {
    debug!(
        hub = tag,
        src = msg.src.as_deref().unwrap_or("-"),
        dst = msg.dst.as_deref().unwrap_or("*"),
        name = msg.name(),
        "deliver"
    );
    match &msg.dst {
        None => {
            for component in components.iter_mut() {
                deliver_one(component.as_mut(), msg, app, affinity);
            }
        }
        // Unknown destinations are dropped: tolerates registration races.
        Some(dst) => {
            if let Some(component) = components.iter_mut().find(|c| c.name() == *dst) {
                deliver_one(component.as_mut(), msg, app, affinity);
            }
        }
    }
}

fn deliver_one(
    component: &mut dyn Component,
    msg: &Message,
    app: &AppSender,
    affinity: &Affinity,
) {
    let name = component.name().to_owned();
    let mut ctx = HubContext::new(&name, app, affinity);
    if panic::catch_unwind(AssertUnwindSafe(|| component.receive(msg, &mut ctx))).is_err() {
        error!(component = %name, kind = msg.name(), "component panicked in receive");
    }
}

/// Look up a registered hub by tag, or fail with the configuration error.
pub(crate) fn find_port<'a>(
    ports: &'a [Box<dyn HubPort>],
    tag: &'static str,
) -> Result<&'a dyn HubPort> {
    ports
        .iter()
        .map(|p| p.as_ref())
        .find(|p| p.tag() == tag)
        .ok_or(Error::NoSuchHub(tag))
}
