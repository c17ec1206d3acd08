//! The app: owner of all hubs and the single serialized command queue.
//!
//! Every cross-hub message passes through one queue drained by `App::run`,
//! which is the system's only cross-hub ordering guarantee: if component A
//! sends M1 then M2, every hub observes M1's delivery pass before M2's.

use crossbeam_channel::{Receiver, Sender};
use tracing::debug;

use crate::component::Component;
use crate::error::{Error, Result};
use crate::hub::{find_port, HubHandle, HubPort, ThreadHub};
use crate::message::{Message, MessageKind};

enum AppCommand {
    Send(Message),
    RemoveHub(&'static str),
}

/// Thread-safe sender half of the app's command queue.
///
/// Held by hubs and external integrations (device threads, bridges) to
/// inject messages without access to the `App` itself. All operations are
/// best-effort once the app has stopped draining.
#[derive(Clone)]
pub struct AppSender {
    tx: Sender<AppCommand>,
}

impl AppSender {
    /// Enqueue a message for fan-out to every live hub.
    pub fn send(&self, msg: Message) {
        let _ = self.tx.send(AppCommand::Send(msg));
    }

    /// Ask the app to forget a hub. Queued, so a hub may request its own
    /// removal from inside its own context without deadlocking.
    pub fn remove_hub(&self, tag: &'static str) {
        let _ = self.tx.send(AppCommand::RemoveHub(tag));
    }
}

/// Owns all hubs; serializes all inter-hub message delivery.
pub struct App {
    tx: Sender<AppCommand>,
    rx: Receiver<AppCommand>,
    ports: Vec<Box<dyn HubPort>>,
}

impl App {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            tx,
            rx,
            ports: Vec::new(),
        }
    }

    /// Sender for hubs and external producers.
    pub fn sender(&self) -> AppSender {
        AppSender {
            tx: self.tx.clone(),
        }
    }

    /// Spawn a [`ThreadHub`] and register it.
    pub fn add_thread_hub(&mut self, tag: &'static str) -> Result<HubHandle> {
        if self.ports.iter().any(|p| p.tag() == tag) {
            return Err(Error::DuplicateHub(tag));
        }
        let hub = ThreadHub::spawn(tag, self.sender());
        let handle = hub.handle();
        self.ports.push(Box::new(hub));
        Ok(handle)
    }

    /// Register an externally built hub (e.g. a realtime audio hub).
    pub fn register_hub(&mut self, port: Box<dyn HubPort>) -> Result<()> {
        if self.ports.iter().any(|p| p.tag() == port.tag()) {
            return Err(Error::DuplicateHub(port.tag()));
        }
        self.ports.push(port);
        Ok(())
    }

    /// Register a component on the hub matching its declared tag.
    ///
    /// Fails with [`Error::NoSuchHub`] when no hub carries that tag: a
    /// configuration error, fatal at startup.
    pub fn add_component(&self, component: Box<dyn Component>) -> Result<()> {
        let port = find_port(&self.ports, component.hub_tag())?;
        port.add_component(component)
    }

    /// Enqueue a message for fan-out to every live hub. Thread-safe.
    pub fn send(&self, msg: Message) {
        self.sender().send(msg);
    }

    /// Broadcast [`MessageKind::Shutdown`]; hubs drain cooperatively and
    /// request their own removal, after which [`App::run`] returns.
    pub fn shutdown(&self) {
        self.send(Message::new(MessageKind::Shutdown));
    }

    /// Drain the command queue until no hubs remain.
    pub fn run(&mut self) {
        while !self.ports.is_empty() {
            let cmd = match self.rx.recv() {
                Ok(cmd) => cmd,
                Err(_) => break,
            };
            match cmd {
                AppCommand::Send(msg) => {
                    for port in &self.ports {
                        port.deliver(msg.clone());
                    }
                }
                AppCommand::RemoveHub(tag) => {
                    if let Some(pos) = self.ports.iter().position(|p| p.tag() == tag) {
                        let mut port = self.ports.remove(pos);
                        port.join();
                        debug!(hub = tag, "hub removed");
                    }
                }
            }
        }
    }

    /// Broadcast shutdown, then drain until every hub is gone.
    pub fn shutdown_and_join(&mut self) {
        self.shutdown();
        self.run();
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}
