//! The realtime audio hub.
//!
//! Unlike a thread hub, this hub does not own its execution context: the
//! audio backend does, by calling [`AudioHubDriver::render`] from its
//! callback. Messages reach the callback through a bounded channel that
//! the driver drains non-blockingly at the top of every render pass, so
//! delivery is realtime-safe at the price of being best-effort under
//! backpressure.

use crossbeam_channel::{Receiver, Sender, TrySendError};
use tracing::{debug, warn};

use ripieno_core::{Affinity, AppSender, Component, Error, HubPort, Message, MessageKind, Result};

/// Messages queued between two render passes before the port starts
/// dropping.
const COMMAND_CAPACITY: usize = 64;

/// A component hosted on the audio hub. Runs entirely inside the audio
/// callback: `receive` and `render` must not block or allocate.
pub trait AudioComponent: Send {
    fn name(&self) -> &str;

    /// React to a runtime message. Called from the render pass.
    fn receive(&mut self, _msg: &Message) {}

    /// Add this component's output for the window starting at
    /// `frame_time` into `out`.
    fn render(&mut self, frame_time: u64, out: &mut [f32]);
}

enum AudioCommand {
    Deliver(Message),
    Add(Box<dyn AudioComponent>),
    Remove(String),
}

/// Control-side handle to the audio hub; also its [`HubPort`].
///
/// Message components cannot live here, so [`HubPort::add_component`]
/// refuses them; audio components register through
/// [`AudioHub::add_component`] instead.
#[derive(Clone)]
pub struct AudioHub {
    tag: &'static str,
    tx: Sender<AudioCommand>,
    app: AppSender,
}

/// The callback-side half: owns the component list and drains commands.
pub struct AudioHubDriver {
    tag: &'static str,
    rx: Receiver<AudioCommand>,
    components: Vec<Box<dyn AudioComponent>>,
    affinity: Affinity,
    app: AppSender,
    /// Frames rendered so far; the hub's clock.
    frame_time: u64,
    stopped: bool,
}

impl AudioHub {
    pub fn new(tag: &'static str, app: AppSender) -> (AudioHub, AudioHubDriver) {
        let (tx, rx) = crossbeam_channel::bounded(COMMAND_CAPACITY);
        let hub = AudioHub {
            tag,
            tx,
            app: app.clone(),
        };
        let driver = AudioHubDriver {
            tag,
            rx,
            components: Vec::new(),
            affinity: Affinity::new(tag),
            app,
            frame_time: 0,
            stopped: false,
        };
        (hub, driver)
    }

    pub fn tag(&self) -> &'static str {
        self.tag
    }

    /// Queue an audio component for registration on the next render pass
    /// and broadcast its arrival.
    pub fn add_component(&self, component: Box<dyn AudioComponent>) {
        let name = component.name().to_owned();
        if self.send(AudioCommand::Add(component)) {
            let mut msg = Message::new(MessageKind::NewComponent);
            msg.src = Some(name);
            msg.ts = Some(Message::now());
            self.app.send(msg);
        }
    }

    /// Queue a component for removal on the next render pass.
    pub fn remove_component(&self, name: impl Into<String>) {
        self.send(AudioCommand::Remove(name.into()));
    }

    fn send(&self, cmd: AudioCommand) -> bool {
        match self.tx.try_send(cmd) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(hub = self.tag, "audio hub command queue full, dropping");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

impl HubPort for AudioHub {
    fn tag(&self) -> &'static str {
        self.tag
    }

    fn deliver(&self, msg: Message) {
        self.send(AudioCommand::Deliver(msg));
    }

    fn add_component(&self, _component: Box<dyn Component>) -> Result<()> {
        Err(Error::IncompatibleHub(self.tag))
    }

    fn join(&mut self) {
        // The audio backend owns the callback thread; nothing to join.
    }
}

impl AudioHubDriver {
    pub fn tag(&self) -> &'static str {
        self.tag
    }

    /// Identity of the callback context; bound on the first render pass.
    pub fn affinity(&self) -> &Affinity {
        &self.affinity
    }

    /// True once a shutdown message has been processed.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// One render pass: drain queued commands, then let every component
    /// add its output into `out`. Call from the audio callback with the
    /// backend's buffer.
    pub fn render(&mut self, out: &mut [f32]) {
        if !self.affinity.is_current() {
            self.affinity.bind_current();
        }

        while let Ok(cmd) = self.rx.try_recv() {
            match cmd {
                AudioCommand::Deliver(msg) => {
                    let shutdown = matches!(msg.kind, MessageKind::Shutdown);
                    match &msg.dst {
                        None => {
                            for component in &mut self.components {
                                component.receive(&msg);
                            }
                        }
                        Some(dst) => {
                            if let Some(component) =
                                self.components.iter_mut().find(|c| c.name() == *dst)
                            {
                                component.receive(&msg);
                            }
                        }
                    }
                    if shutdown {
                        self.stop();
                    }
                }
                AudioCommand::Add(component) => {
                    if self
                        .components
                        .iter()
                        .any(|c| c.name() == component.name())
                    {
                        continue;
                    }
                    self.components.push(component);
                }
                AudioCommand::Remove(name) => {
                    self.components.retain(|c| c.name() != name);
                }
            }
        }

        out.fill(0.0);
        if self.stopped {
            return;
        }
        for component in &mut self.components {
            component.render(self.frame_time, out);
        }
        self.frame_time += out.len() as u64;
    }

    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            debug!(hub = self.tag, "audio hub stopping");
            self.app.remove_hub(self.tag);
        }
    }
}

impl Drop for AudioHubDriver {
    /// A backend that stops calling `render` must still release the app;
    /// dropping the driver requests removal.
    fn drop(&mut self) {
        self.stop();
    }
}
