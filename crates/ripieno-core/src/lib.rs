//! Component/hub/app message-passing runtime.
//!
//! Components are named units of message-driven behavior, each owned by
//! exactly one hub. A hub owns an execution context (a thread draining a
//! command queue, or an externally driven realtime callback) and is the
//! only path by which code may safely call into its components. The app
//! owns all hubs and serializes every cross-hub delivery through a single
//! command queue.
//!
//! ```no_run
//! use ripieno_core::{App, Message, MessageKind};
//!
//! let mut app = App::new();
//! let hub = app.add_thread_hub("worker").unwrap();
//! // app.add_component(Box::new(my_component)).unwrap();
//! app.send(Message::new(MessageKind::EmergencyStop));
//! app.shutdown_and_join();
//! # let _ = hub;
//! ```

pub mod app;
pub mod component;
pub mod error;
pub mod hub;
pub mod message;
pub mod wire;

pub use app::{App, AppSender};
pub use component::{Affinity, Component, HubContext};
pub use error::{Error, Result, WireError};
pub use hub::{ComponentHandle, HubHandle, HubPort, ThreadHub};
pub use message::{Message, MessageKind};
