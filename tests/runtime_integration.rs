//! Cross-hub behavior of the full runtime: ordering, affinity, directed
//! delivery and cooperative shutdown.

use std::sync::mpsc;
use std::time::Duration;

use ripieno::{App, Component, HubContext, Message, MessageKind};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

struct Recorder {
    name: &'static str,
    hub: &'static str,
    log: mpsc::Sender<(String, String)>,
}

impl Component for Recorder {
    fn name(&self) -> &str {
        self.name
    }

    fn hub_tag(&self) -> &'static str {
        self.hub
    }

    fn receive(&mut self, msg: &Message, _ctx: &mut HubContext<'_>) {
        let _ = self.log.send((self.name.to_owned(), msg.name().to_owned()));
    }

    fn cleanup(&mut self, _ctx: &mut HubContext<'_>) {
        let _ = self.log.send((self.name.to_owned(), "cleanup".to_owned()));
    }
}

#[test]
fn test_cross_hub_messages_keep_send_order() {
    init_tracing();
    let mut app = App::new();
    app.add_thread_hub("ui").unwrap();
    app.add_thread_hub("worker").unwrap();

    let (log, seen) = mpsc::channel();
    app.add_component(Box::new(Recorder {
        name: "panel",
        hub: "ui",
        log: log.clone(),
    }))
    .unwrap();
    app.add_component(Box::new(Recorder {
        name: "pump",
        hub: "worker",
        log,
    }))
    .unwrap();

    app.send(Message::new(MessageKind::Pause { group: 1 }));
    app.send(Message::new(MessageKind::Resume { group: 1 }));
    app.shutdown_and_join();

    // Both hubs must observe pause strictly before resume, whatever else
    // (new-component broadcasts) interleaves.
    let log: Vec<(String, String)> = seen.try_iter().collect();
    for component in ["panel", "pump"] {
        let order = seen_for(&log, component);
        let pause = order.iter().position(|n| n == "pause").unwrap();
        let resume = order.iter().position(|n| n == "resume").unwrap();
        assert!(pause < resume, "{component} saw {order:?}");
    }
}

fn seen_for(log: &[(String, String)], component: &str) -> Vec<String> {
    log.iter()
        .filter(|(who, _)| who == component)
        .map(|(_, what)| what.clone())
        .collect()
}

#[test]
fn test_directed_delivery_and_unknown_destination() {
    init_tracing();
    let mut app = App::new();
    let worker = app.add_thread_hub("worker").unwrap();

    let (log, seen) = mpsc::channel();
    app.add_component(Box::new(Recorder {
        name: "pump",
        hub: "worker",
        log,
    }))
    .unwrap();

    let handle = worker.component_handle("pump");
    handle.post(Message::new(MessageKind::EmergencyStop));
    // Addressed to a component that does not exist: silently dropped.
    app.send(Message::to("ghost", MessageKind::EmergencyStop));
    app.shutdown_and_join();

    let log: Vec<(String, String)> = seen.try_iter().collect();
    let order = seen_for(&log, "pump");
    assert_eq!(
        order
            .iter()
            .filter(|n| n.as_str() == "emergencystop")
            .count(),
        1
    );
}

#[test]
fn test_remove_component_runs_cleanup_then_deregisters() {
    init_tracing();
    let mut app = App::new();
    let worker = app.add_thread_hub("worker").unwrap();

    let (log, seen) = mpsc::channel();
    app.add_component(Box::new(Recorder {
        name: "pump",
        hub: "worker",
        log,
    }))
    .unwrap();

    // All four commands land on the hub's own queue, so the order below
    // is the order the hub executes them in.
    worker.deliver(Message::new(MessageKind::EmergencyStop));
    worker.remove_component("pump");
    // Second removal of the same name is a no-op.
    worker.remove_component("pump");
    worker.deliver(Message::new(MessageKind::EmergencyStop));
    app.shutdown_and_join();

    // Cleanup ran exactly once, after the first delivery; the second
    // delivery and the shutdown teardown found the component gone.
    let log: Vec<(String, String)> = seen.try_iter().collect();
    assert_eq!(seen_for(&log, "pump"), vec!["emergencystop", "cleanup"]);
}

#[test]
fn test_affinity_is_bound_to_the_hub_thread() {
    init_tracing();
    let mut app = App::new();
    let worker = app.add_thread_hub("worker").unwrap();

    // Inside the hub context the guard passes.
    let (tx, rx) = mpsc::channel();
    let affinity = worker.affinity().clone();
    worker.run_in_hub(move || {
        affinity.check();
        let _ = tx.send(affinity.is_current());
    });
    assert!(rx.recv_timeout(Duration::from_secs(5)).unwrap());

    // From any other thread it panics.
    let affinity = worker.affinity().clone();
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
        affinity.check();
    }));
    assert!(result.is_err());

    app.shutdown_and_join();
}

struct Teardown {
    name: &'static str,
    explode: bool,
    log: mpsc::Sender<&'static str>,
}

impl Component for Teardown {
    fn name(&self) -> &str {
        self.name
    }

    fn hub_tag(&self) -> &'static str {
        "worker"
    }

    fn cleanup(&mut self, _ctx: &mut HubContext<'_>) {
        let _ = self.log.send(self.name);
        if self.explode {
            panic!("cleanup failure drill");
        }
    }
}

#[test]
fn test_shutdown_survives_panicking_cleanup() {
    init_tracing();
    let mut app = App::new();
    app.add_thread_hub("worker").unwrap();
    app.add_thread_hub("ui").unwrap();

    let (log, cleaned) = mpsc::channel();
    app.add_component(Box::new(Teardown {
        name: "first",
        explode: true,
        log: log.clone(),
    }))
    .unwrap();
    app.add_component(Box::new(Teardown {
        name: "second",
        explode: false,
        log,
    }))
    .unwrap();

    // Must return: the panicking hook neither wedges its hub nor the app.
    app.shutdown_and_join();

    let mut names: Vec<&str> = cleaned.try_iter().collect();
    names.sort_unstable();
    assert_eq!(names, vec!["first", "second"]);
}

#[test]
fn test_queued_messages_after_shutdown_are_discarded() {
    init_tracing();
    let mut app = App::new();
    app.add_thread_hub("worker").unwrap();
    app.shutdown_and_join();

    // The runtime is gone; sending must not panic or block.
    app.send(Message::new(MessageKind::EmergencyStop));
}
