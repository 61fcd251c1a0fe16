use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

use battery_entry::platform::{InMemoryPackageDirectory, InMemoryUserDirectory, StaticResources};
use battery_entry::queue::events::event_channel;
use battery_entry::{
    ApplicationInfo, BatteryError, BatterySipper, EntryEvent, EntryService, EntryServiceConfig, InMemoryPlatform,
    LookupError, OwnerId, PackageDirectory, PackageInfo, Platform, QueueError,
};

const WAIT: Duration = Duration::from_secs(5);

/// Package directory that parks the loader inside `application_info` for one
/// package until released.
struct GatedPackages {
    inner: Arc<InMemoryPackageDirectory>,
    gated: String,
    entered: Sender<()>,
    release: Receiver<()>,
}

impl PackageDirectory for GatedPackages {
    fn packages_for_owner(&self, owner: OwnerId) -> Option<Vec<String>> {
        self.inner.packages_for_owner(owner)
    }

    fn application_info(&self, package: &str) -> Result<ApplicationInfo, LookupError> {
        if package == self.gated {
            let _ = self.entered.send(());
            let _ = self.release.recv_timeout(WAIT);
        }
        self.inner.application_info(package)
    }

    fn package_info(&self, package: &str) -> Result<PackageInfo, LookupError> {
        self.inner.package_info(package)
    }

    fn text(&self, package: &str, resource: u32, app: &ApplicationInfo) -> Option<String> {
        self.inner.text(package, resource, app)
    }
}

struct Gate {
    packages: Arc<InMemoryPackageDirectory>,
    entered: Receiver<()>,
    release: Sender<()>,
}

fn gated_service(gated: &str) -> (EntryService, Gate) {
    let packages = Arc::new(InMemoryPackageDirectory::new());
    let (entered_tx, entered_rx) = bounded(4);
    let (release_tx, release_rx) = bounded(4);
    let gated = GatedPackages {
        inner: Arc::clone(&packages),
        gated: gated.to_string(),
        entered: entered_tx,
        release: release_rx,
    };
    let platform = Platform::new(
        Arc::new(StaticResources::new()),
        Arc::new(InMemoryUserDirectory::new()),
        Arc::new(gated),
    );
    let config = EntryServiceConfig {
        worker_thread_name: "gated-loader".to_string(),
        ..EntryServiceConfig::default()
    };
    let service = EntryService::new(platform, config).unwrap();
    (
        service,
        Gate {
            packages,
            entered: entered_rx,
            release: release_tx,
        },
    )
}

fn labels(events: &[EntryEvent]) -> Vec<String> {
    events
        .iter()
        .map(|e| e.entry().and_then(|entry| entry.label()).unwrap_or_default())
        .collect()
}

#[test]
fn queue_drains_in_fifo_order_and_reports_fully_drawn_once() {
    let mem = InMemoryPlatform::new();
    for (owner, label) in [(10_001, "Alpha"), (10_002, "Beta"), (10_003, "Gamma")] {
        mem.packages
            .install(OwnerId::new(owner), &format!("com.example.{owner}"), Some(label), 1);
    }
    let service = EntryService::with_defaults(mem.platform());
    let stream = service.subscribe();

    let entries = service.create_entries([10_001, 10_002, 10_003].map(|o| BatterySipper::app(OwnerId::new(o))));
    assert!(entries.iter().all(|e| e.label().is_none()));
    assert_eq!(service.queue().pending_len(), 3);

    assert!(service.start_request_queue().unwrap());
    let events = stream.drain_until_fully_drawn(WAIT).unwrap();

    assert_eq!(labels(&events), vec!["Alpha", "Beta", "Gamma"]);
    let ids: Vec<_> = events.iter().map(|e| e.entry().unwrap().id()).collect();
    let expected: Vec<_> = entries.iter().map(|e| e.id()).collect();
    assert_eq!(ids, expected);
    assert_eq!(events[0].code(), 1);

    assert!(service.queue().wait_idle(WAIT));
    let err = stream.recv_timeout(Duration::from_millis(50)).unwrap_err();
    assert!(matches!(err, BatteryError::Queue(QueueError::Timeout { .. })));
    assert_eq!(service.queue().pending_len(), 0);
}

#[test]
fn closure_handler_receives_events() {
    let mem = InMemoryPlatform::new();
    mem.packages.install(OwnerId::new(10_020), "com.example.app", Some("Example"), 1);
    let service = EntryService::with_defaults(mem.platform());

    let (tx, rx) = unbounded();
    service.register_handler(Arc::new(move |event: EntryEvent| {
        let _ = tx.send(event.code());
    }));

    service.create_entry(BatterySipper::app(OwnerId::new(10_020)));
    assert!(service.start_request_queue().unwrap());
    assert_eq!(rx.recv_timeout(WAIT).unwrap(), 1);
    assert_eq!(rx.recv_timeout(WAIT).unwrap(), 2);
    assert!(service.queue().wait_idle(WAIT));
    assert!(rx.try_recv().is_err());
}

#[test]
fn fully_drawn_arrives_when_updates_overflow_the_stream() {
    let mem = InMemoryPlatform::new();
    for owner in [10_031, 10_032, 10_033] {
        mem.packages
            .install(OwnerId::new(owner), &format!("com.example.{owner}"), Some("App"), 1);
    }
    let config = EntryServiceConfig {
        event_capacity: 1,
        ..EntryServiceConfig::default()
    };
    let service = EntryService::new(mem.platform(), config).unwrap();
    let (handler, stream) = event_channel(service.config().event_capacity);
    service.register_handler(handler.clone());

    let entries = service.create_entries([10_031, 10_032, 10_033].map(|o| BatterySipper::app(OwnerId::new(o))));
    assert!(service.start_request_queue().unwrap());

    // Nobody reads until the loader is gone.
    assert!(service.queue().wait_idle(WAIT));
    let updates = stream.drain_until_fully_drawn(Duration::from_millis(300)).unwrap();

    assert_eq!(updates.len(), 1);
    assert_eq!(handler.dropped_events(), 2);
    assert!(entries.iter().all(|e| e.label().as_deref() == Some("App")));
}

#[test]
fn start_with_nothing_queued_never_spawns() {
    let mem = InMemoryPlatform::new();
    let service = EntryService::with_defaults(mem.platform());
    let _stream = service.subscribe();

    service.create_entry(BatterySipper::app(OwnerId::KERNEL));
    assert!(!service.start_request_queue().unwrap());
    assert_eq!(service.queue().workers_spawned(), 0);
    assert_eq!(service.stop_request_queue(), 0);
}

#[test]
fn stop_mid_drain_abandons_remaining_entries() {
    let (service, gate) = gated_service("com.example.a");
    for (owner, package, label) in [
        (10_101, "com.example.a", "A"),
        (10_102, "com.example.b", "B"),
        (10_103, "com.example.c", "C"),
    ] {
        gate.packages.install(OwnerId::new(owner), package, Some(label), 1);
    }

    let first = service.subscribe();
    let a = service.create_entry(BatterySipper::app(OwnerId::new(10_101)));
    let b = service.create_entry(BatterySipper::app(OwnerId::new(10_102)));
    let c = service.create_entry(BatterySipper::app(OwnerId::new(10_103)));
    assert!(service.start_request_queue().unwrap());

    // Loader is now inside A's resolution.
    gate.entered.recv_timeout(WAIT).unwrap();
    assert_eq!(service.stop_request_queue(), 2);
    assert_eq!(service.queue().pending_len(), 0);
    assert!(!service.queue().has_handler());
    gate.release.send(()).unwrap();

    // The in-flight resolution still completes.
    assert!(service.queue().wait_idle(WAIT));
    assert_eq!(service.queue().live_loaders(), 0);
    assert!(service.cache().contains(OwnerId::new(10_101)));
    assert_eq!(a.label().as_deref(), Some("A"));
    assert!(b.label().is_none());
    assert!(c.label().is_none());

    // The handler was dropped by stop, so nothing was reported.
    let err = first.recv_timeout(WAIT).unwrap_err();
    assert!(matches!(err, BatteryError::Queue(QueueError::Disconnected { .. })));

    // A fresh run only sees fresh work.
    gate.packages.install(OwnerId::new(10_104), "com.example.d", Some("D"), 1);
    let second = service.subscribe();
    let d = service.create_entry(BatterySipper::app(OwnerId::new(10_104)));
    assert!(service.start_request_queue().unwrap());
    let events = second.drain_until_fully_drawn(WAIT).unwrap();

    assert_eq!(labels(&events), vec!["D"]);
    assert_eq!(d.label().as_deref(), Some("D"));
    assert!(b.label().is_none());
    assert!(c.label().is_none());
    assert!(!service.cache().contains(OwnerId::new(10_102)));
}

#[test]
fn restart_supersedes_active_loader() {
    let (service, gate) = gated_service("com.example.slow");
    gate.packages.install(OwnerId::new(10_201), "com.example.slow", Some("Slow"), 1);
    gate.packages.install(OwnerId::new(10_202), "com.example.fast", Some("Fast"), 1);
    gate.packages.install(OwnerId::new(10_203), "com.example.late", Some("Late"), 1);

    let stream = service.subscribe();
    service.create_entry(BatterySipper::app(OwnerId::new(10_201)));
    service.create_entry(BatterySipper::app(OwnerId::new(10_202)));
    assert!(service.start_request_queue().unwrap());
    gate.entered.recv_timeout(WAIT).unwrap();
    let first_generation = service.queue().current_generation().unwrap();

    service.create_entry(BatterySipper::app(OwnerId::new(10_203)));
    assert!(service.start_request_queue().unwrap());
    assert!(service.queue().current_generation().unwrap() > first_generation);

    let events = stream.drain_until_fully_drawn(WAIT).unwrap();
    assert_eq!(labels(&events), vec!["Fast", "Late"]);

    // The superseded loader finishes its entry, then exits without a second
    // drain report.
    gate.release.send(()).unwrap();
    let event = stream.recv_timeout(WAIT).unwrap();
    assert_eq!(labels(&[event]), vec!["Slow"]);
    let err = stream.recv_timeout(Duration::from_millis(100)).unwrap_err();
    assert!(matches!(err, BatteryError::Queue(QueueError::Timeout { .. })));
    assert_eq!(service.queue().workers_spawned(), 2);
}

#[test]
fn stop_after_restart_silences_superseded_loader() {
    let (service, gate) = gated_service("com.example.slow");
    gate.packages.install(OwnerId::new(10_301), "com.example.slow", Some("Slow"), 1);
    gate.packages.install(OwnerId::new(10_302), "com.example.fast", Some("Fast"), 1);

    let first = service.subscribe();
    let slow = service.create_entry(BatterySipper::app(OwnerId::new(10_301)));
    assert!(service.start_request_queue().unwrap());
    gate.entered.recv_timeout(WAIT).unwrap();

    service.create_entry(BatterySipper::app(OwnerId::new(10_302)));
    assert!(service.start_request_queue().unwrap());
    assert_eq!(labels(&first.drain_until_fully_drawn(WAIT).unwrap()), vec!["Fast"]);

    assert_eq!(service.stop_request_queue(), 0);
    assert!(!service.queue().is_running());
    assert!(service.queue().live_loaders() >= 1);

    let second = service.subscribe();
    gate.release.send(()).unwrap();
    assert!(service.queue().wait_idle(WAIT));

    assert_eq!(slow.label().as_deref(), Some("Slow"));
    assert!(second.try_recv().unwrap().is_none());
}
