//! Test fixtures for port lifecycle testing
//!
//! Provides recording transports and pre-built registries

use std::sync::Arc;

use bacnet_port::{
    DatalinkPort, ManualClock, MsTimer, PortDispatcher, PortError, PortRegistry, PortResult,
    PortVariant, TaskScheduler,
};
use parking_lot::Mutex;

/// A call observed on a recording transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortCall {
    /// `init()` was called
    Init(PortVariant),
    /// `deinit()` was called
    Deinit(PortVariant),
    /// `task(elapsed_seconds)` was called
    Task(PortVariant, u32),
}

/// Shared, ordered log of calls across all recording transports
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<PortCall>>>,
}

impl CallLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a call
    pub fn record(&self, call: PortCall) {
        self.calls.lock().push(call);
    }

    /// Snapshot of all calls so far
    pub fn calls(&self) -> Vec<PortCall> {
        self.calls.lock().clone()
    }

    /// Number of times `call` was recorded
    pub fn count(&self, call: PortCall) -> usize {
        self.calls.lock().iter().filter(|c| **c == call).count()
    }

    /// All task calls, in order
    pub fn tasks(&self) -> Vec<PortCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, PortCall::Task(..)))
            .copied()
            .collect()
    }

    /// Forget everything recorded so far
    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

/// Transport fake that records calls and returns scripted results
#[derive(Debug, Clone)]
pub struct RecordingPort {
    variant: PortVariant,
    log: CallLog,
    init_ok: bool,
    deinit_ok: bool,
}

impl RecordingPort {
    /// Create a transport for `variant` that succeeds on every call
    pub fn new(variant: PortVariant, log: &CallLog) -> Self {
        Self {
            variant,
            log: log.clone(),
            init_ok: true,
            deinit_ok: true,
        }
    }

    /// Make `init()` fail
    pub fn failing_init(mut self) -> Self {
        self.init_ok = false;
        self
    }

    /// Make `deinit()` fail
    pub fn failing_deinit(mut self) -> Self {
        self.deinit_ok = false;
        self
    }

    /// Box as a registry entry
    pub fn boxed(self) -> Box<dyn DatalinkPort> {
        Box::new(self)
    }
}

impl DatalinkPort for RecordingPort {
    fn variant(&self) -> PortVariant {
        self.variant
    }

    fn init(&mut self) -> PortResult<()> {
        self.log.record(PortCall::Init(self.variant));
        if self.init_ok {
            Ok(())
        } else {
            Err(PortError::init_failed(self.variant, "scripted init failure"))
        }
    }

    fn deinit(&mut self) -> PortResult<()> {
        self.log.record(PortCall::Deinit(self.variant));
        if self.deinit_ok {
            Ok(())
        } else {
            Err(PortError::deinit_failed(
                self.variant,
                "scripted deinit failure",
            ))
        }
    }

    fn task(&mut self, elapsed_seconds: u32) {
        self.log.record(PortCall::Task(self.variant, elapsed_seconds));
    }
}

/// Dispatcher on a manually driven clock
pub type TestDispatcher = PortDispatcher<MsTimer<ManualClock>>;

/// Build a dispatcher over `registry` ticking every `interval_ms`
///
/// Returns the clock handle used to advance time.
pub fn dispatcher_with_interval(
    registry: PortRegistry,
    interval_ms: u32,
) -> (ManualClock, TestDispatcher) {
    let clock = ManualClock::default();
    let scheduler = TaskScheduler::with_timer(MsTimer::with_clock(clock.clone()), interval_ms);
    (clock, PortDispatcher::with_scheduler(registry, scheduler))
}

/// Common registry fixtures
pub mod port_fixtures {
    use super::*;

    /// Registry holding one recording transport per variant in `variants`
    pub fn registry_of(variants: &[PortVariant], log: &CallLog) -> PortRegistry {
        let mut registry = PortRegistry::new();
        for variant in variants {
            // Duplicates in the fixture input are skipped
            let _ = registry.register(RecordingPort::new(*variant, log).boxed());
        }
        registry
    }

    /// A build with only the MS/TP transport
    pub fn serial_only(log: &CallLog) -> PortRegistry {
        registry_of(&[PortVariant::Mstp], log)
    }

    /// A build with every transport
    pub fn all_ports(log: &CallLog) -> PortRegistry {
        registry_of(&PortVariant::ALL, log)
    }

    /// A build with no transport
    pub fn none_compiled() -> PortRegistry {
        PortRegistry::new()
    }
}
