//! Port dispatcher: owns the active-port selection and routes lifecycle
//! and tick calls to the selected transport.

use std::fmt;

use tracing::{debug, instrument, warn};

use crate::error::{PortError, PortResult};
use crate::registry::PortRegistry;
use crate::scheduler::TaskScheduler;
use crate::timer::{MsTimer, TickTimer};
use crate::variant::{DatalinkPort, PortVariant};

/// Observable link state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No variant has been initialized yet.
    Unconfigured,
    /// One variant is initialized and receiving ticks.
    Active(PortVariant),
    /// Deinitialized, or a failed init/switch left nothing active.
    Down,
}

impl LinkState {
    /// Returns the active variant, if any.
    pub fn active(&self) -> Option<PortVariant> {
        match self {
            LinkState::Active(variant) => Some(*variant),
            LinkState::Unconfigured | LinkState::Down => None,
        }
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkState::Unconfigured => f.write_str("unconfigured"),
            LinkState::Active(variant) => write!(f, "active({})", variant),
            LinkState::Down => f.write_str("down"),
        }
    }
}

/// Caller-owned data-link port context.
///
/// Holds the registered transports, the selected variant, the link state
/// and the scheduler shell. All operations take `&mut self`; callers that
/// share a dispatcher across threads must wrap it in their own lock.
///
/// # Example
///
/// ```ignore
/// use bacnet_port::{PortDispatcher, PortRegistry, PortVariant};
///
/// let registry = PortRegistry::new().with_port(Box::new(my_bip_port))?;
/// let mut port = PortDispatcher::new(registry);
/// port.init()?;
/// loop {
///     port.poll();
///     // ... service the rest of the stack
/// }
/// ```
pub struct PortDispatcher<T = MsTimer> {
    registry: PortRegistry,
    selected: PortVariant,
    state: LinkState,
    scheduler: TaskScheduler<T>,
}

impl PortDispatcher<MsTimer> {
    /// Creates a dispatcher with the default scheduler (1000 ms, monotonic
    /// clock). The registry's default variant is selected.
    pub fn new(registry: PortRegistry) -> Self {
        Self::with_scheduler(registry, TaskScheduler::new())
    }
}

impl<T: TickTimer> PortDispatcher<T> {
    /// Creates a dispatcher driving ticks from `scheduler`.
    pub fn with_scheduler(registry: PortRegistry, scheduler: TaskScheduler<T>) -> Self {
        let selected = registry.default_variant();
        Self {
            registry,
            selected,
            state: LinkState::Unconfigured,
            scheduler,
        }
    }

    /// Overrides the initially selected variant.
    ///
    /// Only meaningful before the first `init`; after that, switch with
    /// [`set_port`](Self::set_port).
    pub fn with_selected(mut self, variant: PortVariant) -> Self {
        self.selected = variant;
        self
    }

    /// Restarts the tick timer and initializes the selected transport.
    pub fn init(&mut self) -> PortResult<()> {
        self.scheduler.start();
        let selected = self.selected;
        let result = match self.lookup(selected) {
            Ok(port) => port.init(),
            Err(e) => Err(e),
        };
        match &result {
            Ok(()) => {
                debug!("Datalink port {} initialized", selected);
                self.state = LinkState::Active(selected);
            }
            Err(e) => {
                debug!("Datalink port {} failed to initialize: {}", selected, e);
                self.state = LinkState::Down;
            }
        }
        result
    }

    /// Deinitializes the selected transport.
    ///
    /// The call reaches the transport whatever the current state is;
    /// repeated calls rely on the transport's own idempotence.
    pub fn deinit(&mut self) -> PortResult<()> {
        let selected = self.selected;
        let result = self.lookup(selected)?.deinit();
        if self.state != LinkState::Unconfigured {
            self.state = LinkState::Down;
        }
        debug!(ok = result.is_ok(), "Datalink port {} deinitialized", selected);
        result
    }

    /// Forwards a periodic tick to the active transport.
    ///
    /// A no-op unless the link is active.
    pub fn task(&mut self, elapsed_seconds: u32) {
        let Some(variant) = self.state.active() else {
            return;
        };
        if let Some(port) = self.registry.get_mut(variant) {
            port.task(elapsed_seconds);
        }
    }

    /// Scheduler shell entry point; call once per loop iteration.
    ///
    /// Returns the elapsed seconds forwarded to [`task`](Self::task), or
    /// `None` when the interval has not expired yet.
    pub fn poll(&mut self) -> Option<u32> {
        let elapsed_seconds = self.scheduler.poll()?;
        self.task(elapsed_seconds);
        Some(elapsed_seconds)
    }

    /// Hot-swaps to `requested`.
    ///
    /// The selected transport is always torn down first, and a teardown
    /// failure does not stop the switch. If `requested` is not compiled in,
    /// the selection is left as it was, the link is down and an error is
    /// returned. Otherwise `requested` becomes the selection and is
    /// initialized; the switch succeeds even if that init fails, in which
    /// case the link is left down (see [`state`](Self::state)).
    #[instrument(skip(self), fields(from = %self.selected, to = %requested))]
    pub fn set_port(&mut self, requested: PortVariant) -> PortResult<()> {
        if let Err(e) = self.deinit() {
            warn!("Teardown of {} failed, switching anyway: {}", self.selected, e);
        }

        if !self.registry.contains(requested) {
            self.state = LinkState::Down;
            return Err(self.unsupported(requested));
        }

        self.selected = requested;
        if let Err(e) = self.init() {
            warn!("Datalink port {} selected but failed to come up: {}", requested, e);
        }
        Ok(())
    }

    /// The currently selected variant.
    pub fn selected(&self) -> PortVariant {
        self.selected
    }

    /// The current link state.
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Returns true while a transport is active.
    pub fn is_link_up(&self) -> bool {
        self.state.active().is_some()
    }

    /// The transports compiled into this build.
    pub fn registry(&self) -> &PortRegistry {
        &self.registry
    }

    /// The scheduler tick interval in milliseconds.
    pub fn interval_ms(&self) -> u32 {
        self.scheduler.interval_ms()
    }

    /// The scheduler shell.
    pub fn scheduler(&self) -> &TaskScheduler<T> {
        &self.scheduler
    }

    fn lookup(
        &mut self,
        variant: PortVariant,
    ) -> PortResult<&mut (dyn DatalinkPort + 'static)> {
        if self.registry.is_empty() {
            return Err(PortError::NoVariantCompiled);
        }
        self.registry
            .get_mut(variant)
            .ok_or(PortError::Unsupported { variant })
    }

    fn unsupported(&self, variant: PortVariant) -> PortError {
        if self.registry.is_empty() {
            PortError::NoVariantCompiled
        } else {
            PortError::unsupported(variant)
        }
    }
}

impl<T> fmt::Debug for PortDispatcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortDispatcher")
            .field("registry", &self.registry)
            .field("selected", &self.selected)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::ManualClock;
    use crate::variant::MockDatalinkPort;
    use mockall::predicate::eq;
    use mockall::Sequence;
    use pretty_assertions::assert_eq;

    fn mock(variant: PortVariant) -> MockDatalinkPort {
        let mut port = MockDatalinkPort::new();
        port.expect_variant().return_const(variant);
        port
    }

    fn dispatcher(
        ports: Vec<MockDatalinkPort>,
    ) -> (ManualClock, PortDispatcher<MsTimer<ManualClock>>) {
        let mut registry = PortRegistry::new();
        for port in ports {
            registry.register(Box::new(port) as Box<dyn DatalinkPort>).unwrap();
        }
        let clock = ManualClock::default();
        let scheduler = TaskScheduler::with_timer(MsTimer::with_clock(clock.clone()), 1000);
        (clock, PortDispatcher::with_scheduler(registry, scheduler))
    }

    #[test]
    fn test_first_init_activates_default() {
        let mut bip = mock(PortVariant::Bip);
        bip.expect_init().times(1).returning(|| Ok(()));
        let (_clock, mut port) = dispatcher(vec![bip]);

        assert_eq!(port.state(), LinkState::Unconfigured);
        port.init().unwrap();
        assert_eq!(port.state(), LinkState::Active(PortVariant::Bip));
        assert!(port.is_link_up());
        assert!(port.scheduler().timer().is_armed());
    }

    #[test]
    fn test_init_failure_goes_down() {
        let mut bip = mock(PortVariant::Bip);
        bip.expect_init()
            .times(1)
            .returning(|| Err(PortError::init_failed(PortVariant::Bip, "no interface")));
        let (_clock, mut port) = dispatcher(vec![bip]);

        let err = port.init().unwrap_err();
        assert!(!err.is_config_error());
        assert_eq!(port.state(), LinkState::Down);
    }

    #[test]
    fn test_no_variant_compiled() {
        let (clock, mut port) = dispatcher(vec![]);

        assert!(matches!(port.init(), Err(PortError::NoVariantCompiled)));
        assert!(matches!(port.deinit(), Err(PortError::NoVariantCompiled)));
        assert!(matches!(
            port.set_port(PortVariant::Mstp),
            Err(PortError::NoVariantCompiled)
        ));
        clock.advance(5000);
        assert_eq!(port.poll(), Some(1));
        assert_eq!(port.state(), LinkState::Down);
    }

    #[test]
    fn test_poll_forwards_only_on_expiry() {
        let mut bip = mock(PortVariant::Bip);
        bip.expect_init().returning(|| Ok(()));
        bip.expect_task().with(eq(1)).times(2).return_const(());
        let (clock, mut port) = dispatcher(vec![bip]);
        port.init().unwrap();

        for _ in 0..50 {
            clock.advance(19);
            assert_eq!(port.poll(), None);
        }
        clock.advance(50);
        assert_eq!(port.poll(), Some(1));
        clock.advance(1000);
        assert_eq!(port.poll(), Some(1));
    }

    #[test]
    fn test_task_ignored_when_down() {
        let mut bip = mock(PortVariant::Bip);
        bip.expect_init().returning(|| Ok(()));
        bip.expect_deinit().returning(|| Ok(()));
        bip.expect_task().never();
        let (clock, mut port) = dispatcher(vec![bip]);

        port.init().unwrap();
        port.deinit().unwrap();
        assert_eq!(port.state(), LinkState::Down);

        clock.advance(1000);
        port.poll();
        port.task(1);
    }

    #[test]
    fn test_set_port_orders_deinit_before_init() {
        let mut seq = Sequence::new();
        let mut bip = mock(PortVariant::Bip);
        let mut mstp = mock(PortVariant::Mstp);
        bip.expect_init()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(()));
        bip.expect_deinit()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(()));
        mstp.expect_init()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(()));
        let (_clock, mut port) = dispatcher(vec![bip, mstp]);

        port.init().unwrap();
        port.set_port(PortVariant::Mstp).unwrap();
        assert_eq!(port.selected(), PortVariant::Mstp);
        assert_eq!(port.state(), LinkState::Active(PortVariant::Mstp));
    }

    #[test]
    fn test_set_port_continues_after_deinit_failure() {
        let mut seq = Sequence::new();
        let mut bip = mock(PortVariant::Bip);
        let mut bip6 = mock(PortVariant::Bip6);
        bip.expect_init().returning(|| Ok(()));
        bip.expect_deinit()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Err(PortError::deinit_failed(PortVariant::Bip, "close failed")));
        bip6.expect_init()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(()));
        let (_clock, mut port) = dispatcher(vec![bip, bip6]);

        port.init().unwrap();
        port.set_port(PortVariant::Bip6).unwrap();
        assert_eq!(port.state(), LinkState::Active(PortVariant::Bip6));
    }

    #[test]
    fn test_set_port_unsupported_leaves_link_down() {
        let mut mstp = mock(PortVariant::Mstp);
        mstp.expect_init().times(1).returning(|| Ok(()));
        mstp.expect_deinit().times(1).returning(|| Ok(()));
        mstp.expect_task().never();
        let (clock, mut port) = dispatcher(vec![mstp]);

        port.init().unwrap();
        let err = port.set_port(PortVariant::Bip).unwrap_err();
        assert!(matches!(
            err,
            PortError::Unsupported {
                variant: PortVariant::Bip
            }
        ));
        assert_eq!(port.selected(), PortVariant::Mstp);
        assert_eq!(port.state(), LinkState::Down);

        clock.advance(2000);
        port.poll();
    }

    #[test]
    fn test_set_port_unsupported_from_unconfigured() {
        let mut mstp = mock(PortVariant::Mstp);
        mstp.expect_deinit().times(1).returning(|| Ok(()));
        let (_clock, mut port) = dispatcher(vec![mstp]);

        assert!(port.set_port(PortVariant::Bip6).is_err());
        assert_eq!(port.state(), LinkState::Down);
    }

    #[test]
    fn test_set_port_recovers_after_failed_switch() {
        let mut mstp = mock(PortVariant::Mstp);
        mstp.expect_init().times(2).returning(|| Ok(()));
        mstp.expect_deinit().times(2).returning(|| Ok(()));
        let (_clock, mut port) = dispatcher(vec![mstp]);

        port.init().unwrap();
        assert!(port.set_port(PortVariant::Bip).is_err());
        port.set_port(PortVariant::Mstp).unwrap();
        assert_eq!(port.state(), LinkState::Active(PortVariant::Mstp));
    }

    #[test]
    fn test_set_port_accepted_even_if_new_init_fails() {
        let mut bip = mock(PortVariant::Bip);
        let mut bip6 = mock(PortVariant::Bip6);
        bip.expect_init().returning(|| Ok(()));
        bip.expect_deinit().returning(|| Ok(()));
        bip6.expect_init()
            .times(1)
            .returning(|| Err(PortError::init_failed(PortVariant::Bip6, "no address")));
        bip6.expect_task().never();
        let (clock, mut port) = dispatcher(vec![bip, bip6]);

        port.init().unwrap();
        port.set_port(PortVariant::Bip6).unwrap();
        assert_eq!(port.selected(), PortVariant::Bip6);
        assert_eq!(port.state(), LinkState::Down);
        assert!(!port.is_link_up());

        clock.advance(1000);
        port.poll();
    }

    #[test]
    fn test_set_port_unsupported_from_down() {
        let mut bip = mock(PortVariant::Bip);
        bip.expect_init().times(1).returning(|| Ok(()));
        bip.expect_deinit().times(2).returning(|| Ok(()));
        let (_clock, mut port) = dispatcher(vec![bip]);

        port.init().unwrap();
        port.deinit().unwrap();
        assert_eq!(port.state(), LinkState::Down);

        let err = port.set_port(PortVariant::Mstp).unwrap_err();
        assert!(matches!(
            err,
            PortError::Unsupported {
                variant: PortVariant::Mstp
            }
        ));
        assert_eq!(port.selected(), PortVariant::Bip);
        assert_eq!(port.state(), LinkState::Down);
    }

    #[test]
    fn test_set_port_resets_timer() {
        let mut bip = mock(PortVariant::Bip);
        let mut bip6 = mock(PortVariant::Bip6);
        bip.expect_init().returning(|| Ok(()));
        bip.expect_deinit().returning(|| Ok(()));
        bip6.expect_init().returning(|| Ok(()));
        bip6.expect_task().with(eq(1)).times(1).return_const(());
        let (clock, mut port) = dispatcher(vec![bip, bip6]);

        port.init().unwrap();
        clock.advance(900);
        port.set_port(PortVariant::Bip6).unwrap();
        clock.advance(900);
        assert_eq!(port.poll(), None);
        clock.advance(100);
        assert_eq!(port.poll(), Some(1));
    }

    #[test]
    fn test_deinit_twice_returns_transport_result() {
        let mut bip = mock(PortVariant::Bip);
        bip.expect_init().returning(|| Ok(()));
        bip.expect_deinit().times(2).returning(|| Ok(()));
        let (_clock, mut port) = dispatcher(vec![bip]);

        port.init().unwrap();
        port.deinit().unwrap();
        port.deinit().unwrap();
        assert_eq!(port.state(), LinkState::Down);
    }

    #[test]
    fn test_deinit_unconfigured_keeps_state() {
        let mut bip = mock(PortVariant::Bip);
        bip.expect_deinit().times(1).returning(|| Ok(()));
        let (_clock, mut port) = dispatcher(vec![bip]);

        port.deinit().unwrap();
        assert_eq!(port.state(), LinkState::Unconfigured);
    }

    #[test]
    fn test_with_selected_unsupported_init() {
        let mut bip = mock(PortVariant::Bip);
        bip.expect_init().never();
        let (_clock, port) = dispatcher(vec![bip]);
        let mut port = port.with_selected(PortVariant::Mstp);

        let err = port.init().unwrap_err();
        assert!(err.is_config_error());
        assert_eq!(port.state(), LinkState::Down);
    }

    #[test]
    fn test_link_state_display() {
        assert_eq!(LinkState::Unconfigured.to_string(), "unconfigured");
        assert_eq!(
            LinkState::Active(PortVariant::Bip6).to_string(),
            "active(bip6)"
        );
        assert_eq!(LinkState::Down.to_string(), "down");
    }
}
