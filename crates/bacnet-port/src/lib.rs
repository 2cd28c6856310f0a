//! BACnet data-link port layer.
//!
//! This crate selects, initializes, periodically services and hot-swaps the
//! single active data-link transport of a BACnet stack:
//!
//! - [`PortVariant`] / [`DatalinkPort`]: the transport kinds and the
//!   contract a transport implements
//! - [`PortRegistry`]: the transports compiled into this build
//! - [`TaskScheduler`]: fixed-cadence tick source over a [`TickTimer`]
//! - [`PortDispatcher`]: the caller-owned context tying it all together
//! - [`error`]: error types for port operations
//!
//! # Lifecycle
//!
//! 1. Register the compiled-in transports in a [`PortRegistry`]
//! 2. Create a [`PortDispatcher`] and call [`init`](PortDispatcher::init)
//! 3. Call [`poll`](PortDispatcher::poll) from the application's main loop;
//!    roughly once a second the active transport's `task` runs
//! 4. Switch transports with [`set_port`](PortDispatcher::set_port)
//!
//! # State machine
//!
//! | From | Call | To |
//! |------|------|----|
//! | `Unconfigured` / `Down` | `init` ok | `Active(selected)` |
//! | `Unconfigured` / `Down` | `init` err | `Down` |
//! | `Active(v)` | `deinit` | `Down` |
//! | any | `set_port(w)`, `w` compiled in, `init` ok | `Active(w)` |
//! | any | `set_port(w)`, `w` compiled in, `init` err | `Down` |
//! | any | `set_port(w)`, `w` not compiled in | `Down` |
//!
//! This crate only emits `tracing` events; installing a subscriber is up to
//! the application.

pub mod dispatcher;
pub mod error;
pub mod registry;
pub mod scheduler;
pub mod timer;
pub mod variant;

pub use dispatcher::{LinkState, PortDispatcher};
pub use error::{PortError, PortResult};
pub use registry::PortRegistry;
pub use scheduler::{TaskScheduler, DEFAULT_TASK_INTERVAL_MS};
pub use timer::{Clock, ManualClock, MonotonicClock, MsTimer, TickTimer};
pub use variant::{DatalinkPort, PortVariant};
