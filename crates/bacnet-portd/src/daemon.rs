//! PortDaemon: the cooperative main loop around the port dispatcher.

use std::future::Future;
use std::path::{Path, PathBuf};

use bacnet_port::{MsTimer, PortDispatcher, PortResult, TaskScheduler};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, warn};

use crate::config::PortdConfig;
use crate::error::Result;
use crate::links;

/// Owns the dispatcher and the configuration it was built from.
pub struct PortDaemon {
    config: PortdConfig,
    config_path: Option<PathBuf>,
    dispatcher: PortDispatcher<MsTimer>,
}

impl PortDaemon {
    /// Validates `config` and registers the compiled-in transports.
    ///
    /// The configured variant is selected but not initialized; call
    /// [`start`](Self::start) for that.
    pub fn new(config: PortdConfig) -> Result<Self> {
        config.validate()?;
        let registry = links::build_registry(&config)?;
        let scheduler = TaskScheduler::with_timer(MsTimer::new(), config.port.task_interval_ms);
        let dispatcher =
            PortDispatcher::with_scheduler(registry, scheduler).with_selected(config.port.variant);
        Ok(Self {
            config,
            config_path: None,
            dispatcher,
        })
    }

    /// Remembers the file to re-read on reload.
    pub fn with_config_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Brings up the selected port.
    ///
    /// On failure the daemon keeps running with the link down; a reload
    /// retries.
    pub fn start(&mut self) -> PortResult<()> {
        let variant = self.dispatcher.selected();
        let result = self.dispatcher.init();
        match &result {
            Ok(()) => info!("Datalink port {} ({}) is up", variant, variant.description()),
            Err(e) => error!("Datalink port {} failed to start, link is down: {}", variant, e),
        }
        result
    }

    /// One cooperative cycle of the scheduler shell.
    pub fn poll(&mut self) -> Option<u32> {
        self.dispatcher.poll()
    }

    /// Re-reads the configuration file and switches ports if needed.
    ///
    /// The switch also happens when the selection is unchanged but the link
    /// is down, which is how a failed start or switch is retried. Only the
    /// variant selection takes effect; intervals and transport settings are
    /// fixed at startup.
    #[instrument(skip(self))]
    pub fn reload(&mut self) -> Result<()> {
        let Some(path) = &self.config_path else {
            debug!("No config file to reload");
            return Ok(());
        };
        let config = PortdConfig::load_or_default(path)?;
        config.validate()?;

        if config.port.task_interval_ms != self.dispatcher.interval_ms() {
            warn!(
                "task_interval_ms change to {} ignored until restart",
                config.port.task_interval_ms
            );
        }

        let requested = config.port.variant;
        let current = self.dispatcher.selected();
        if requested != current || !self.dispatcher.is_link_up() {
            info!("Switching datalink port {} -> {}", current, requested);
            self.dispatcher.set_port(requested)?;
            if self.dispatcher.is_link_up() {
                info!("Datalink port {} is up", requested);
            } else {
                warn!("Datalink port {} is selected but the link is down", requested);
            }
        }
        self.config = config;
        Ok(())
    }

    /// Tears down the active port.
    pub fn shutdown(&mut self) -> PortResult<()> {
        info!("Shutting down datalink port {}", self.dispatcher.selected());
        self.dispatcher.deinit()
    }

    /// Runs the main loop until `shutdown` completes.
    ///
    /// The scheduler is polled every `poll_interval_ms`. On unix, SIGHUP
    /// triggers [`reload`](Self::reload).
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        info!(
            "Starting event loop with {}ms poll interval",
            self.config.port.poll_interval_ms
        );
        let mut ticker = tokio::time::interval(self.config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        #[cfg(unix)]
        let mut hangup =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::hangup())?;

        tokio::pin!(shutdown);
        loop {
            #[cfg(unix)]
            tokio::select! {
                _ = ticker.tick() => {
                    self.poll();
                }
                _ = hangup.recv() => {
                    info!("SIGHUP received, reloading configuration");
                    if let Err(e) = self.reload() {
                        error!("Reload failed: {}", e);
                    }
                }
                () = &mut shutdown => break,
            }

            #[cfg(not(unix))]
            tokio::select! {
                _ = ticker.tick() => {
                    self.poll();
                }
                () = &mut shutdown => break,
            }
        }
        Ok(())
    }

    pub fn dispatcher(&self) -> &PortDispatcher<MsTimer> {
        &self.dispatcher
    }

    pub fn config(&self) -> &PortdConfig {
        &self.config
    }
}

/// Completes on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(e) => {
                warn!("Cannot listen for SIGTERM: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
