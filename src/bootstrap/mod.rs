//! Generic bootstrap orchestration.
//!
//! # Data Flow
//! ```text
//! Settings
//!     → ApplicationBootstrapper::new (instrument box seeded per kind)
//!     → configure_application / configure_instrument(s)   (any order)
//!     → bootstrap():
//!         per ready instrument: bootstrap + merge bootstrap_before
//!         merge framework bootstrap_before
//!         F::build(config)
//!         per ready instrument: bootstrap_after (threaded)
//!         F::bootstrap_after
//!     → (application, TeardownHandle)
//!
//! At shutdown: TeardownHandle::teardown() per instrument, in order.
//! ```
//!
//! Lifecycle is enforced by ownership: `bootstrap` consumes the
//! bootstrapper, so it cannot run twice and instruments cannot be
//! reconfigured after the application exists.

pub mod axum;

use tracing::debug;

use crate::console::ConsoleWriter;
use crate::error::BootstrapError;
use crate::instruments::{Instrument, InstrumentBox, InstrumentConfig, InstrumentFactory};

/// Minimal view of the settings every bootstrapper needs.
pub trait BootstrapSettings {
    /// Whether instrument status lines are printed during bootstrap.
    fn service_debug(&self) -> bool;
}

/// Application configuration under accumulation.
pub trait ApplicationConfig: Default + Send {
    /// Record merge used by `configure_application`: non-default patch
    /// fields replace the current value. Merging a config with itself is
    /// idempotent.
    #[must_use]
    fn merge_overrides(self, patch: Self) -> Self;

    /// Accumulating merge used during the bootstrap pass: collection
    /// fields extend in contribution order, scalar fields override.
    #[must_use]
    fn merge_contribution(self, contribution: Self) -> Self;
}

/// One target web framework: the types the bootstrapper is generic over,
/// its default instrument set, and its own injection hooks.
pub trait Framework: Sized + 'static {
    type Settings: BootstrapSettings;
    type Config: ApplicationConfig;
    type Application;

    /// Instrument factories registered for this framework, in report order.
    fn instruments() -> Vec<InstrumentFactory<Self>>;

    /// Construct the application from the final merged configuration.
    fn build(config: Self::Config) -> Self::Application;

    /// Framework-specific additions merged on top of the instrument
    /// contributions, right before construction.
    fn bootstrap_before(_settings: &Self::Settings) -> Self::Config {
        Self::Config::default()
    }

    /// Framework-specific adjustments to the constructed application.
    fn bootstrap_after(application: Self::Application) -> Self::Application {
        application
    }
}

/// Orchestrator that turns settings + instruments into an application.
pub struct ApplicationBootstrapper<F: Framework> {
    settings: F::Settings,
    application_config: F::Config,
    instrument_box: InstrumentBox<F>,
    console_writer: ConsoleWriter,
}

impl<F: Framework> ApplicationBootstrapper<F> {
    /// Bootstrapper with the framework's default instrument set, each
    /// instrument seeded from the settings object.
    pub fn new(settings: F::Settings) -> Self {
        let instrument_box = InstrumentBox::initialize(&F::instruments(), &settings);
        Self::from_parts(settings, instrument_box)
    }

    /// Bootstrapper over a custom instrument box (possibly
    /// [`InstrumentBox::empty`]).
    pub fn from_parts(settings: F::Settings, instrument_box: InstrumentBox<F>) -> Self {
        let console_writer = ConsoleWriter::new(settings.service_debug());
        Self {
            settings,
            application_config: F::Config::default(),
            instrument_box,
            console_writer,
        }
    }

    /// Replace the status reporter (tests, alternate streams).
    pub fn with_console_writer(mut self, writer: ConsoleWriter) -> Self {
        self.console_writer = writer;
        self
    }

    /// Merge a partial application config; non-default fields win.
    pub fn configure_application(mut self, config: F::Config) -> Self {
        self.application_config = self.application_config.merge_overrides(config);
        self
    }

    /// Merge a partial config into the instrument of the matching kind.
    pub fn configure_instrument(mut self, config: impl Into<InstrumentConfig>) -> Self {
        self.instrument_box.configure_instrument(config.into());
        self
    }

    /// Merge several partial instrument configs, in order.
    pub fn configure_instruments(
        mut self,
        configs: impl IntoIterator<Item = InstrumentConfig>,
    ) -> Self {
        for config in configs {
            self.instrument_box.configure_instrument(config);
        }
        self
    }

    /// Register an additional instrument, replacing any earlier one of the
    /// same kind.
    pub fn with_instrument(mut self, factory: InstrumentFactory<F>) -> Self {
        self.instrument_box.extend(factory, &self.settings);
        self
    }

    pub fn settings(&self) -> &F::Settings {
        &self.settings
    }

    pub fn instrument_box(&self) -> &InstrumentBox<F> {
        &self.instrument_box
    }

    /// Drive the bootstrap pass and construct the application.
    ///
    /// Single linear pass: ready instruments bootstrap and contribute
    /// config parts in registration order (status is reported for every
    /// instrument regardless of readiness), the framework hook merges on
    /// top, the application is built, and ready instruments then wrap it
    /// in the same order. Errors propagate immediately.
    pub fn bootstrap(mut self) -> Result<(F::Application, TeardownHandle<F>), BootstrapError> {
        let mut config = self.application_config;
        let mut instruments = self.instrument_box.into_instruments();
        debug!(instruments = instruments.len(), "bootstrap pass started");

        for instrument in &mut instruments {
            if instrument.is_ready() {
                instrument.bootstrap()?;
                config = config.merge_contribution(instrument.bootstrap_before());
            }
            instrument.write_status(&mut self.console_writer);
        }

        let config = config.merge_contribution(F::bootstrap_before(&self.settings));
        let mut application = F::build(config);

        for instrument in &mut instruments {
            if instrument.is_ready() {
                application = instrument.bootstrap_after(application);
            }
        }

        Ok((
            F::bootstrap_after(application),
            TeardownHandle { instruments },
        ))
    }

    /// Tear down a bootstrapper that never bootstrapped. Each instrument's
    /// teardown is a no-op before bootstrap.
    pub fn teardown(self) {
        let mut instruments = self.instrument_box.into_instruments();
        for instrument in &mut instruments {
            instrument.teardown();
        }
    }
}

/// Owner of the bootstrapped instruments. Tears them down in registration
/// order, ignoring readiness, once, at end of process lifetime.
pub struct TeardownHandle<F: Framework> {
    instruments: Vec<Box<dyn Instrument<F>>>,
}

impl<F: Framework> TeardownHandle<F> {
    /// Release every instrument's global resources.
    pub fn teardown(mut self) {
        for instrument in &mut self.instruments {
            instrument.teardown();
        }
    }
}
