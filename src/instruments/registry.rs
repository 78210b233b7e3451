//! Instrument registry.
//!
//! Holds the instruments active for one bootstrapper, unique by kind.
//! Insertion order determines bootstrap and report order. Registering a
//! kind that is already present replaces the earlier instance (removed,
//! re-appended at the end).

use tracing::warn;

use crate::bootstrap::Framework;

use super::{Instrument, InstrumentConfig, InstrumentKind};

/// Constructor for one instrument kind, seeded from the settings object.
pub struct InstrumentFactory<F: Framework> {
    pub kind: InstrumentKind,
    pub construct: fn(&F::Settings) -> Box<dyn Instrument<F>>,
}

impl<F: Framework> Clone for InstrumentFactory<F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<F: Framework> Copy for InstrumentFactory<F> {}

/// Set of instrument instances, one per registered kind.
pub struct InstrumentBox<F: Framework> {
    instruments: Vec<Box<dyn Instrument<F>>>,
}

impl<F: Framework> Default for InstrumentBox<F> {
    fn default() -> Self {
        Self {
            instruments: Vec::new(),
        }
    }
}

impl<F: Framework> InstrumentBox<F> {
    /// A box with no instruments, for callers assembling their own set.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Box over already-constructed instruments. The caller keeps kinds
    /// unique.
    pub(crate) fn from_instruments(instruments: Vec<Box<dyn Instrument<F>>>) -> Self {
        Self { instruments }
    }

    /// Construct an instance per factory, seeding each config from the
    /// settings object.
    pub fn initialize(factories: &[InstrumentFactory<F>], settings: &F::Settings) -> Self {
        Self {
            instruments: factories
                .iter()
                .map(|factory| (factory.construct)(settings))
                .collect(),
        }
    }

    /// Register a new kind into the active set, replacing any earlier
    /// instrument of the same kind.
    pub fn extend(&mut self, factory: InstrumentFactory<F>, settings: &F::Settings) {
        self.instruments
            .retain(|instrument| instrument.kind() != factory.kind);
        self.instruments.push((factory.construct)(settings));
    }

    /// Locate the instrument matching the config's kind and merge. Unknown
    /// kinds only occur with pruned boxes and are ignored.
    pub fn configure_instrument(&mut self, config: InstrumentConfig) {
        let kind = config.kind();
        match self
            .instruments
            .iter_mut()
            .find(|instrument| instrument.kind() == kind)
        {
            Some(instrument) => instrument.configure(config),
            None => warn!(%kind, "no instrument registered for kind, config ignored"),
        }
    }

    /// Active instruments in registration order.
    pub fn instruments(&self) -> &[Box<dyn Instrument<F>>] {
        &self.instruments
    }

    pub(crate) fn into_instruments(self) -> Vec<Box<dyn Instrument<F>>> {
        self.instruments
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }
}
