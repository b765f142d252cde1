//! Bus configuration

/// Default subscriber count per channel above which a leak warning is logged
pub const DEFAULT_HIGH_WATER_MARK: usize = 2048;

/// Runtime options for an [`crate::EventBus`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusConfig {
    /// Subscriber count per channel that triggers a leak warning
    pub high_water_mark: usize,
    /// Log every dispatch and every invoked subscriber
    pub debug: bool,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            high_water_mark: DEFAULT_HIGH_WATER_MARK,
            debug: false,
        }
    }
}

impl BusConfig {
    #[must_use]
    pub fn with_high_water_mark(mut self, high_water_mark: usize) -> Self {
        self.high_water_mark = high_water_mark;
        self
    }

    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}
