//! Backend capability flags.

/// What a reporter can do. Callers can check this before building expensive
/// tag sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    reporting: bool,
    tagging: bool,
}

impl Capabilities {
    /// No active reporting, no tags. What a no-op backend advertises.
    pub const NONE: Capabilities = Capabilities::new(false, false);

    pub const fn new(reporting: bool, tagging: bool) -> Self {
        Self { reporting, tagging }
    }

    /// Whether the reporter actively reports values.
    pub fn reporting(&self) -> bool {
        self.reporting
    }

    /// Whether the reporter keeps tags on metrics.
    pub fn tagging(&self) -> bool {
        self.tagging
    }
}
