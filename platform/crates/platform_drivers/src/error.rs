//! Backend initialization and operation errors.

/// Errors reported by the device backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DriverError {
    /// Cold init was entered a second time for the same device.
    #[error("device has already been cold-initialized")]
    AlreadyInitialized,

    /// A per-hart or stateless operation ran before cold init completed.
    #[error("device cold init has not completed")]
    NotReady,

    /// More interrupt sources requested than the device supports.
    #[error("requested {requested} interrupt sources, device supports {supported}")]
    TooManySources { requested: u32, supported: u32 },

    /// More delivery contexts requested than the device supports.
    #[error("requested {requested} delivery contexts, device supports {supported}")]
    TooManyContexts { requested: u32, supported: u32 },

    /// More harts requested than the device register layout can address.
    #[error("requested {requested} harts, device supports {supported}")]
    TooManyHarts { requested: u32, supported: u32 },

    /// A delivery context id outside the configured capacity.
    #[error("delivery context {context} out of range (capacity {capacity})")]
    ContextOutOfRange { context: u32, capacity: u32 },

    /// A hart id outside the configured hart count.
    #[error("hart {hart} out of range (hart count {hart_count})")]
    HartOutOfRange { hart: u32, hart_count: u32 },

    /// A register width the device model does not support.
    #[error("unsupported register width {0}")]
    UnsupportedRegisterWidth(u32),
}

impl DriverError {
    /// Whether this error reports a capacity limit rather than a broken
    /// init sequence.
    #[must_use]
    pub fn is_capacity(&self) -> bool {
        matches!(
            self,
            Self::TooManySources { .. }
                | Self::TooManyContexts { .. }
                | Self::TooManyHarts { .. }
                | Self::ContextOutOfRange { .. }
                | Self::HartOutOfRange { .. }
        )
    }
}
