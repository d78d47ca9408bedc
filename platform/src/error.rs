//! Bring-up error taxonomy.

use platform_drivers::DriverError;

/// Errors surfaced to the firmware runtime during bring-up.
///
/// The runtime decides fatal-vs-continue policy: a failure on the cold
/// hart leaves a shared device uninitialized and should take the whole
/// system down; a failure on a warm hart means that hart alone failed to
/// join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    /// A backend's cold or warm init did not succeed.
    #[error("device initialization failed: {0}")]
    DeviceInit(DriverError),

    /// A backend was asked for more capacity than the device supports.
    #[error("device capacity exceeded: {0}")]
    ResourceExhausted(DriverError),

    /// An operation was invoked in the wrong boot-kind context. The
    /// sequencer never triggers this by construction; it exists for
    /// runtime callers that drive the operations table directly.
    #[error("operation not applicable in this boot context")]
    NotApplicable,
}

impl From<DriverError> for PlatformError {
    fn from(err: DriverError) -> Self {
        if err.is_capacity() {
            Self::ResourceExhausted(err)
        } else {
            Self::DeviceInit(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_errors_map_to_resource_exhausted() {
        let err = DriverError::TooManySources { requested: 2000, supported: 1023 };
        assert_eq!(PlatformError::ResourceExhausted(err), err.into());
    }

    #[test]
    fn lifecycle_errors_map_to_device_init() {
        assert_eq!(
            PlatformError::DeviceInit(DriverError::NotReady),
            DriverError::NotReady.into()
        );
        assert_eq!(
            PlatformError::DeviceInit(DriverError::AlreadyInitialized),
            DriverError::AlreadyInitialized.into()
        );
    }
}
