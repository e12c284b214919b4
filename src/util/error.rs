//! Error types for the ray tracer core.

use thiserror::Error;

use crate::gpu::uniforms::UniformKind;

/// Main error type for renderer operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Uniform name not present in the program's parameter block
    #[error("Unknown uniform `{name}` for {program} program")]
    UnknownUniform { program: &'static str, name: String },

    /// Uniform exists but was written with a value of another kind
    #[error("Uniform `{name}` is {expected:?}, got {actual:?}")]
    UniformKindMismatch {
        name: String,
        expected: UniformKind,
        actual: UniformKind,
    },

    /// Storage slot re-bound with a different byte size
    #[error("Storage slot {slot} holds {expected} bytes, re-bind with {actual} bytes is unsupported")]
    SlotSizeMismatch { slot: u32, expected: u64, actual: u64 },

    /// Payload is not a whole number of elements for its slot
    #[error("Storage slot {slot} payload of {len} bytes is not a multiple of its {stride}-byte element")]
    MisalignedPayload { slot: u32, len: u64, stride: u64 },

    /// A slot from the binding table has no buffer yet
    #[error("Storage slot {0} has not been uploaded")]
    MissingSlot(u32),

    /// Slot index not present in the static binding table
    #[error("Binding slot {0} is not part of the slot table")]
    UnknownSlot(u32),

    /// Two render targets were assigned the same unit
    #[error("{first} and {second} share {kind} unit {unit}")]
    TextureUnitConflict {
        kind: &'static str,
        unit: u32,
        first: &'static str,
        second: &'static str,
    },

    /// Display pass tried to sample the target while a compute write is in flight
    #[error("Render target sampled before the compute barrier was issued")]
    ReadBeforeBarrier,

    /// Operation not allowed in the current orchestrator state
    #[error("Invalid orchestrator state: expected {expected}, found {found}")]
    InvalidState {
        expected: &'static str,
        found: &'static str,
    },

    /// eframe was started without a wgpu render state
    #[error("No wgpu render state available (is the wgpu renderer enabled?)")]
    NoRenderState,

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

/// Result type alias for renderer operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::SlotSizeMismatch { slot: 10, expected: 160, actual: 16 };
        let msg = e.to_string();
        assert!(msg.contains("10"));
        assert!(msg.contains("160"));
        assert!(msg.contains("16 bytes"));

        let e = Error::UnknownUniform { program: "compute", name: "fov".into() };
        assert!(e.to_string().contains("`fov`"));
    }

    #[test]
    fn test_unit_conflict_names_both_targets() {
        let e = Error::TextureUnitConflict {
            kind: "image",
            unit: 0,
            first: "render_target",
            second: "debug_target",
        };
        let msg = e.to_string();
        assert!(msg.contains("render_target"));
        assert!(msg.contains("debug_target"));
    }
}
