use thiserror::Error;

use crate::vm::ObjectId;

/// Failures reported back to the kernel-call layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GfxError {
    /// A call referenced a plane that is not in the active list.
    #[error("plane {0} is not present in the active planes list")]
    PlaneNotFound(ObjectId),

    #[error("screen item {item} not found in plane {plane}")]
    ScreenItemNotFound { plane: ObjectId, item: ObjectId },

    /// View or picture resource unknown to the cel provider.
    #[error("{kind} resource {id} not found")]
    ResourceNotFound { kind: &'static str, id: i32 },

    /// `seconds * 60` rounded over the divisions came out as zero ticks.
    #[error("show style has no duration")]
    NoDuration,

    #[error("unsupported show style {0}")]
    UnsupportedShowStyle(i16),

    #[error("invalid scroll on plane {plane}: {reason}")]
    InvalidScroll {
        plane: ObjectId,
        reason: &'static str,
    },
}
