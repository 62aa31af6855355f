use thiserror::Error;

// --- Error Type ---
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnimationError {
    #[error("model hierarchy '{0}' not found")]
    MissingHierarchy(String),
    #[error("animation data '{animation}' not found for model script '{script}'")]
    MissingAnimation { script: String, animation: String },
    #[error(
        "animation '{animation}' has {actual} samples, expected {expected} ({frames} frames x {bones} bones)"
    )]
    SampleCountMismatch {
        animation: String,
        actual: usize,
        expected: usize,
        frames: u32,
        bones: usize,
    },
    #[error("animation '{animation}' has invalid frame rate {fps}")]
    InvalidFrameRate { animation: String, fps: f32 },
    #[error("animation '{0}' has no frames")]
    EmptyAnimation(String),
    #[error("animation '{animation}' references node {node} outside of hierarchy '{hierarchy}'")]
    InvalidNodeIndex {
        animation: String,
        hierarchy: String,
        node: u32,
    },
    #[error("npc handle {0:?} is not registered")]
    UnknownNpc(crate::npc::registry::NpcHandle),
    #[error("way point '{0}' not found")]
    UnknownWayPoint(String),
}

// Define a crate-wide Result type alias
pub type Result<T> = std::result::Result<T, AnimationError>;
