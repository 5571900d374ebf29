use crate::catalog::SegmentId;

/// Errors from building or driving the streaming window.
///
/// Every variant except `AgentUnavailable` is a construction-time failure:
/// the window refuses to exist rather than stream a broken world.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("segment catalog is empty")]
    EmptyCatalog,
    #[error(
        "segment {id} has non-positive dimensions (width={width}, height={height}, length={length})"
    )]
    InvalidDescriptor {
        id: SegmentId,
        width: f32,
        height: f32,
        length: f32,
    },
    #[error("segment {0} is registered twice")]
    DuplicateDescriptor(SegmentId),
    #[error("starter segment {0} is not in the catalog")]
    UnknownStarter(SegmentId),
    #[error("invalid stream config: {0}")]
    InvalidConfig(String),
    #[error("agent signal unavailable")]
    AgentUnavailable,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
