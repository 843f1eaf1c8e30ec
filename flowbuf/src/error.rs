use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowBufError {
    #[error("ring queue needs at least one slot")]
    ZeroCapacity,

    #[error("capacity {requested} exceeds the largest supported ring ({max} slots)")]
    CapacityTooLarge { requested: usize, max: usize },
}
