use shared::ColonyId;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum GardenError {
    #[error("all {0} colony slots are taken")]
    NoColonySlot(usize),
    #[error("no free spot for a colony was found")]
    NoPlacement,
    #[error("colony {0} does not exist")]
    UnknownColony(ColonyId),
    #[error("position ({x}, {y}) is outside the garden")]
    OutOfBounds { x: f32, y: f32 },
    #[error("{name} cannot be set to {value}")]
    InvalidValue { name: &'static str, value: f32 },
}

#[derive(Debug, Error, PartialEq)]
pub enum SnapshotError {
    #[error("garden size {width}x{height} is below the {min} unit minimum")]
    InvalidDimensions { width: u32, height: u32, min: u32 },
    #[error("{field} field holds {actual} cells, expected {expected}")]
    FieldLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("{field} field has an invalid value at cell {index}")]
    InvalidCell { field: &'static str, index: usize },
    #[error("snapshot holds {0} colonies, more than fit in the occupancy masks")]
    TooManyColonies(usize),
    #[error("colony {index} is invalid: {reason}")]
    InvalidColony { index: usize, reason: &'static str },
}
