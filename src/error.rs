use thiserror::Error;

use crate::material::MaterialId;

#[derive(Debug, Error)]
pub enum LabError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
    #[error("no material selected")]
    NoSelection,
    #[error("no material with id {0} in the inventory")]
    UnknownMaterial(MaterialId),
    #[error("invalid setting: {0}")]
    InvalidSetting(String),
    #[error("catalog error: {0}")]
    Catalog(String),
}

pub type LabResult<T> = Result<T, LabError>;
