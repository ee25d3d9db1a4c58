use serde::Serialize;
use thiserror::Error;

use crate::models::{LinkKind, PortStatus};

/// Error returned by every connectivity operation
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Validation(String),

    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    #[error("switch port {port_id} is not free (status: {status})")]
    PortNotFree { port_id: i64, status: PortStatus },

    #[error("equipment {equipment_id} is already connected through {link}")]
    EquipmentAlreadyConnected { equipment_id: i64, link: LinkKind },

    #[error("patch port {patch_port_id} is already occupied by equipment {equipment_id}")]
    PatchPortOccupied { patch_port_id: i64, equipment_id: i64 },

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    State(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Coarse error taxonomy exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    State,
    Internal,
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::PortNotFree { .. }
            | Self::EquipmentAlreadyConnected { .. }
            | Self::PatchPortOccupied { .. }
            | Self::Conflict(_) => ErrorKind::Conflict,
            Self::State(_) => ErrorKind::State,
            Self::Storage(_) => ErrorKind::Internal,
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(err.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
