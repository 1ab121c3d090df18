use service_core::error::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Organization not found")]
    OrganizationNotFound,

    #[error("Group not found")]
    GroupNotFound,

    #[error("Role not found")]
    RoleNotFound,

    #[error("Membership not found")]
    MembershipNotFound,

    #[error("Role assignment not found")]
    AssignmentNotFound,

    #[error("Name already in use: {0}")]
    NameConflict(String),

    #[error("Parent not found")]
    ParentNotFound,

    #[error("Parent is not active")]
    ParentInactive,

    #[error("Hierarchy change would create a cycle")]
    CircularHierarchy,

    #[error("Cannot delete organization with child organizations")]
    HasChildOrganizations,

    #[error("Cannot delete organization with active groups")]
    HasActiveGroups,

    #[error("Cannot deactivate while active children exist")]
    HasActiveChildren,

    #[error("Already deleted")]
    AlreadyDeleted,

    #[error("Duplicate active assignment")]
    DuplicateAssignment,

    #[error("starts_at must be before ends_at")]
    InvalidTimeRange,

    #[error("Unsupported invalidation event type: {0}")]
    UnsupportedEventType(String),

    #[error("Invalid invalidation event: {0}")]
    InvalidEvent(String),

    #[error("Store error: {0}")]
    Store(anyhow::Error),

    #[error("Cache error: {0}")]
    Cache(anyhow::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(e) => AppError::BadRequest(anyhow::anyhow!(e)),
            ServiceError::OrganizationNotFound
            | ServiceError::GroupNotFound
            | ServiceError::RoleNotFound
            | ServiceError::MembershipNotFound
            | ServiceError::AssignmentNotFound
            | ServiceError::ParentNotFound => AppError::NotFound(anyhow::anyhow!(err.to_string())),
            ServiceError::NameConflict(_)
            | ServiceError::DuplicateAssignment
            | ServiceError::AlreadyDeleted => AppError::Conflict(anyhow::anyhow!(err.to_string())),
            ServiceError::ParentInactive
            | ServiceError::CircularHierarchy
            | ServiceError::HasChildOrganizations
            | ServiceError::HasActiveGroups
            | ServiceError::HasActiveChildren
            | ServiceError::InvalidTimeRange
            | ServiceError::UnsupportedEventType(_)
            | ServiceError::InvalidEvent(_) => {
                AppError::BadRequest(anyhow::anyhow!(err.to_string()))
            }
            ServiceError::Store(e) => AppError::DatabaseError(e),
            ServiceError::Cache(e) => AppError::InternalError(e),
            ServiceError::Internal(e) => AppError::InternalError(e),
        }
    }
}
