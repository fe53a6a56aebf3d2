use ember_core::{BundleError, EntityId};

/// Which module namespace an operation targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    Component,
    Control,
}

impl std::fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModuleKind::Component => f.write_str("component"),
            ModuleKind::Control => f.write_str("control"),
        }
    }
}

/// Contract violations raised by entity module management.
///
/// Every error is raised before any mutation happens, so a failed call leaves the
/// entity exactly as it was.
#[derive(Debug, thiserror::Error)]
pub enum EntityError {
    #[error("entity already has {kind} {name}")]
    DuplicateModule { kind: ModuleKind, name: String },

    #[error("anonymous {kind} type cannot be attached: {name}")]
    AnonymousModule { kind: ModuleKind, name: String },

    #[error("missing required module: [{required}] by: {by}")]
    MissingDependency { required: String, by: String },

    #[error("core component {0} cannot be removed")]
    ProtectedModule(String),

    #[error("Required component: [{required}] by: {by}")]
    InUse { required: String, by: String },

    #[error("cannot modify controls of {0} while its controls are updating")]
    ConcurrentModification(String),

    #[error("{kind} {name} not found")]
    NotFound { kind: ModuleKind, name: String },

    #[error("control {0} is executing and cannot be borrowed")]
    ModuleBusy(String),

    #[error(transparent)]
    Bundle(#[from] BundleError),
}

/// Errors raised by the world's entity collection.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    #[error("entity {0} is already in the world")]
    DuplicateEntity(EntityId),

    #[error("entity {0} is not in the world")]
    EntityNotFound(EntityId),
}
