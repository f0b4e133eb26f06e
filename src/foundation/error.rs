/// Convenience result type used across the engine.
pub type EngineResult<T> = Result<T, EngineError>;

/// Top-level error taxonomy used by engine APIs.
///
/// Verification mismatches on exported artifacts are deliberately NOT part of
/// this taxonomy: they are non-fatal and surface as warnings on the artifact.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    /// An image or video source failed to load or decode.
    #[error("resource load failure: {0}")]
    ResourceLoad(String),

    /// An operation required a selected node of a given variant and none was present.
    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    /// An animation was applied with no target node selected.
    #[error("animation target missing: {0}")]
    AnimationTarget(String),

    /// An external collaborator (trim/inpaint/background-removal/save) failed.
    #[error("external service failure: {0}")]
    ExternalService(String),

    /// Invalid user-provided data or violated engine limits.
    #[error("validation error: {0}")]
    Validation(String),

    /// Errors while compositing or encoding a frame.
    #[error("render error: {0}")]
    Render(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EngineError {
    /// Build a [`EngineError::ResourceLoad`] value.
    pub fn resource_load(msg: impl Into<String>) -> Self {
        Self::ResourceLoad(msg.into())
    }

    /// Build a [`EngineError::InvalidSelection`] value.
    pub fn invalid_selection(msg: impl Into<String>) -> Self {
        Self::InvalidSelection(msg.into())
    }

    /// Build a [`EngineError::AnimationTarget`] value.
    pub fn animation_target(msg: impl Into<String>) -> Self {
        Self::AnimationTarget(msg.into())
    }

    /// Build a [`EngineError::ExternalService`] value.
    pub fn external_service(msg: impl Into<String>) -> Self {
        Self::ExternalService(msg.into())
    }

    /// Build a [`EngineError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`EngineError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
