//! Solver error types

/// Errors surfaced by the GI runtime.
///
/// Lifecycle misuse (stepping or disposing with no world built) is an
/// explicit error rather than a silent no-op so integration bugs show up
/// at the call site.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GiError {
    /// No GI world exists yet
    #[error("no GI world exists - call build_world() first")]
    NoWorld,

    /// A single shape's sub-textures exceed an empty atlas
    #[error("shape {shape} does not fit an empty {max_dim}x{max_dim} atlas")]
    PackingFailed { shape: usize, max_dim: u32 },

    /// Settings rejected during world construction
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}
