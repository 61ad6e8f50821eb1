/// Errors surfaced by the kernels and their parameter helpers.
///
/// Shape and buffer-length mismatches are not checked here; the calling
/// tensor layer validates those before dispatch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KernelError {
    /// Data-dependent index kernels only accept row-major operands.
    #[error("{op}: strided layout is not supported, make the operands contiguous first")]
    UnsupportedLayout { op: &'static str },

    #[error("invalid kernel configuration: {0}")]
    InvalidConfig(String),
}

impl KernelError {
    pub fn unsupported_layout(op: &'static str) -> Self {
        KernelError::UnsupportedLayout { op }
    }
}
