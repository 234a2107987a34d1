//! Error taxonomy for the effect. Everything here degrades the effect,
//! never the host: only context creation aborts initialization.

use std::fmt;

#[derive(Debug)]
pub enum FluidError {
    /// No usable GPU adapter, device, or surface. The effect cannot start;
    /// the host keeps running without it.
    ContextCreation(String),
    /// A shader failed to compile or a program failed to link. The owning
    /// pass is skipped until a variant compiles.
    ShaderCompile {
        label: &'static str,
        message: String,
    },
    /// A capability probe found nothing usable to downgrade to.
    Capability(String),
    /// Frame capture or field readback failed.
    Capture(String),
}

impl fmt::Display for FluidError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FluidError::ContextCreation(msg) => write!(f, "GPU context creation failed: {msg}"),
            FluidError::ShaderCompile { label, message } => {
                write!(f, "shader '{label}' failed to compile: {message}")
            }
            FluidError::Capability(msg) => write!(f, "capability unsupported: {msg}"),
            FluidError::Capture(msg) => write!(f, "frame capture failed: {msg}"),
        }
    }
}

impl std::error::Error for FluidError {}
