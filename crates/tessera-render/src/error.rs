//! Error types for the render pipeline.

use std::fmt;

use tessera_core::ecs::Entity;

use crate::batch::MaterialKind;

/// Errors that can occur while preparing or submitting a frame.
#[derive(Debug)]
pub enum RenderError {
    /// No suitable GPU adapter was available.
    AdapterUnavailable,

    /// Device creation failed.
    DeviceRequest {
        /// The underlying wgpu error.
        source: wgpu::RequestDeviceError,
    },

    /// A material the frame needs is not registered.
    MaterialMissing {
        /// The material that was looked up.
        kind: MaterialKind,
    },

    /// An entity tagged for rendering is missing a component the pass requires.
    MissingComponent {
        /// The entity in question.
        entity: Entity,
        /// The component type name.
        component: &'static str,
    },
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::AdapterUnavailable => {
                write!(f, "No compatible GPU adapter found")
            }
            RenderError::DeviceRequest { source } => {
                write!(f, "Failed to acquire GPU device: {}", source)
            }
            RenderError::MaterialMissing { kind } => {
                write!(f, "Material not registered: {:?}", kind)
            }
            RenderError::MissingComponent { entity, component } => {
                write!(
                    f,
                    "Entity {:?} is tagged for rendering but lacks {}",
                    entity, component
                )
            }
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::DeviceRequest { source } => Some(source),
            _ => None,
        }
    }
}

pub type RenderResult<T> = Result<T, RenderError>;
