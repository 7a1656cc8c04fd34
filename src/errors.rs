//! Error types shared by the demo and the `bake_rig` tool.
//!
//! Only start-up and tooling failures are errors. Missing skinning metadata
//! is not: the named mesh simply keeps its standard material.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DemoError {
    /// No adapter compatible with the window surface.
    #[error("failed to request wgpu adapter: {0}")]
    AdapterRequest(#[from] wgpu::RequestAdapterError),

    #[error("failed to create wgpu device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    #[error("failed to create window surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    /// The surface reports no usable texture format.
    #[error("surface is not supported by the selected adapter")]
    UnsupportedSurface,

    #[error("shader `{slot}` failed to compile: {message}")]
    Shader { slot: String, message: String },

    /// The surface can't hand out frames anymore.
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("glTF error: {0}")]
    Gltf(#[from] gltf::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Bad command line flag or config file value.
    #[error("config error: {0}")]
    Config(String),

    /// The input asset can't be baked into skinning metadata.
    #[error("bake error: {0}")]
    Bake(String),
}

pub type Result<T> = std::result::Result<T, DemoError>;
