pub mod attachments;
pub mod bindgroups;
pub mod buffers;
pub mod pipelines;
pub mod prepare;
pub mod renderer;
pub mod shader_cache;
pub mod shadow;
pub mod utils;
pub mod wgpu_context;
pub use renderer::*;
