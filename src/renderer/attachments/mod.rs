pub mod depth;
pub mod msaa;
pub mod shadow_map;
