pub mod camera;
pub mod lights;
pub mod object;
pub mod shadow_view;
pub mod skinning;
