use log::info;
use winit::event_loop::{ControlFlow, EventLoop};

use crate::{app::App, config::DemoConfig, errors::Result, scene_tree::Scene};

pub mod app;
pub mod camera;
pub mod clock;
pub mod config;
pub mod errors;
pub mod glb;
pub mod logging;
pub mod renderer;
pub mod rig;
pub mod scene_tree;

/// Rounds up to the 256 byte dynamic uniform offset alignment.
pub const fn align_to_256(n: usize) -> usize {
    (n + 255) & !255
}

/// Builds the scene and loads the asset into it. The named mesh gets the
/// skinning material when the asset carries baked rig data.
pub fn load_scene(config: &DemoConfig) -> Result<Scene> {
    let mut scene = Scene::build(config);
    let model = glb::load_model(&config.asset_path, &config.mesh_name)?;
    scene.append_model(&model);
    let skinned = scene.bind_skinning(&config.mesh_name, model.rig.as_ref());
    info!(
        "scene has {} node(s), `{}` skinned: {skinned}",
        scene.nodes.len(),
        config.mesh_name
    );
    Ok(scene)
}

pub fn run(config: DemoConfig) -> Result<()> {
    let scene = load_scene(&config)?;
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);
    let mut app = App::new(config, scene);
    event_loop.run_app(&mut app)?;
    match app.failure.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aligns_to_256() {
        assert_eq!(align_to_256(0), 0);
        assert_eq!(align_to_256(1), 256);
        assert_eq!(align_to_256(256), 256);
        assert_eq!(align_to_256(257), 512);
    }
}
