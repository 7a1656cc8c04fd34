use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::{DemoError, Result};

/// Graphics backend request. `webgpu` and `webgl` mirror the engine switch of
/// the browser build; the rest name a native backend directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Auto,
    WebGpu,
    WebGl,
    Vulkan,
    Metal,
    Dx12,
}

impl Backend {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "auto" => Some(Backend::Auto),
            "webgpu" => Some(Backend::WebGpu),
            "webgl" | "gl" => Some(Backend::WebGl),
            "vulkan" => Some(Backend::Vulkan),
            "metal" => Some(Backend::Metal),
            "dx12" => Some(Backend::Dx12),
            _ => None,
        }
    }

    pub fn to_wgpu(self) -> wgpu::Backends {
        match self {
            Backend::Auto => wgpu::Backends::all(),
            Backend::WebGpu => wgpu::Backends::PRIMARY,
            Backend::WebGl => wgpu::Backends::GL,
            Backend::Vulkan => wgpu::Backends::VULKAN,
            Backend::Metal => wgpu::Backends::METAL,
            Backend::Dx12 => wgpu::Backends::DX12,
        }
    }
}

/// Everything the demo can be told from the outside. Defaults reproduce the
/// reference scene: a 20x20 ground, one directional light with a 512 texel
/// shadow map, and an arc-rotate camera 20 units away from the origin.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub asset_path: PathBuf,
    /// Node whose `extras` carry the baked bone data.
    pub mesh_name: String,
    pub backend: Backend,
    pub msaa_samples: u32,
    /// Playback rate of the baked frames.
    pub frames_per_second: f32,
    pub shadow_map_size: u32,
    /// Fraction of direct light kept inside a shadow.
    pub shadow_darkness: f32,
    /// PCF kernel radius in shadow map texels.
    pub shadow_blur_scale: u32,
    pub light_direction: [f32; 3],
    pub light_intensity: f32,
    pub light_height: f32,
    pub ambient: f32,
    pub ground_size: f32,
    pub camera_alpha: f32,
    pub camera_beta: f32,
    pub camera_radius: f32,
    pub camera_target: [f32; 3],
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            window_title: String::from("baked-skin"),
            window_width: 1280,
            window_height: 720,
            asset_path: PathBuf::from("assets/glb/rig.glb"),
            mesh_name: String::from("skinMesh"),
            backend: Backend::Auto,
            msaa_samples: 4,
            frames_per_second: 30.0,
            shadow_map_size: 512,
            shadow_darkness: 0.2,
            shadow_blur_scale: 2,
            light_direction: [0.0, -1.0, 1.0],
            light_intensity: 0.7,
            light_height: 10.0,
            ambient: 0.25,
            ground_size: 20.0,
            camera_alpha: 0.0,
            camera_beta: std::f32::consts::FRAC_PI_3,
            camera_radius: 20.0,
            camera_target: [0.0, 0.0, 0.0],
        }
    }
}

fn split_flag(arg: &str) -> (&str, Option<&str>) {
    match arg.split_once('=') {
        Some((name, value)) => (name, Some(value)),
        None => (arg, None),
    }
}

fn parse_number<T: std::str::FromStr>(flag: &str, value: &str) -> Result<T> {
    value
        .parse::<T>()
        .map_err(|_| DemoError::Config(format!("{flag} expects a number, got `{value}`")))
}

impl DemoConfig {
    /// Reads a JSON config file. Missing fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            DemoError::Config(format!("can't read config file {}: {e}", path.display()))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            DemoError::Config(format!("malformed config file {}: {e}", path.display()))
        })
    }

    /// Builds a config from command line arguments (without the program
    /// name). Precedence: defaults, then `--config <file>`, then flags.
    pub fn from_args<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut flags: Vec<(String, String)> = vec![];
        let mut positional: Vec<String> = vec![];
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            if !arg.starts_with("--") {
                positional.push(arg);
                continue;
            }
            let (name, inline) = split_flag(&arg);
            let value = match inline {
                Some(v) => v.to_string(),
                None => args
                    .next()
                    .ok_or_else(|| DemoError::Config(format!("{name} expects a value")))?,
            };
            flags.push((name.to_string(), value));
        }

        let mut config = match flags.iter().rev().find(|(name, _)| name == "--config") {
            Some((_, path)) => Self::from_file(Path::new(path))?,
            None => Self::default(),
        };

        if positional.len() > 1 {
            return Err(DemoError::Config(format!(
                "expected at most one asset path, got {}",
                positional.len()
            )));
        }
        if let Some(path) = positional.pop() {
            config.asset_path = PathBuf::from(path);
        }

        for (name, value) in &flags {
            config.apply_flag(name, value)?;
        }
        config.validate()?;
        Ok(config)
    }

    fn apply_flag(&mut self, name: &str, value: &str) -> Result<()> {
        match name {
            "--config" => {}
            "--asset" => self.asset_path = PathBuf::from(value),
            "--mesh" => self.mesh_name = value.to_string(),
            "--engine" | "--backend" => {
                self.backend = Backend::parse(value)
                    .ok_or_else(|| DemoError::Config(format!("unknown engine `{value}`")))?;
            }
            "--fps" => self.frames_per_second = parse_number(name, value)?,
            "--shadow-map-size" => self.shadow_map_size = parse_number(name, value)?,
            "--msaa" => self.msaa_samples = parse_number(name, value)?,
            _ => return Err(DemoError::Config(format!("unknown flag {name}"))),
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.frames_per_second > 0.0) {
            return Err(DemoError::Config("frames_per_second must be positive".into()));
        }
        if self.shadow_map_size == 0 {
            return Err(DemoError::Config("shadow_map_size must be positive".into()));
        }
        if !matches!(self.msaa_samples, 1 | 4) {
            return Err(DemoError::Config(format!(
                "msaa_samples must be 1 or 4, got {}",
                self.msaa_samples
            )));
        }
        Ok(())
    }
}
