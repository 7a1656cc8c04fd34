/// Initializes `env_logger`. `RUST_LOG` overrides the default filter, which
/// keeps the GPU stack quiet unless something goes wrong.
pub fn init() {
    let env = env_logger::Env::default()
        .default_filter_or("info,wgpu_core=warn,wgpu_hal=warn,naga=warn");
    // A second init (tests, embedding) is harmless.
    let _ = env_logger::Builder::from_env(env).try_init();
}
