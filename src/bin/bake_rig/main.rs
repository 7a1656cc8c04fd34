//! Bakes a glTF skin animation into `boneMats`/`boneWeights` extras on the
//! mesh node, so the demo can skin it without a runtime skeleton.
//!
//! Usage: `bake_rig <input.glb> <output.glb> [--mesh <name>] [--frames <n>]`

use std::{env, fs, path::PathBuf, process::ExitCode};

use baked_skin::{
    errors::{DemoError, Result},
    logging,
    rig::bake::{bake_rig, write_baked_glb, BakeOptions},
};
use log::{error, info};

struct Args {
    input: PathBuf,
    output: PathBuf,
    options: BakeOptions,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args> {
    let mut options = BakeOptions::default();
    let mut paths = vec![];
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--mesh" | "--frames" => {
                let value = args
                    .next()
                    .ok_or_else(|| DemoError::Config(format!("{arg} expects a value")))?;
                if arg == "--mesh" {
                    options.mesh_name = value;
                } else {
                    options.frames = value.parse().map_err(|_| {
                        DemoError::Config(format!("--frames expects a number, got `{value}`"))
                    })?;
                }
            }
            flag if flag.starts_with("--") => {
                return Err(DemoError::Config(format!("unknown flag {flag}")));
            }
            _ => paths.push(PathBuf::from(arg)),
        }
    }
    match <[PathBuf; 2]>::try_from(paths) {
        Ok([input, output]) => Ok(Args {
            input,
            output,
            options,
        }),
        Err(_) => Err(DemoError::Config(
            "usage: bake_rig <input.glb> <output.glb> [--mesh <name>] [--frames <n>]".into(),
        )),
    }
}

fn run(args: Args) -> Result<()> {
    let bytes = fs::read(&args.input)?;
    let (document, buffers, _images) = gltf::import_slice(&bytes)?;
    let extras = bake_rig(&document, &buffers, &args.options)?;
    let baked = write_baked_glb(&bytes, &extras, &args.options.mesh_name)?;
    fs::write(&args.output, baked)?;
    info!(
        "baked {} frame(s) of `{}` into {}",
        args.options.frames,
        args.options.mesh_name,
        args.output.display()
    );
    Ok(())
}

fn main() -> ExitCode {
    logging::init();
    match parse_args(env::args().skip(1)).and_then(run) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
