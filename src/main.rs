use std::{env, process::ExitCode};

use baked_skin::{config::DemoConfig, logging};
use log::error;

fn main() -> ExitCode {
    logging::init();
    match DemoConfig::from_args(env::args().skip(1)).and_then(baked_skin::run) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
