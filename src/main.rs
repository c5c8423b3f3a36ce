use clap::Parser;
use log::error;
use rMIS::{config::Config, mis_main};
use std::{env, process::exit};

fn main() {
    let cfg = Config::parse();
    if env::var("RUST_LOG").is_err() {
        let level = if cfg.verbose { "debug" } else { "info" };
        unsafe { env::set_var("RUST_LOG", level) };
    }
    env_logger::Builder::from_default_env()
        .format_timestamp(None)
        .format_target(false)
        .init();
    match mis_main(&cfg) {
        Ok(true) => (),
        Ok(false) => {
            error!("no viable independent support found");
            exit(1);
        }
        Err(e) => {
            error!("{e:#}");
            exit(1);
        }
    }
}
