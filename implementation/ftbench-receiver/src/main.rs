//! Receives files over a single ftbench connection on a configurable port and
//! prints the throughput of every run once the sender is done.

mod server;

use clap::{
    app_from_crate, crate_authors, crate_description, crate_name, crate_version,
    AppSettings, Arg,
};
use env_logger;
use ftbench::{CongestionControl, ReceiverConfig, DEFAULT_MAX_PAYLOAD};
use log::LevelFilter;
use std::{env, path::PathBuf, process, time::Duration};

const ALGO_ARG: &str = "ALGO";
const DIR_ARG: &str = "DIR";
const MAX_PAYLOAD_ARG: &str = "MAX_PAYLOAD";
const PORT_ARG: &str = "PORT";
const TIMEOUT_ARG: &str = "TIMEOUT";

fn is_number<T: std::str::FromStr>(val: String) -> Result<(), String> {
    val.parse::<T>()
        .map(|_| ())
        .map_err(|_| format!("'{}' cannot be parsed as number.", val))
}

fn is_positive(val: String) -> Result<(), String> {
    match val.parse::<usize>() {
        Ok(0) => Err("must be greater than zero.".to_owned()),
        Ok(_) => Ok(()),
        Err(_) => Err(format!("'{}' cannot be parsed as number.", val)),
    }
}

fn main() {
    env_logger::Builder::new()
        .filter(Some("ftbench"), LevelFilter::Info)
        .filter(Some("ftbench_receiver"), LevelFilter::Info)
        .parse_filters(&env::var("RUST_LOG").unwrap_or_default())
        .init();

    let default_payload = DEFAULT_MAX_PAYLOAD.to_string();
    let matches = app_from_crate!()
        .setting(AppSettings::GlobalVersion)
        .setting(AppSettings::VersionlessSubcommands)
        .arg(
            Arg::with_name(PORT_ARG)
                .short("p")
                .long("port")
                .default_value("12345")
                .takes_value(true)
                .validator(is_number::<u16>)
                .help("The TCP port to accept the sender on."),
        )
        .arg(
            Arg::with_name(ALGO_ARG)
                .short("a")
                .long("algo")
                .default_value("cubic")
                .takes_value(true)
                .help("The TCP congestion control algorithm, e.g. reno or cubic."),
        )
        .arg(
            Arg::with_name(DIR_ARG)
                .short("d")
                .long("dir")
                .default_value("assets")
                .takes_value(true)
                .help("The directory received files are written to."),
        )
        .arg(
            Arg::with_name(MAX_PAYLOAD_ARG)
                .long("max-payload")
                .default_value(&default_payload)
                .takes_value(true)
                .validator(is_positive)
                .help("The payload capacity of a frame. Must match the sender."),
        )
        .arg(
            Arg::with_name(TIMEOUT_ARG)
                .long("timeout")
                .takes_value(true)
                .validator(is_number::<u64>)
                .help("Give up after this many seconds without a frame."),
        )
        .get_matches();

    // The validators guarantee the values parse
    let config = ReceiverConfig {
        port: matches.value_of(PORT_ARG).unwrap().parse().unwrap(),
        congestion: CongestionControl::new(matches.value_of(ALGO_ARG).unwrap()),
        max_payload: matches.value_of(MAX_PAYLOAD_ARG).unwrap().parse().unwrap(),
        output_dir: PathBuf::from(matches.value_of(DIR_ARG).unwrap()),
        idle_timeout: matches
            .value_of(TIMEOUT_ARG)
            .map(|secs| Duration::from_secs(secs.parse().unwrap())),
    };

    if let Err(e) = server::serve(&config) {
        log::error!("💥  {}", e);
        process::exit(1);
    }
}
