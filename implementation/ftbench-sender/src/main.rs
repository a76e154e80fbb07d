//! Sends a file to an ftbench receiver one or more times over a single
//! connection.

mod client;
mod generate;

use clap::{
    app_from_crate, crate_authors, crate_description, crate_name, crate_version,
    AppSettings, Arg,
};
use env_logger;
use ftbench::{CongestionControl, SenderConfig, DEFAULT_MAX_PAYLOAD};
use log::{error, info, LevelFilter};
use std::{env, net::SocketAddr, path::PathBuf, process, str::FromStr};

const ALGO_ARG: &str = "ALGO";
const FILE_ARG: &str = "FILE";
const GENERATE_ARG: &str = "GENERATE";
const IP_ARG: &str = "IP";
const MAX_PAYLOAD_ARG: &str = "MAX_PAYLOAD";
const PORT_ARG: &str = "PORT";
const RUNS_ARG: &str = "RUNS";

fn is_positive<T: Default + FromStr + PartialEq>(val: String) -> Result<(), String> {
    match val.parse::<T>() {
        Ok(ref n) if *n == T::default() => Err("must be greater than zero.".to_owned()),
        Ok(_) => Ok(()),
        Err(_) => Err(format!("'{}' cannot be parsed as number.", val)),
    }
}

fn main() {
    env_logger::Builder::new()
        .filter(Some("ftbench"), LevelFilter::Info)
        .filter(Some("ftbench_sender"), LevelFilter::Info)
        .parse_filters(&env::var("RUST_LOG").unwrap_or_default())
        .init();

    let default_payload = DEFAULT_MAX_PAYLOAD.to_string();
    let matches = app_from_crate!()
        .setting(AppSettings::GlobalVersion)
        .setting(AppSettings::VersionlessSubcommands)
        .arg(
            Arg::with_name(IP_ARG)
                .short("i")
                .long("ip")
                .default_value("127.0.0.1")
                .takes_value(true)
                .validator(|val| {
                    val.parse::<std::net::IpAddr>().map(|_| ()).map_err(|_| {
                        format!("'{}' is not an IP address.", val)
                    })
                })
                .help("The address of the receiver."),
        )
        .arg(
            Arg::with_name(PORT_ARG)
                .short("p")
                .long("port")
                .default_value("12345")
                .takes_value(true)
                .validator(|val| {
                    val.parse::<u16>().map(|_| ()).map_err(|_| {
                        format!("'{}' cannot be parsed as number.", val)
                    })
                })
                .help("The TCP port of the receiver."),
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
            Arg::with_name(FILE_ARG)
                .short("f")
                .long("file")
                .default_value("random_file.txt")
                .takes_value(true)
                .help("The file to send."),
        )
        .arg(
            Arg::with_name(RUNS_ARG)
                .short("n")
                .long("runs")
                .default_value("1")
                .takes_value(true)
                .validator(is_positive::<u32>)
                .help("How many times to send the file."),
        )
        .arg(
            Arg::with_name(MAX_PAYLOAD_ARG)
                .long("max-payload")
                .default_value(&default_payload)
                .takes_value(true)
                .validator(is_positive::<usize>)
                .help("The payload capacity of a frame. Must match the receiver."),
        )
        .arg(
            Arg::with_name(GENERATE_ARG)
                .long("generate")
                .help("Fill the file with random test data before sending it."),
        )
        .get_matches();

    // The validators guarantee the values parse
    let ip = matches.value_of(IP_ARG).unwrap().parse().unwrap();
    let port = matches.value_of(PORT_ARG).unwrap().parse().unwrap();
    let config = SenderConfig {
        addr: SocketAddr::new(ip, port),
        congestion: CongestionControl::new(matches.value_of(ALGO_ARG).unwrap()),
        max_payload: matches.value_of(MAX_PAYLOAD_ARG).unwrap().parse().unwrap(),
        input: PathBuf::from(matches.value_of(FILE_ARG).unwrap()),
        runs: matches.value_of(RUNS_ARG).unwrap().parse().unwrap(),
    };

    if matches.is_present(GENERATE_ARG) {
        match generate::random_file(&config.input) {
            Ok(len) => info!(
                "📝  Wrote {:.2} MB of test data to {}.",
                len as f64 / (1024.0 * 1024.0),
                config.input.display(),
            ),
            Err(e) => {
                error!("💥  Cannot generate {}: {}", config.input.display(), e);
                process::exit(1);
            }
        }
    }

    if let Err(e) = client::run(&config) {
        error!("💥  {}", e);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_must_fit_the_counter() {
        assert!(is_positive::<u32>("4294967295".to_owned()).is_ok());
        assert!(is_positive::<u32>("4294967296".to_owned()).is_err());
        assert!(is_positive::<u32>("0".to_owned()).is_err());
    }
}
