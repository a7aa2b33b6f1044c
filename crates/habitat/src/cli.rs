//! Command-line interface handling for the Habitat server.
//!
//! Every option here overrides the matching setting of the configuration
//! file.

use clap::{Arg, ArgMatches, Command};
use std::ffi::OsString;
use std::path::PathBuf;

const DEFAULT_CONFIG: &str = "config.toml";

/// Command line arguments parsed from user input.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Optional override for the bind address
    pub bind_address: Option<String>,
    /// Optional override for the log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
    /// Optional override for the world file
    pub world_path: Option<PathBuf>,
    /// Optional override for the room tick interval
    pub tick_ms: Option<u64>,
}

fn command() -> Command {
    Command::new("Habitat Server")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Multiplayer virtual-world room server")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value(DEFAULT_CONFIG),
        )
        .arg(
            Arg::new("bind")
                .short('b')
                .long("bind")
                .value_name("ADDRESS")
                .help("Bind address (e.g., 0.0.0.0:30000)"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error)"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .help("Output logs in JSON format")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("world")
                .short('w')
                .long("world")
                .value_name("FILE")
                .help("World file with users, rooms, furniture and bots"),
        )
        .arg(
            Arg::new("tick-ms")
                .long("tick-ms")
                .value_name("MILLIS")
                .help("Room tick interval in milliseconds")
                .value_parser(clap::value_parser!(u64)),
        )
}

impl CliArgs {
    /// Parses the process arguments. Exits with a usage message on error.
    pub fn parse() -> Self {
        Self::from_matches(&command().get_matches())
    }

    /// Parses an explicit argument list; the first item is the binary name.
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Ok(Self::from_matches(&command().try_get_matches_from(args)?))
    }

    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            config_path: matches
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG)),
            bind_address: matches.get_one::<String>("bind").cloned(),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
            world_path: matches.get_one::<String>("world").map(PathBuf::from),
            tick_ms: matches.get_one::<u64>("tick-ms").copied(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = CliArgs::try_parse_from(["habitat"]).unwrap();
        assert_eq!(args.config_path, PathBuf::from("config.toml"));
        assert!(args.bind_address.is_none());
        assert!(args.world_path.is_none());
        assert!(args.tick_ms.is_none());
        assert!(!args.json_logs);
    }

    #[test]
    fn test_overrides() {
        let args = CliArgs::try_parse_from([
            "habitat",
            "-c",
            "prod.toml",
            "--bind",
            "0.0.0.0:9000",
            "-l",
            "debug",
            "--json-logs",
            "-w",
            "data/world.json",
            "--tick-ms",
            "250",
        ])
        .unwrap();

        assert_eq!(args.config_path, PathBuf::from("prod.toml"));
        assert_eq!(args.bind_address.as_deref(), Some("0.0.0.0:9000"));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert!(args.json_logs);
        assert_eq!(args.world_path, Some(PathBuf::from("data/world.json")));
        assert_eq!(args.tick_ms, Some(250));
    }

    #[test]
    fn test_tick_must_be_a_number() {
        assert!(CliArgs::try_parse_from(["habitat", "--tick-ms", "fast"]).is_err());
    }
}
