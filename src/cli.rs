use clap::{value_parser, Arg, ArgMatches, Command};

pub fn build_command() -> Command {
    Command::new("osdp-console")
        .about("Operator console for OSDP peripheral buses")
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("PATH")
                .help("Settings file (defaults to ./appsettings.config)"),
        )
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .value_name("PATH")
                .help("Append log records to this file (also OSDP_CONSOLE_LOG_FILE)"),
        )
        .arg(
            Arg::new("reply-latency-ms")
                .long("reply-latency-ms")
                .value_name("MS")
                .value_parser(value_parser!(u64))
                .help("Simulated device reply latency in milliseconds"),
        )
        .arg(
            Arg::new("list-ports")
                .long("list-ports")
                .help("List available serial ports and exit")
                .action(clap::ArgAction::SetTrue),
        )
}

pub fn parse_args() -> ArgMatches {
    build_command().get_matches()
}
