use std::process;

use anyhow::Context;
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use slog::error;

pub mod api;
pub mod command_handlers;
pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod utils;

use config::Config;

fn cli() -> Command {
    Command::new("music-share")
        .about("Self-hosted music sharing site")
        .subcommand(
            Command::new("serve")
                .about("Run the web server (default)")
                .arg(Arg::new("host").long("host").help("Address to bind, overrides HOST"))
                .arg(
                    Arg::new("port")
                        .short('p')
                        .long("port")
                        .value_parser(value_parser!(u16))
                        .help("Port to listen on, overrides PORT"),
                ),
        )
        .subcommand(Command::new("list").about("Print every song in the library"))
        .subcommand(
            Command::new("prune")
                .about("Delete uploaded files no song refers to")
                .arg(
                    Arg::new("dry-run")
                        .short('n')
                        .long("dry-run")
                        .action(ArgAction::SetTrue)
                        .help("Only list the files that would be removed"),
                ),
        )
}

fn serve(mut config: Config, matches: Option<&ArgMatches>, logger: slog::Logger) -> anyhow::Result<()> {
    if let Some(matches) = matches {
        if let Some(host) = matches.get_one::<String>("host") {
            config.host = host.clone();
        }
        if let Some(port) = matches.get_one::<u16>("port") {
            config.port = *port;
        }
    }

    config.ensure_dirs().context("failed to create data directories")?;
    let store = db::new_song_store(&config);

    actix_web::rt::System::new()
        .block_on(api::start_server(config, store, logger))
        .context("server failed")
}

fn run(logger: &slog::Logger) -> anyhow::Result<()> {
    let matches = cli().get_matches();
    let config = Config::from_env()?;

    match matches.subcommand() {
        Some(("list", _)) => command_handlers::list(&config),
        Some(("prune", sub)) => {
            let dry_run = sub.get_flag("dry-run");
            let count = command_handlers::prune(&config, dry_run, logger)?;
            println!("{} orphaned file(s)", count);
            Ok(())
        }
        Some(("serve", sub)) => serve(config, Some(sub), logger.clone()),
        _ => serve(config, None, logger.clone()),
    }
}

fn main() {
    let logger = utils::get_logger();
    if let Err(e) = run(&logger) {
        error!(logger, "fatal error"; "error" => format!("{:#}", e));
        process::exit(1);
    }
}
