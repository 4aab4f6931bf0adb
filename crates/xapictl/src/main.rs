use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use xapi::acsapi::{CapId, DriveId, LsmId, MessageOptions, QueryCriteria, RequestBody};

use xapictl::common::{self, ConnectArgs};
use xapictl::{cmd_parse, cmd_query, cmd_render};

#[derive(Parser, Debug)]
#[command(name = "xapictl", version, about = "XAPI tape library CLI")]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Output JSON where applicable
    #[arg(long, global = true)]
    json: bool,
    #[command(flatten)]
    connect: ConnectArgs,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Query CAP status (AA:LL:CC ids; none queries all)
    QueryCap {
        #[arg(value_parser = parse_cap)]
        caps: Vec<CapId>,
    },
    /// Query ACS status (none queries all)
    QueryAcs {
        #[arg(value_parser = parse_acs)]
        acs: Vec<u16>,
    },
    /// Query LSM status (AA:LL ids; none queries all)
    QueryLsm {
        #[arg(value_parser = parse_lsm)]
        lsms: Vec<LsmId>,
    },
    /// Query the XAPI server state
    QueryServer,
    /// Query drive status (AA:LL:PP:DD ids)
    QueryDrive {
        #[arg(required = true, value_parser = parse_drive)]
        drives: Vec<DriveId>,
    },
    /// Query where volumes are
    QueryVolume {
        #[arg(required = true)]
        volumes: Vec<String>,
    },
    /// Mount a volume on a drive
    Mount {
        volume: String,
        #[arg(value_parser = parse_drive)]
        drive: DriveId,
        #[arg(long)]
        read_only: bool,
    },
    /// Dismount a volume from a drive
    Dismount {
        volume: String,
        #[arg(value_parser = parse_drive)]
        drive: DriveId,
        /// Unload even if the drive holds another volume
        #[arg(long)]
        force: bool,
    },
    /// Print the request XML of a query without sending it
    Render {
        #[command(subcommand)]
        query: RenderQuery,
    },
    /// Decode a captured XAPI reply file
    Parse { file: PathBuf },
}

#[derive(Subcommand, Debug)]
enum RenderQuery {
    Cap {
        #[arg(value_parser = parse_cap)]
        caps: Vec<CapId>,
    },
    Acs {
        #[arg(value_parser = parse_acs)]
        acs: Vec<u16>,
    },
    Lsm {
        #[arg(value_parser = parse_lsm)]
        lsms: Vec<LsmId>,
    },
    Server,
    Drive {
        #[arg(value_parser = parse_drive)]
        drives: Vec<DriveId>,
    },
    Volume {
        volumes: Vec<String>,
    },
}

fn parse_cap(text: &str) -> Result<CapId, String> {
    common::parse_cap(text).map_err(|err| err.to_string())
}

fn parse_acs(text: &str) -> Result<u16, String> {
    common::parse_acs(text).map_err(|err| err.to_string())
}

fn parse_lsm(text: &str) -> Result<LsmId, String> {
    common::parse_lsm(text).map_err(|err| err.to_string())
}

fn parse_drive(text: &str) -> Result<DriveId, String> {
    common::parse_drive(text).map_err(|err| err.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let Cli {
        verbose,
        json,
        connect,
        cmd,
    } = Cli::parse();

    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| level.into()),
        ))
        .with_target(false)
        .init();

    match cmd {
        Cmd::QueryCap { caps } => {
            cmd_query::run(common::build_config(&connect)?, QueryCriteria::Cap(caps), json).await?
        }
        Cmd::QueryAcs { acs } => {
            cmd_query::run(common::build_config(&connect)?, QueryCriteria::Acs(acs), json).await?
        }
        Cmd::QueryLsm { lsms } => {
            cmd_query::run(common::build_config(&connect)?, QueryCriteria::Lsm(lsms), json).await?
        }
        Cmd::QueryServer => {
            cmd_query::run(common::build_config(&connect)?, QueryCriteria::Server, json).await?
        }
        Cmd::QueryDrive { drives } => {
            let criteria = QueryCriteria::Drive(drives);
            cmd_query::run(common::build_config(&connect)?, criteria, json).await?
        }
        Cmd::QueryVolume { volumes } => {
            let criteria = QueryCriteria::Volume(volumes);
            cmd_query::run(common::build_config(&connect)?, criteria, json).await?
        }
        Cmd::Mount {
            volume,
            drive,
            read_only,
        } => {
            let body = RequestBody::Mount {
                volume,
                drives: vec![drive],
            };
            let mut options = MessageOptions::empty();
            options.set(MessageOptions::READONLY, read_only);
            cmd_query::run_request(common::build_config(&connect)?, body, options, json).await?
        }
        Cmd::Dismount {
            volume,
            drive,
            force,
        } => {
            let body = RequestBody::Dismount { volume, drive };
            let mut options = MessageOptions::empty();
            options.set(MessageOptions::FORCE, force);
            cmd_query::run_request(common::build_config(&connect)?, body, options, json).await?
        }
        Cmd::Render { query } => {
            let criteria = match query {
                RenderQuery::Cap { caps } => QueryCriteria::Cap(caps),
                RenderQuery::Acs { acs } => QueryCriteria::Acs(acs),
                RenderQuery::Lsm { lsms } => QueryCriteria::Lsm(lsms),
                RenderQuery::Server => QueryCriteria::Server,
                RenderQuery::Drive { drives } => QueryCriteria::Drive(drives),
                RenderQuery::Volume { volumes } => QueryCriteria::Volume(volumes),
            };
            cmd_render::run(&common::build_config(&connect)?, &criteria)?
        }
        Cmd::Parse { file } => cmd_parse::run(&file, json)?,
    };

    Ok(())
}
