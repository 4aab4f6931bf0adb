use anyhow::{bail, Result};
use serde::Serialize;
use tracing::info;
use xapi::acsapi::{
    DriveId, MessageOptions, QueryCriteria, Request, RequestBody, ResponseBody, ResponsePacket,
    Status,
};
use xapi::tl_xapi::SessionStatsSnapshot;
use xapi::{Gateway, StaticTables, XapiConfig};

use crate::common;

#[derive(Serialize)]
struct StatsView {
    connects: u64,
    exchanges: u64,
    bytes_sent: u64,
    bytes_received: u64,
    timeouts: u64,
    cancellations: u64,
    failures: u64,
    last_exchange_ms: u128,
}

impl From<SessionStatsSnapshot> for StatsView {
    fn from(snapshot: SessionStatsSnapshot) -> Self {
        Self {
            connects: snapshot.connects,
            exchanges: snapshot.exchanges,
            bytes_sent: snapshot.bytes_sent,
            bytes_received: snapshot.bytes_received,
            timeouts: snapshot.timeouts,
            cancellations: snapshot.cancellations,
            failures: snapshot.failures,
            last_exchange_ms: snapshot.last_exchange.as_millis(),
        }
    }
}

#[derive(Serialize)]
struct QueryOutput<'a> {
    status: Status,
    packets: &'a [ResponsePacket],
    session: StatsView,
}

pub async fn run(config: XapiConfig, criteria: QueryCriteria, json: bool) -> Result<()> {
    run_request(config, RequestBody::Query(criteria), MessageOptions::empty(), json).await
}

/// Send one request of any kind and print every response packet.
pub async fn run_request(
    config: XapiConfig,
    body: RequestBody,
    options: MessageOptions,
    json: bool,
) -> Result<()> {
    let user = config.user.clone();
    let loader = StaticTables::from_config(&config);
    let gateway = Gateway::new(config, Box::new(loader));
    let mut request = Request::new(1, body).with_options(options);
    request.header.user = user;
    let command = request.command();

    let mut packets = Vec::new();
    let status = gateway.process(&request, &mut packets).await;
    let stats = gateway.stats().snapshot();
    info!(?command, %status, packets = packets.len(), bytes = stats.bytes_received, "request finished");

    if json {
        common::print_json(&QueryOutput {
            status,
            packets: &packets,
            session: stats.into(),
        })?;
    } else {
        for packet in &packets {
            print_body(&packet.body);
        }
    }

    if !status.is_success() {
        bail!("{command:?} failed: {status}");
    }
    Ok(())
}

fn print_body(body: &ResponseBody) {
    match body {
        ResponseBody::Caps(caps) => {
            println!(
                "{:<10} {:<22} {:<8} {:<5} {:<10} {}",
                "CAP", "STATUS", "STATE", "SIZE", "MODE", "PRIORITY"
            );
            for cap in caps {
                println!(
                    "{:<10} {:<22} {:<8} {:<5} {:<10} {}",
                    format!("{:02}:{:02}:{:02}", cap.cap_id.acs, cap.cap_id.lsm, cap.cap_id.cap),
                    cap.status,
                    format!("{:?}", cap.state),
                    cap.size,
                    format!("{:?}", cap.mode),
                    cap.priority,
                );
            }
        }
        ResponseBody::Acs(acs) => {
            println!("{:<5} {:<22} {:<8} {}", "ACS", "STATUS", "STATE", "FREE CELLS");
            for entry in acs {
                println!(
                    "{:<5} {:<22} {:<8} {}",
                    format!("{:02}", entry.acs),
                    entry.status,
                    format!("{:?}", entry.state),
                    entry.freecells,
                );
            }
        }
        ResponseBody::Lsms(lsms) => {
            println!("{:<7} {:<22} {:<8} {}", "LSM", "STATUS", "STATE", "FREE CELLS");
            for lsm in lsms {
                println!(
                    "{:<7} {:<22} {:<8} {}",
                    format!("{:02}:{:02}", lsm.lsm_id.acs, lsm.lsm_id.lsm),
                    lsm.status,
                    format!("{:?}", lsm.state),
                    lsm.freecells,
                );
            }
        }
        ResponseBody::Server(server) => {
            println!("{:<22} {:<12} {}", "STATUS", "STATE", "FREE CELLS");
            println!(
                "{:<22} {:<12} {}",
                server.status,
                format!("{:?}", server.state),
                server.freecells
            );
        }
        ResponseBody::Drives(drives) => {
            println!(
                "{:<13} {:<22} {:<8} {:<7} {}",
                "DRIVE", "STATUS", "STATE", "VOLUME", "TYPE"
            );
            for drive in drives {
                println!(
                    "{:<13} {:<22} {:<8} {:<7} {}",
                    drive_text(drive.drive_id),
                    drive.status,
                    format!("{:?}", drive.state),
                    drive.volume.as_deref().unwrap_or("-"),
                    drive.drive_type,
                );
            }
        }
        ResponseBody::Volumes(volumes) => {
            println!("{:<7} {:<26} {:<6} {}", "VOLUME", "STATUS", "MEDIA", "DRIVE");
            for volume in volumes {
                println!(
                    "{:<7} {:<26} {:<6} {}",
                    volume.volume,
                    volume.status,
                    volume.media_type,
                    volume.drive_id.map_or_else(|| "-".to_string(), drive_text),
                );
            }
        }
        ResponseBody::Mount { volume, drive_id } => {
            println!("{volume} mounted on {}", drive_text(*drive_id));
        }
        ResponseBody::Dismount { volume, drive_id } => {
            println!("{volume} dismounted from {}", drive_text(*drive_id));
        }
        ResponseBody::Empty | ResponseBody::Pools(_) | ResponseBody::Cancel { .. } => {}
    }
}

fn drive_text(id: DriveId) -> String {
    format!("{:02}:{:02}:{:02}:{:02}", id.acs, id.lsm, id.panel, id.drive)
}
