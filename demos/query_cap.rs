use std::env;

use acsapi::{CapId, QueryCriteria, Request, RequestBody, ResponseBody};
use tracing::info;
use xapi::Gateway;

fn parse_args() -> Vec<CapId> {
    env::args()
        .skip(1)
        .filter_map(|arg| {
            let parts: Vec<u16> = arg.split(':').filter_map(|p| p.parse().ok()).collect();
            match parts.as_slice() {
                [acs, lsm, cap] => Some(CapId::new(*acs, *lsm, *cap)),
                _ => None,
            }
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let caps = parse_args();
    let gateway = Gateway::from_env()?;
    info!(host = %gateway.config().hostname, caps = caps.len(), "querying CAPs");

    let request = Request::new(1, RequestBody::Query(QueryCriteria::Cap(caps)));
    let mut packets = Vec::new();
    let status = gateway.process(&request, &mut packets).await;

    for packet in &packets {
        if let ResponseBody::Caps(caps) = &packet.body {
            for cap in caps {
                println!(
                    "{:02}:{:02}:{:02} {:<20} {:?} {:?} size={}",
                    cap.cap_id.acs, cap.cap_id.lsm, cap.cap_id.cap, cap.status, cap.state, cap.mode, cap.size
                );
            }
        }
    }
    println!("final status: {status}");
    Ok(())
}
