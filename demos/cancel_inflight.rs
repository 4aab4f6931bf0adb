//! Start a QUERY ACS against the configured server and cancel it from a
//! second task after a short delay.

use std::sync::Arc;
use std::time::Duration;

use acsapi::{QueryCriteria, Request, RequestBody};
use tracing::info;
use xapi::Gateway;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let gateway = Arc::new(Gateway::from_env()?);

    let query = {
        let gateway = Arc::clone(&gateway);
        tokio::spawn(async move {
            let request = Request::new(100, RequestBody::Query(QueryCriteria::Acs(vec![])));
            let mut packets = Vec::new();
            gateway.process(&request, &mut packets).await
        })
    };

    tokio::time::sleep(Duration::from_millis(200)).await;
    let mut packets = Vec::new();
    let cancel = Request::new(101, RequestBody::Cancel { request_id: 100 });
    gateway.process(&cancel, &mut packets).await;
    if let Some(packet) = packets.last() {
        info!(status = %packet.status, "cancel answered");
    }

    let status = query.await?;
    println!("query finished with {status}");
    let stats = gateway.stats().snapshot();
    println!(
        "connects={} exchanges={} cancellations={}",
        stats.connects, stats.exchanges, stats.cancellations
    );
    Ok(())
}
