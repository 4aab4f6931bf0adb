//! Commands answered without an XAPI exchange.

use acsapi::{PoolStatus, ResponseBody, ResponseKind, Status, MAX_ID};
use tracing::debug;

use crate::handler::{HandlerContext, ResponseSink};
use crate::table::{CancelOutcome, RequestTable};

/// CANCEL: set the CANCEL bit of the in-flight request `request_id`.
pub fn cancel(
    ctx: &HandlerContext<'_>,
    table: &RequestTable,
    request_id: u32,
    sink: &mut dyn ResponseSink,
) -> Result<(), Status> {
    let status = match table.cancel(request_id) {
        CancelOutcome::Cancelled => Status::Success,
        CancelOutcome::AlreadyCompleted => Status::Complete,
        CancelOutcome::NotFound => Status::MessageNotFound,
    };
    debug!(seq = ctx.sequence(), target = request_id, %status, "cancel");
    sink.emit(ctx.packet(
        ResponseKind::Final,
        status,
        ResponseBody::Cancel { request_id },
    ));
    Ok(())
}

/// DEFINE POOL: report each pool from the scratch-pool table captured when
/// the request was registered.
pub fn define_pool(
    ctx: &HandlerContext<'_>,
    pools: &[u16],
    sink: &mut dyn ResponseSink,
) -> Result<(), Status> {
    if pools.is_empty() {
        return Err(Status::CountTooSmall);
    }
    if pools.len() > MAX_ID {
        return Err(Status::CountTooLarge);
    }
    let snapshot = ctx.handle.snapshot().unwrap_or_default();
    let items = pools
        .iter()
        .map(|&pool_id| match snapshot.scratch_pool(pool_id) {
            Some(pool) => PoolStatus {
                pool_id,
                status: Status::Success,
                volumes: pool.volumes,
                low_water_mark: pool.low_water_mark,
                high_water_mark: pool.high_water_mark,
            },
            None => PoolStatus {
                pool_id,
                status: Status::PoolNotFound,
                volumes: 0,
                low_water_mark: 0,
                high_water_mark: 0,
            },
        })
        .collect();
    sink.emit(ctx.packet(
        ResponseKind::Final,
        Status::Success,
        ResponseBody::Pools(items),
    ));
    Ok(())
}
