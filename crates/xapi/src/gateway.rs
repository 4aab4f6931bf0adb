//! Request dispatcher: idle gating, request table registration, and routing
//! of each ACSAPI command to its handler.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use acsapi::{
    Command, MessageOptions, QueryCriteria, Request, RequestBody, ResponseBody, ResponseKind,
    ResponsePacket, Status,
};
use bytes::Bytes;
use tl_xapi::SessionStats;
use tracing::{debug, info, warn};
use xapi_xml::XmlError;

use crate::config::{consts, XapiConfig};
use crate::handler::{build_request, run_query, HandlerContext, ResponseSink};
use crate::lookup::{LookupStore, StaticTables, TableLoader};
use crate::qacs::QueryAcs;
use crate::qcap::QueryCap;
use crate::qdrv::QueryDrive;
use crate::qlsm::QueryLsm;
use crate::qserver::QueryServer;
use crate::qvol::QueryVolume;
use crate::{local, mount};
use crate::table::{RequestTable, TableError};
use crate::GatewayError;

/// Gateway life cycle driven by IDLE and START.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayState {
    Active,
    /// IDLE was requested while other requests were still running.
    IdlePending,
    Idle,
}

/// Translates ACSAPI requests into XAPI exchanges.
///
/// One `Gateway` is shared by every in-flight request; [`Gateway::process`]
/// takes `&self` so requests run concurrently on separate tasks.
#[derive(Debug)]
pub struct Gateway {
    config: XapiConfig,
    table: Arc<RequestTable>,
    store: LookupStore,
    stats: SessionStats,
    state: Mutex<GatewayState>,
}

impl Gateway {
    pub fn new(config: XapiConfig, loader: Box<dyn TableLoader>) -> Self {
        Self {
            config,
            table: Arc::new(RequestTable::new(consts::MAX_REQUESTS)),
            store: LookupStore::new(loader),
            stats: SessionStats::new(),
            state: Mutex::new(GatewayState::Active),
        }
    }

    /// Gateway configured from the process environment with static lookup tables.
    pub fn from_env() -> Result<Self, GatewayError> {
        let config = XapiConfig::from_env()?;
        let loader = StaticTables::from_config(&config);
        Ok(Self::new(config, Box::new(loader)))
    }

    pub fn with_table_capacity(mut self, capacity: usize) -> Self {
        self.table = Arc::new(RequestTable::new(capacity));
        self
    }

    pub fn config(&self) -> &XapiConfig {
        &self.config
    }

    pub fn table(&self) -> &Arc<RequestTable> {
        &self.table
    }

    pub fn store(&self) -> &LookupStore {
        &self.store
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn state(&self) -> GatewayState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, next: GatewayState) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state != next {
            debug!(from = ?*state, to = ?next, "gateway state");
            *state = next;
        }
    }

    /// Serve one request, emitting every response packet into `sink`.
    ///
    /// Returns the status of the final packet.
    pub async fn process(&self, request: &Request, sink: &mut dyn ResponseSink) -> Status {
        let started = Instant::now();
        let seq = request.header.sequence;
        let command = request.command();

        if !command.allowed_while_idle() && self.state() != GatewayState::Active {
            debug!(seq, ?command, state = ?self.state(), "rejected while idle");
            sink.emit(ResponsePacket::status_only(seq, command, Status::IdlePending));
            return Status::IdlePending;
        }

        let snapshot = self.store.refresh_if_stale().await;
        // A CANCEL request can never itself be cancelled.
        let table_seq = if command == Command::Cancel { 0 } else { seq };
        let handle = match self.table.register(table_seq, command, Some(snapshot)) {
            Ok(handle) => handle,
            Err(err) => {
                warn!(seq, ?command, error = %err, "request not registered");
                let status = match err {
                    TableError::Full(_) => Status::MaxRequestsExceeded,
                    TableError::DuplicateSequence(_) => Status::InvalidValue,
                };
                sink.emit(ResponsePacket::status_only(seq, command, status));
                return status;
            }
        };

        let ctx = HandlerContext {
            sequence: seq,
            config: &self.config,
            store: &self.store,
            stats: &self.stats,
            handle: &handle,
            command,
            user: request.header.user.as_deref(),
        };
        let status = match self.dispatch(&ctx, request, sink).await {
            Ok(()) => Status::Success,
            Err(status) => {
                sink.emit(ResponsePacket::status_only(seq, command, status));
                status
            }
        };
        drop(handle);
        self.complete_idle();

        info!(seq, ?command, %status, elapsed = ?started.elapsed(), "request complete");
        status
    }

    async fn dispatch(
        &self,
        ctx: &HandlerContext<'_>,
        request: &Request,
        sink: &mut dyn ResponseSink,
    ) -> Result<(), Status> {
        let options = request.header.options;
        match &request.body {
            RequestBody::Query(QueryCriteria::Server) => run_query::<QueryServer>(ctx, &[], sink).await,
            RequestBody::Query(QueryCriteria::Cap(ids)) => run_query::<QueryCap>(ctx, ids, sink).await,
            RequestBody::Query(QueryCriteria::Acs(ids)) => run_query::<QueryAcs>(ctx, ids, sink).await,
            RequestBody::Query(QueryCriteria::Lsm(ids)) => run_query::<QueryLsm>(ctx, ids, sink).await,
            RequestBody::Query(QueryCriteria::Drive(ids)) => {
                run_query::<QueryDrive>(ctx, ids, sink).await
            }
            RequestBody::Query(QueryCriteria::Volume(ids)) => {
                run_query::<QueryVolume>(ctx, ids, sink).await
            }
            RequestBody::Mount { volume, drives } => {
                mount::mount(ctx, volume, drives, options, sink).await
            }
            RequestBody::Dismount { volume, drive } => {
                mount::dismount(ctx, volume, *drive, options, sink).await
            }
            RequestBody::Cancel { request_id } => local::cancel(ctx, &self.table, *request_id, sink),
            RequestBody::DefinePool { pools } => local::define_pool(ctx, pools, sink),
            RequestBody::Idle => {
                self.idle(options.contains(MessageOptions::FORCE));
                sink.emit(ctx.packet(ResponseKind::Final, Status::Success, ResponseBody::Empty));
                Ok(())
            }
            RequestBody::Start => {
                self.set_state(GatewayState::Active);
                sink.emit(ctx.packet(ResponseKind::Final, Status::Success, ResponseBody::Empty));
                Ok(())
            }
            RequestBody::Opaque(command) => {
                debug!(seq = ctx.sequence(), ?command, "no XAPI equivalent");
                Err(Status::UnsupportedCommand)
            }
        }
    }

    fn idle(&self, force: bool) {
        // The IDLE request itself occupies one slot.
        let others = self.table.active_count().saturating_sub(1);
        if force || others == 0 {
            self.set_state(GatewayState::Idle);
        } else {
            debug!(others, "idle deferred until running requests finish");
            self.set_state(GatewayState::IdlePending);
        }
    }

    /// Finish a deferred IDLE once the last running request is gone.
    fn complete_idle(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state == GatewayState::IdlePending && self.table.active_count() == 0 {
            debug!("gateway idle");
            *state = GatewayState::Idle;
        }
    }
}

/// Render the XAPI request a query would send, without sending it.
pub fn render_query(
    config: &XapiConfig,
    seq: u32,
    user: Option<&str>,
    criteria: &QueryCriteria,
) -> Result<Bytes, XmlError> {
    match criteria {
        QueryCriteria::Server => build_request::<QueryServer>(config, seq, user, &[]),
        QueryCriteria::Cap(ids) => build_request::<QueryCap>(config, seq, user, ids),
        QueryCriteria::Acs(ids) => build_request::<QueryAcs>(config, seq, user, ids),
        QueryCriteria::Lsm(ids) => build_request::<QueryLsm>(config, seq, user, ids),
        QueryCriteria::Drive(ids) => build_request::<QueryDrive>(config, seq, user, ids),
        QueryCriteria::Volume(ids) => build_request::<QueryVolume>(config, seq, user, ids),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use acsapi::{CapId, CapMode, DriveId, State};
    use tl_xapi::Timeouts;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    use super::*;
    use crate::lookup::{DriveType, ScratchPool};

    /// Accept one connection, read the request, optionally answer, then hold
    /// the socket open for `linger`.
    async fn serve_once(reply: Option<String>, linger: Duration) -> (u16, JoinHandle<Vec<u8>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let mut received = Vec::new();
            let mut chunk = [0u8; 1024];
            while !received.ends_with(b"</libtrans>") {
                let n = socket.read(&mut chunk).await.expect("read");
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&chunk[..n]);
            }
            if let Some(reply) = reply {
                socket.write_all(reply.as_bytes()).await.expect("write");
            }
            tokio::time::sleep(linger).await;
            let _ = socket.shutdown().await;
            received
        });
        (port, handle)
    }

    fn gateway(port: u16) -> Gateway {
        let config = XapiConfig::new("127.0.0.1", port)
            .with_tapeplex("HSCQ")
            .with_tick(Duration::from_millis(50))
            .with_timeouts(Timeouts {
                send: Duration::from_secs(2),
                recv_first: Duration::from_secs(5),
                recv_next: Duration::from_secs(2),
            });
        let loader = StaticTables::from_config(&config).with_scratch_pools(vec![ScratchPool {
            pool_id: 1,
            name: "SCRATCH1".into(),
            volumes: 300,
            low_water_mark: 20,
            high_water_mark: 900,
        }]);
        Gateway::new(config, Box::new(loader))
    }

    fn reply(fragments: &str) -> String {
        format!(
            "<libreply><header><els_version>7.1.0</els_version>\
             <configuration_token>TOKEN1</configuration_token></header>\
             {fragments}<uui_return_code>0</uui_return_code></libreply>"
        )
    }

    fn cap_data(acs: u16, result: &str) -> String {
        format!(
            "<cap_data><cap_location_data><acs>{acs:02}</acs><lsm>00</lsm><cap>00</cap>\
             </cap_location_data><cell_count>21</cell_count><priority>1</priority>\
             <mode>AUTOMATIC</mode><state>ONLINE</state><result>{result}</result></cap_data>"
        )
    }

    fn query_cap(seq: u32, ids: Vec<CapId>) -> Request {
        Request::new(seq, RequestBody::Query(QueryCriteria::Cap(ids)))
    }

    #[tokio::test]
    async fn query_cap_acknowledges_then_answers() {
        let body = format!("{}{}", cap_data(0, "SUCCESS"), cap_data(1, "FAILURE"));
        let (port, server) = serve_once(Some(reply(&body)), Duration::ZERO).await;
        let gateway = gateway(port);
        let mut packets = Vec::new();
        let status = gateway.process(&query_cap(42, vec![]), &mut packets).await;
        assert_eq!(status, Status::Success);

        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0].kind, ResponseKind::Acknowledge);
        assert!(packets[1].is_final());
        assert_eq!(packets[1].sequence, 42);
        let ResponseBody::Caps(caps) = &packets[1].body else {
            panic!("unexpected body {:?}", packets[1].body);
        };
        assert_eq!(caps.len(), 2);
        assert_eq!(caps[0].status, Status::Success);
        assert_eq!(caps[0].state, State::Online);
        assert_eq!(caps[0].mode, CapMode::Automatic);
        assert_eq!(caps[0].size, 21);
        assert_eq!(caps[1].status, Status::CapNotInLibrary);
        assert_eq!(caps[1].cap_id, CapId::new(1, 0, 0));

        let request = server.await.expect("server");
        let request = String::from_utf8(request).expect("utf8");
        assert!(request.starts_with("<libtrans><header>"));
        assert!(request.contains("<command><query_cap></query_cap></command>"));
        assert_eq!(gateway.table().active_count(), 0);
        assert_eq!(gateway.stats().snapshot().exchanges, 1);
    }

    #[tokio::test]
    async fn large_reply_is_split_into_intermediate_packets() {
        let body: String = (0..45).map(|acs| cap_data(acs % 100, "SUCCESS")).collect();
        let (port, _server) = serve_once(Some(reply(&body)), Duration::ZERO).await;
        let gateway = gateway(port);
        let mut packets = Vec::new();
        gateway.process(&query_cap(7, vec![]), &mut packets).await;

        let kinds: Vec<_> = packets.iter().map(|packet| (packet.kind, packet.body.len())).collect();
        assert_eq!(
            kinds,
            vec![
                (ResponseKind::Acknowledge, 0),
                (ResponseKind::Intermediate, 42),
                (ResponseKind::Final, 3),
            ]
        );

        let order: Vec<u16> = packets
            .iter()
            .filter_map(|packet| match &packet.body {
                ResponseBody::Caps(caps) => Some(caps.iter().map(|cap| cap.cap_id.acs)),
                _ => None,
            })
            .flatten()
            .collect();
        assert_eq!(order, (0..45).collect::<Vec<u16>>());
        assert!(packets[1..].iter().all(|packet| packet.sequence == 7));
    }

    #[tokio::test]
    async fn escalated_reply_without_fragments_fails() {
        let failure = "<libreply><exceptions><reason>SLS0010I Invalid ACS 99</reason></exceptions>\
                       <uui_return_code>8</uui_return_code><uui_reason_code>4</uui_reason_code></libreply>";
        let (port, _server) = serve_once(Some(failure.into()), Duration::ZERO).await;
        let gateway = gateway(port);
        let mut packets = Vec::new();
        let status = gateway
            .process(&query_cap(3, vec![CapId::new(99, 0, 0)]), &mut packets)
            .await;
        assert!(!status.is_success());
        assert_eq!(packets.last().map(|packet| packet.status), Some(status));
        assert!(packets.last().is_some_and(ResponsePacket::is_final));
    }

    #[tokio::test]
    async fn unreachable_server_is_network_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        drop(listener);
        let gateway = gateway(port);
        let mut packets = Vec::new();
        let status = gateway.process(&query_cap(9, vec![]), &mut packets).await;
        assert_eq!(status, Status::NiFailure);
        assert_eq!(packets.len(), 2);
    }

    #[tokio::test]
    async fn cancel_of_unknown_request() {
        let gateway = gateway(1);
        let mut packets = Vec::new();
        let request = Request::new(5, RequestBody::Cancel { request_id: 999 });
        let status = gateway.process(&request, &mut packets).await;
        assert_eq!(status, Status::Success);
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].status, Status::MessageNotFound);
    }

    #[tokio::test]
    async fn cancel_after_completion_reports_complete() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        drop(listener);
        let gateway = gateway(port);
        let mut packets = Vec::new();
        assert_eq!(
            gateway.process(&query_cap(42, vec![]), &mut packets).await,
            Status::NiFailure
        );

        for seq in [43, 44] {
            packets.clear();
            let cancel = Request::new(seq, RequestBody::Cancel { request_id: 42 });
            assert_eq!(gateway.process(&cancel, &mut packets).await, Status::Success);
            assert_eq!(packets.len(), 1);
            assert_eq!(packets[0].status, Status::Complete);
            assert_eq!(packets[0].body, ResponseBody::Cancel { request_id: 42 });
        }
    }

    #[tokio::test]
    async fn cancel_interrupts_in_flight_query() {
        let (port, _server) = serve_once(None, Duration::from_secs(5)).await;
        let gateway = Arc::new(gateway(port));

        let worker = {
            let gateway = Arc::clone(&gateway);
            tokio::spawn(async move {
                let mut packets = Vec::new();
                let status = gateway.process(&query_cap(42, vec![]), &mut packets).await;
                (status, packets)
            })
        };
        while gateway.table().active_count() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let mut packets = Vec::new();
        let cancel = Request::new(43, RequestBody::Cancel { request_id: 42 });
        gateway.process(&cancel, &mut packets).await;
        assert_eq!(packets[0].status, Status::Success);

        let started = Instant::now();
        let (status, packets) = worker.await.expect("worker");
        assert_eq!(status, Status::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(packets.first().map(|packet| packet.kind), Some(ResponseKind::Acknowledge));
        assert_eq!(packets.last().map(|packet| packet.status), Some(Status::Cancelled));
        assert_eq!(gateway.stats().snapshot().cancellations, 1);
    }

    #[tokio::test]
    async fn idle_gates_commands_until_start() {
        let gateway = gateway(1);
        let mut packets = Vec::new();
        gateway.process(&Request::new(1, RequestBody::Idle), &mut packets).await;
        assert_eq!(gateway.state(), GatewayState::Idle);

        let define = Request::new(2, RequestBody::DefinePool { pools: vec![1] });
        assert_eq!(gateway.process(&define, &mut packets).await, Status::IdlePending);

        let vary = Request::new(3, RequestBody::Opaque(Command::Vary));
        assert_eq!(gateway.process(&vary, &mut packets).await, Status::UnsupportedCommand);

        gateway.process(&Request::new(4, RequestBody::Start), &mut packets).await;
        assert_eq!(gateway.state(), GatewayState::Active);

        packets.clear();
        assert_eq!(gateway.process(&define, &mut packets).await, Status::Success);
        let ResponseBody::Pools(pools) = &packets[0].body else {
            panic!("unexpected body {:?}", packets[0].body);
        };
        assert_eq!(pools[0].volumes, 300);
    }

    #[tokio::test]
    async fn idle_waits_for_running_requests() {
        let gateway = gateway(1);
        let running = gateway
            .table()
            .register(50, Command::Mount, None)
            .expect("register");
        let mut packets = Vec::new();
        gateway.process(&Request::new(1, RequestBody::Idle), &mut packets).await;
        assert_eq!(gateway.state(), GatewayState::IdlePending);

        let mount = Request::new(
            2,
            RequestBody::Mount {
                volume: "ABC123".into(),
                drives: vec![DriveId::default()],
            },
        );
        assert_eq!(gateway.process(&mount, &mut packets).await, Status::IdlePending);

        drop(running);
        let vary = Request::new(3, RequestBody::Opaque(Command::Vary));
        gateway.process(&vary, &mut packets).await;
        assert_eq!(gateway.state(), GatewayState::Idle);
    }

    #[tokio::test]
    async fn forced_idle_does_not_wait() {
        let gateway = gateway(1);
        let _running = gateway
            .table()
            .register(50, Command::Mount, None)
            .expect("register");
        let idle = Request::new(1, RequestBody::Idle).with_options(MessageOptions::FORCE);
        gateway.process(&idle, &mut Vec::new()).await;
        assert_eq!(gateway.state(), GatewayState::Idle);
    }

    #[tokio::test]
    async fn registration_failures() {
        let gateway = gateway(1).with_table_capacity(1);
        let _running = gateway
            .table()
            .register(50, Command::Mount, None)
            .expect("register");
        let mut packets = Vec::new();
        let define = Request::new(50, RequestBody::DefinePool { pools: vec![1] });
        assert_eq!(gateway.process(&define, &mut packets).await, Status::InvalidValue);
        let define = Request::new(51, RequestBody::DefinePool { pools: vec![1] });
        assert_eq!(
            gateway.process(&define, &mut packets).await,
            Status::MaxRequestsExceeded
        );
    }

    #[tokio::test]
    async fn query_server_reports_service_state() {
        let body = "<server_data><server_type>HSC</server_type><service_level>FULL</service_level>\
                    <termination_in_progress>N</termination_in_progress></server_data>";
        let (port, server) = serve_once(Some(reply(body)), Duration::ZERO).await;
        let gateway = gateway(port);
        let mut packets = Vec::new();
        let request = Request::new(11, RequestBody::Query(QueryCriteria::Server));
        assert_eq!(gateway.process(&request, &mut packets).await, Status::Success);

        assert_eq!(packets.len(), 2);
        let ResponseBody::Server(status) = &packets[1].body else {
            panic!("unexpected body {:?}", packets[1].body);
        };
        assert_eq!(status.state, State::Run);
        let request = String::from_utf8(server.await.expect("server")).expect("utf8");
        assert!(request.contains("<command><query_server></query_server></command>"));
    }

    #[tokio::test]
    async fn query_drive_resolves_type_from_captured_tables() {
        let body = "<drive_info><volser>ABC123</volser><model>T10000D</model>\
                    <status>MOUNTED</status><state>ONLINE</state><result>SUCCESS</result></drive_info>";
        let (port, server) = serve_once(Some(reply(body)), Duration::ZERO).await;
        let config = gateway(port).config().clone();
        let loader = StaticTables {
            drive_types: vec![DriveType {
                code: 5,
                name: "T10000D".into(),
            }],
            ..StaticTables::from_config(&config)
        };
        let gateway = Gateway::new(config, Box::new(loader));
        let drive = DriveId::new(0, 0, 10, 1);
        let request = Request::new(12, RequestBody::Query(QueryCriteria::Drive(vec![drive])));
        let mut packets = Vec::new();
        assert_eq!(gateway.process(&request, &mut packets).await, Status::Success);

        let ResponseBody::Drives(drives) = &packets[1].body else {
            panic!("unexpected body {:?}", packets[1].body);
        };
        assert_eq!(drives[0].drive_id, drive);
        assert_eq!(drives[0].status, Status::DriveInUse);
        assert_eq!(drives[0].drive_type, 5);
        let request = String::from_utf8(server.await.expect("server")).expect("utf8");
        assert!(request.contains("<drive_location_id>R:00:00:10:01</drive_location_id>"));
    }

    #[tokio::test]
    async fn query_drive_needs_at_least_one_drive() {
        let gateway = gateway(1);
        let mut packets = Vec::new();
        let request = Request::new(13, RequestBody::Query(QueryCriteria::Drive(vec![])));
        assert_eq!(gateway.process(&request, &mut packets).await, Status::CountTooSmall);
        assert_eq!(packets.len(), 1);
    }

    fn mount(seq: u32, drives: Vec<DriveId>) -> Request {
        Request::new(
            seq,
            RequestBody::Mount {
                volume: "ABC123".into(),
                drives,
            },
        )
    }

    #[tokio::test]
    async fn read_only_mount_answers_with_drive() {
        let body = "<mount_data><volser>ABC123</volser><drive_library_address><acs>00</acs>\
                    <lsm>01</lsm><panel>10</panel><drive_number>02</drive_number>\
                    </drive_library_address></mount_data>";
        let (port, server) = serve_once(Some(reply(body)), Duration::ZERO).await;
        let gateway = gateway(port);
        let mut packets = Vec::new();
        let request =
            mount(20, vec![DriveId::new(0, 1, 10, 2)]).with_options(MessageOptions::READONLY);
        assert_eq!(gateway.process(&request, &mut packets).await, Status::Success);

        assert_eq!(packets[0].kind, ResponseKind::Acknowledge);
        assert_eq!(packets[1].command, Command::Mount);
        assert_eq!(
            packets[1].body,
            ResponseBody::Mount {
                volume: "ABC123".into(),
                drive_id: DriveId::new(0, 1, 10, 2),
            }
        );
        let request = String::from_utf8(server.await.expect("server")).expect("utf8");
        assert!(request.contains(
            "<mount><volser>ABC123</volser><read_only>Y</read_only>\
             <drive_location_id>R:00:01:10:02</drive_location_id></mount>"
        ));
    }

    #[tokio::test]
    async fn mount_needs_exactly_one_drive() {
        let gateway = gateway(1);
        let mut packets = Vec::new();
        assert_eq!(gateway.process(&mount(21, vec![]), &mut packets).await, Status::CountTooSmall);
        let two = vec![DriveId::default(), DriveId::new(0, 0, 0, 1)];
        assert_eq!(gateway.process(&mount(22, two), &mut packets).await, Status::CountTooLarge);
        assert!(packets.iter().all(|packet| packet.kind == ResponseKind::Final));
    }

    #[tokio::test]
    async fn failed_dismount_maps_hsc_message() {
        let failure = "<libreply><header><els_version>7.1.0</els_version></header>\
                       <exceptions><reason>SLS5079I Volume ABC123 is mounted on another drive</reason>\
                       </exceptions><uui_return_code>8</uui_return_code></libreply>";
        let (port, _server) = serve_once(Some(failure.into()), Duration::ZERO).await;
        let gateway = gateway(port);
        let mut packets = Vec::new();
        let request = Request::new(
            23,
            RequestBody::Dismount {
                volume: "ABC123".into(),
                drive: DriveId::default(),
            },
        );
        assert_eq!(gateway.process(&request, &mut packets).await, Status::VolumeInDrive);
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[1].status, Status::VolumeInDrive);
    }

    #[tokio::test]
    async fn server_below_release_floor_is_incompatible() {
        let old = format!(
            "<libreply><header><els_version>6.2.0</els_version></header>{}\
             <uui_return_code>0</uui_return_code></libreply>",
            cap_data(0, "SUCCESS")
        );
        let (port, _server) = serve_once(Some(old), Duration::ZERO).await;
        let gateway = gateway(port);
        assert_eq!(gateway.config().release(), 710);
        let mut packets = Vec::new();
        let status = gateway.process(&query_cap(24, vec![]), &mut packets).await;
        assert_eq!(status, Status::IncompatibleServer);
        assert_eq!(packets.last().map(|packet| packet.status), Some(Status::IncompatibleServer));
    }

    #[test]
    fn render_query_builds_full_document() {
        let config = XapiConfig::new("mvs1", 8080).with_tapeplex("HSCQ");
        let xml = render_query(&config, 12, None, &QueryCriteria::Acs(vec![0])).expect("render");
        let xml = std::str::from_utf8(&xml).expect("utf8");
        assert!(xml.contains("<library_name>HSCQ</library_name>"));
        assert!(xml.contains("<query_acs><acs>00</acs></query_acs>"));

        let criteria = QueryCriteria::Volume(vec!["ABC123".into(), "ABC124".into()]);
        let xml = render_query(&config, 13, None, &criteria).expect("render");
        let xml = std::str::from_utf8(&xml).expect("utf8");
        assert!(xml.contains(
            "<query_volume_info><volume_list><volser>ABC123</volser><volser>ABC124</volser>"
        ));
    }
}
