// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![deny(missing_docs, clippy::all, clippy::pedantic)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

//! The per-worker state machine and its packet pipeline: exact-match cache
//! lookup, classifier fallback, upcall escalation, and action dispatch.
//!
//! A worker owns one [`emc::Emc`] and a reference to the shared
//! [`flowtable::FlowTable`] it was handed at construction (the "owning
//! worker, one EMC" rule; other workers on the same NUMA node share only
//! the flow table's ufid index and classifier reader, both safe for
//! concurrent readers). It is generic over two collaborators the datapath
//! root supplies: [`PacketIo`] for transmitting packets, and [`Upcall`]
//! for resolving misses.

mod dispatch;
mod upcall;

pub use dispatch::PacketIo;
pub use upcall::{InstallActions, Upcall, UpcallError, UpcallGate, UpcallKind, UpcallOutcome};

use actions::PortId;
use dispatch::{Dispatcher, Requeued};
use dpcls::FlowKey;
use dpcls::key::word;
use emc::Emc;
use flowtable::{FlowRecord, FlowTable, Ufid};
use net::Packet;
use net::buffer::PacketBufferMut;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// A worker's identifying index, stable for its lifetime.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct WorkerId(pub u32);

/// The sentinel id for the non-worker pseudo-worker (non-poll-mode ports
/// served off the worker loop).
pub const NON_CORE: WorkerId = WorkerId(u32::MAX);

/// The lifecycle states a worker thread passes through. The datapath root
/// drives these transitions; this crate only exposes the current state.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum WorkerState {
    /// Constructed, not yet started.
    None,
    /// Running its poll loop.
    Polling,
    /// A core-mask reconfiguration has been requested and is pending the
    /// next maintenance tick.
    Reloading,
    /// Exit has been requested; draining in-flight batches before exit.
    Draining,
    /// The worker's poll loop has returned.
    Exited,
}

/// How many pipeline iterations between maintenance ticks (EMC sweep,
/// reload check).
pub const MAINTENANCE_INTERVAL: u64 = 1024;

/// Per-call outcome counters for one [`Worker::run_iteration`], folded into
/// the worker's [`stats::WorkerCounters`] by the caller.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct PipelineStats {
    /// Packets resolved directly by the exact-match cache.
    pub exact_hit: usize,
    /// Packets resolved by the classifier after an EMC miss.
    pub masked_hit: usize,
    /// Packets escalated to the upcall path and resolved there.
    pub miss: usize,
    /// Packets dropped because the upcall path was unreachable or failed.
    pub lost: usize,
    /// Packets dropped for any other reason (recirculation cap, action
    /// error, transmit queue short-fall).
    pub dropped: usize,
}

impl PipelineStats {
    fn add(&mut self, other: PipelineStats) {
        self.exact_hit += other.exact_hit;
        self.masked_hit += other.masked_hit;
        self.miss += other.miss;
        self.lost += other.lost;
        self.dropped += other.dropped;
    }
}

/// The per-worker state machine: an exact-match cache in front of a shared
/// flow table, plus the upcall and transmit collaborators needed to carry
/// a miss all the way through to a resolved packet.
pub struct Worker<Io: PacketIo, U: Upcall<Buf = Io::Buf>> {
    id: WorkerId,
    state: WorkerState,
    emc: Emc<Arc<FlowRecord<Packet<Io::Buf>>>>,
    flow_table: Arc<FlowTable<Packet<Io::Buf>>>,
    upcall: Arc<U>,
    upcall_gate: Arc<UpcallGate>,
    stats: Arc<stats::WorkerCounters>,
    exit_requested: Arc<AtomicBool>,
    reload_requested: bool,
    cycle: u64,
    max_recirc_depth: u8,
}

impl<Io: PacketIo, U: Upcall<Buf = Io::Buf>> Worker<Io, U> {
    /// Construct a worker bound to `flow_table`, escalating misses to
    /// `upcall` behind `upcall_gate` and folding its per-iteration
    /// [`PipelineStats`] into `stats`.
    ///
    /// `emc` is built by the caller (typically via [`emc::Emc::with_shape`],
    /// sized from the running datapath's `emc_shift`/`emc_segs` settings)
    /// rather than constructed here, so that every worker on a datapath
    /// root shares the same configured shape without this crate depending
    /// on a config type. `max_recirc_depth` bounds cross-round
    /// recirculation the same way (see `vswitch-dp-worker`'s dispatcher).
    #[must_use]
    pub fn new(
        id: WorkerId,
        emc: Emc<Arc<FlowRecord<Packet<Io::Buf>>>>,
        flow_table: Arc<FlowTable<Packet<Io::Buf>>>,
        upcall: Arc<U>,
        upcall_gate: Arc<UpcallGate>,
        stats: Arc<stats::WorkerCounters>,
        exit_requested: Arc<AtomicBool>,
        max_recirc_depth: u8,
    ) -> Self {
        Worker {
            id,
            state: WorkerState::None,
            emc,
            flow_table,
            upcall,
            upcall_gate,
            stats,
            exit_requested,
            reload_requested: false,
            cycle: 0,
            max_recirc_depth,
        }
    }

    /// This worker's id.
    #[must_use]
    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// This worker's registered counters, for collaborators (the datapath
    /// root's poll loop) that record cycle accounting outside this type.
    #[must_use]
    pub fn stats(&self) -> &Arc<stats::WorkerCounters> {
        &self.stats
    }

    /// The worker's current lifecycle state.
    #[must_use]
    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Ask the worker to re-check its pending reload flag at its next
    /// maintenance tick (used after a core-mask reconfiguration).
    pub fn request_reload(&mut self) {
        self.reload_requested = true;
    }

    /// Whether the datapath root has asked this worker to exit.
    #[must_use]
    pub fn should_exit(&self) -> bool {
        self.exit_requested.load(Ordering::Acquire)
    }

    /// Mark this worker as draining (called by the datapath root once it
    /// has stopped feeding new bursts and is waiting for exit).
    pub fn begin_drain(&mut self) {
        self.state = WorkerState::Draining;
    }

    /// Run one ingress burst through the pipeline, draining any
    /// recirculated packets, and advance the maintenance cycle counter.
    pub fn run_iteration(&mut self, burst: Vec<Packet<Io::Buf>>, in_port: PortId, io: &mut Io) -> PipelineStats {
        self.state = WorkerState::Polling;
        let result = self.pipeline(burst, in_port, io);
        self.commit_stats(&result);
        self.cycle += 1;
        if self.cycle % MAINTENANCE_INTERVAL == 0 {
            self.maintenance();
        }
        result
    }

    #[allow(clippy::cast_possible_truncation)]
    fn commit_stats(&self, result: &PipelineStats) {
        self.stats.exact_hit.increment(result.exact_hit as u64);
        self.stats.masked_hit.increment(result.masked_hit as u64);
        self.stats.miss.increment(result.miss as u64);
        self.stats.lost.increment(result.lost as u64);
        self.stats.dropped.increment(result.dropped as u64);
    }

    /// The EMC -> classifier -> upcall -> dispatch pipeline for one ingress
    /// burst. Packets the action executor recirculates (tunnel push/pop,
    /// `Recirculate`) are requeued and reclassified within this same call,
    /// grouped by the ingress port and recirculation depth they re-enter
    /// at, until the queue is empty.
    fn pipeline(&mut self, burst: Vec<Packet<Io::Buf>>, in_port: PortId, io: &mut Io) -> PipelineStats {
        let started = Instant::now();
        let totals = self.pipeline_inner(burst, in_port, io);
        #[allow(clippy::cast_possible_truncation)]
        let elapsed_ns = started.elapsed().as_nanos() as u64;
        self.stats.cycles.process.increment(elapsed_ns);
        totals
    }

    fn pipeline_inner(&mut self, burst: Vec<Packet<Io::Buf>>, in_port: PortId, io: &mut Io) -> PipelineStats {
        let mut totals = PipelineStats::default();
        let mut queue: VecDeque<Requeued<Io::Buf>> = burst
            .into_iter()
            .map(|packet| Requeued {
                packet,
                in_port,
                recirc_id: 0,
                depth: 0,
            })
            .collect();

        while let Some(head) = queue.pop_front() {
            let round_in_port = head.in_port;
            let round_depth = head.depth;
            let mut round: Vec<Requeued<Io::Buf>> = vec![head];
            while let Some(front) = queue.front() {
                if front.in_port.0 == round_in_port.0 && front.depth == round_depth {
                    #[allow(clippy::unwrap_used)]
                    round.push(queue.pop_front().unwrap_or_else(|| unreachable!()));
                } else {
                    break;
                }
            }
            let (round_stats, mut recirc) = self.run_round(round, round_in_port, round_depth, io);
            totals.add(round_stats);
            queue.append(&mut recirc);
        }

        totals
    }

    /// Classify and dispatch one same-depth, same-ingress-port round: EMC
    /// lookup, classifier fallback for misses, upcall escalation for
    /// whatever the classifier also missed, then one `actions::execute`
    /// call per distinct flow touched this round.
    fn run_round(
        &mut self,
        burst: Vec<Requeued<Io::Buf>>,
        in_port: PortId,
        depth: u8,
        io: &mut Io,
    ) -> (PipelineStats, VecDeque<Requeued<Io::Buf>>) {
        let mut stats = PipelineStats::default();
        let mut touched: HashMap<Ufid, Touched<Io::Buf>> = HashMap::new();
        let mut misses: Vec<(FlowKey, Requeued<Io::Buf>)> = Vec::new();
        let mut recirc = VecDeque::new();
        let classify_started = Instant::now();

        for requeued in burst {
            let mut key = FlowKey::extract(&requeued.packet, requeued.in_port.0);
            key.set_word(word::RECIRC_ID, u64::from(requeued.recirc_id));
            let hash = key.compute_hash(depth);
            key.set_hash(hash);

            if let Some(flow) = self.emc.lookup(&key) {
                record_touch(&mut touched, &flow, &requeued.packet);
                flow.push_batch(requeued.packet);
                stats.exact_hit += 1;
            } else {
                misses.push((key, requeued));
            }
        }

        if !misses.is_empty() {
            let keys: Vec<FlowKey> = misses.iter().map(|(k, _)| k.clone()).collect();
            let (resolved, _all_found) = self.flow_table.lookup_batch(&keys);

            for ((key, requeued), flow) in misses.into_iter().zip(resolved) {
                match flow {
                    Some(flow) => {
                        self.emc.insert(key, Arc::clone(&flow));
                        record_touch(&mut touched, &flow, &requeued.packet);
                        flow.push_batch(requeued.packet);
                        stats.masked_hit += 1;
                    }
                    None => self.escalate(key, requeued.packet, in_port, depth, io, &mut recirc, &mut stats),
                }
            }
        }

        #[allow(clippy::cast_possible_truncation)]
        let classify_ns = classify_started.elapsed().as_nanos() as u64;
        self.stats.cycles.classify.increment(classify_ns);

        let mut escalated_packets = Vec::new();
        let now_ms = now_millis();

        for touch in touched.into_values() {
            touch.flow.stats().record(touch.packets, touch.bytes, touch.tcp_flags, now_ms);
            let snapshot = touch.flow.actions();
            let batch = touch.flow.take_batch();
            let mut dispatcher = Dispatcher {
                io,
                in_port,
                depth,
                max_recirc_depth: self.max_recirc_depth,
                recirc: &mut recirc,
                userspace: &mut escalated_packets,
                dropped: 0,
            };
            if actions::execute_with_limit(&snapshot, batch, &mut dispatcher, self.max_recirc_depth).is_err() {
                // recirculation cap exceeded, or an unsupported action
                // (conntrack): the remaining batch for this flow is
                // dropped, not lost (it never reached the upcall path).
                stats.dropped += dispatcher.dropped + 1;
            } else {
                stats.dropped += dispatcher.dropped;
            }
        }

        for packet in escalated_packets {
            let key = FlowKey::extract(&packet, in_port.0);
            self.escalate(key, packet, in_port, depth, io, &mut recirc, &mut stats);
        }

        (stats, recirc)
    }

    /// Resolve one packet the classifier could not match: try the upcall
    /// gate, then the upcall handler itself. A handler that installs a
    /// flow gets that flow pushed into the EMC for future packets in this
    /// microflow, but `outcome.actions` are also executed against `packet`
    /// right away, so the packet that triggered the miss is never left
    /// waiting for a later burst to flush its flow's batch; a handler that
    /// returns actions with no install is executed against this one packet
    /// directly.
    fn escalate(
        &mut self,
        key: FlowKey,
        packet: Packet<Io::Buf>,
        in_port: PortId,
        depth: u8,
        io: &mut Io,
        recirc: &mut VecDeque<Requeued<Io::Buf>>,
        stats: &mut PipelineStats,
    ) {
        let Some(_gate) = self.upcall_gate.try_enter() else {
            stats.lost += 1;
            return;
        };
        match self.upcall.upcall(&packet, &key, UpcallKind::Miss, self.id) {
            Ok(outcome) => match outcome.install {
                Some(install) => {
                    match self.flow_table.add(key.clone(), install.mask, Ufid::new(), self.id.0, install.actions) {
                        Ok(flow) => {
                            self.emc.insert(key, Arc::clone(&flow));
                            #[allow(clippy::cast_possible_truncation)]
                            let bytes = packet.buf().as_ref().len() as u64;
                            let tcp_flags = match &packet.headers().transport {
                                Some(net::Transport::Tcp(tcp)) => tcp.flags,
                                _ => 0,
                            };
                            flow.stats().record(1, bytes, tcp_flags, now_millis());
                            let snapshot = flow.actions();
                            let mut further_userspace = Vec::new();
                            let mut dispatcher = Dispatcher {
                                io,
                                in_port,
                                depth,
                                max_recirc_depth: self.max_recirc_depth,
                                recirc,
                                userspace: &mut further_userspace,
                                dropped: 0,
                            };
                            let executed =
                                actions::execute_with_limit(&snapshot, vec![packet], &mut dispatcher, self.max_recirc_depth).is_ok();
                            stats.dropped += dispatcher.dropped + usize::from(!executed) + further_userspace.len();
                            stats.miss += 1;
                        }
                        Err(_) => stats.dropped += 1,
                    }
                }
                None => {
                    let executed = execute_one_off(&outcome.actions, packet);
                    stats.miss += 1;
                    stats.dropped += if executed { 0 } else { 1 };
                }
            },
            Err(_) => stats.lost += 1,
        }
    }

    /// Housekeeping run every [`MAINTENANCE_INTERVAL`] cycles: one EMC
    /// sweep step, and a pending reload check. Epoch quiescence for the
    /// classifier's subtable list is handled internally by `left_right` on
    /// the reader side; this worker never announces separately.
    fn maintenance(&mut self) {
        self.emc.slow_sweep();
        if self.reload_requested {
            self.reload_requested = false;
            self.state = WorkerState::Reloading;
        }
    }
}

struct Touched<Buf: PacketBufferMut> {
    flow: Arc<FlowRecord<Packet<Buf>>>,
    packets: u64,
    bytes: u64,
    tcp_flags: u8,
}

fn record_touch<Buf: PacketBufferMut>(
    touched: &mut HashMap<Ufid, Touched<Buf>>,
    flow: &Arc<FlowRecord<Packet<Buf>>>,
    packet: &Packet<Buf>,
) {
    let entry = touched.entry(flow.ufid()).or_insert_with(|| Touched {
        flow: Arc::clone(flow),
        packets: 0,
        bytes: 0,
        tcp_flags: 0,
    });
    entry.packets += 1;
    #[allow(clippy::cast_possible_truncation)]
    let len = packet.buf().as_ref().len() as u64;
    entry.bytes += len;
    if let Some(net::Transport::Tcp(tcp)) = &packet.headers().transport {
        entry.tcp_flags |= tcp.flags;
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Execute one `Userspace`-triggered action list against a single packet
/// with no flow batching and no further output transmission: the handler
/// that returned these actions did so without asking for a flow install,
/// which in this pipeline only happens for the one-off diagnostic/sample
/// case, so the only action worth honoring here is the implicit drop.
/// Returns whether the action list ran without error.
fn execute_one_off<Buf: PacketBufferMut>(actions: &[actions::Action], packet: Packet<Buf>) -> bool {
    struct Sink<Buf: PacketBufferMut>(std::marker::PhantomData<Buf>);
    impl<Buf: PacketBufferMut> actions::ActionSink for Sink<Buf> {
        type Packet = Packet<Buf>;
        fn output(&mut self, _port: PortId, _packets: Vec<Self::Packet>) {}
        fn tunnel_push(&mut self, _data: actions::TunnelData, _packets: Vec<Self::Packet>) {}
        fn tunnel_pop(&mut self, _port: PortId, _packets: Vec<Self::Packet>) {}
        fn edit(&mut self, _packets: &mut [Self::Packet], _action: &actions::Action) {}
        fn recirculate(&mut self, _recirc_id: u32, _packets: Vec<Self::Packet>) {}
        fn userspace(&mut self, _userdata: &[u8], _packets: Vec<Self::Packet>) {}
        fn hash(&mut self, _packets: &[Self::Packet]) {}
    }
    let mut sink = Sink(std::marker::PhantomData);
    actions::execute(actions, vec![packet], &mut sink).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatch::reference::ReferencePorts;
    use dpcls::Mask;
    use net::buffer::test_buffer::TestBuffer;

    struct StaticUpcall {
        outcome: Result<UpcallOutcome, UpcallError>,
    }
    impl Upcall for StaticUpcall {
        type Buf = TestBuffer;
        fn upcall(
            &self,
            _packet: &Packet<Self::Buf>,
            _key: &FlowKey,
            _kind: UpcallKind,
            _worker_id: WorkerId,
        ) -> Result<UpcallOutcome, UpcallError> {
            self.outcome.clone()
        }
    }

    fn udp_frame(dst_port: u16) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&[0xAA; 6]);
        buf.extend_from_slice(&[0xBB; 6]);
        buf.extend_from_slice(&net::headers::ethertype::IPV4.to_be_bytes());
        buf.push(0x45);
        buf.push(0);
        buf.extend_from_slice(&0u16.to_be_bytes());
        buf.extend_from_slice(&0u16.to_be_bytes());
        buf.extend_from_slice(&0u16.to_be_bytes());
        buf.push(64);
        buf.push(net::headers::ip_proto::UDP);
        buf.extend_from_slice(&0u16.to_be_bytes());
        buf.extend_from_slice(&[10, 0, 0, 1]);
        buf.extend_from_slice(&[10, 0, 0, 2]);
        buf.extend_from_slice(&1000u16.to_be_bytes());
        buf.extend_from_slice(&dst_port.to_be_bytes());
        buf.extend_from_slice(&0u16.to_be_bytes());
        buf.extend_from_slice(&0u16.to_be_bytes());
        buf
    }

    fn worker_with_upcall(
        outcome: Result<UpcallOutcome, UpcallError>,
    ) -> (Worker<ReferencePorts, StaticUpcall>, Arc<FlowTable<Packet<TestBuffer>>>) {
        let flow_table = Arc::new(FlowTable::new());
        let worker = Worker::new(
            WorkerId(0),
            Emc::new(),
            Arc::clone(&flow_table),
            Arc::new(StaticUpcall { outcome }),
            Arc::new(UpcallGate::new()),
            Arc::new(stats::WorkerCounters::register(0)),
            Arc::new(AtomicBool::new(false)),
            actions::MAX_RECIRC_DEPTH,
        );
        (worker, flow_table)
    }

    #[test]
    fn miss_installs_a_flow_and_later_packets_hit_the_emc() {
        let mask: Arc<Mask> = {
            let mut m = FlowKey::new();
            m.set_word(word::IN_PORT, u64::MAX);
            Arc::new(m)
        };
        let (mut worker, _flow_table) = worker_with_upcall(Ok(UpcallOutcome {
            actions: vec![actions::Action::Output(PortId(7))],
            install: Some(InstallActions {
                mask,
                actions: vec![actions::Action::Output(PortId(7))],
            }),
        }));
        let mut io = ReferencePorts::new();

        let packet = Packet::new(TestBuffer::from_raw_data(&udp_frame(2000))).unwrap_or_else(|_| unreachable!());
        let stats = worker.run_iteration(vec![packet], PortId(1), &mut io);
        assert_eq!(stats.miss, 1);
        assert_eq!(io.sent_on(PortId(7)), 1);

        let packet2 = Packet::new(TestBuffer::from_raw_data(&udp_frame(2000))).unwrap_or_else(|_| unreachable!());
        let stats2 = worker.run_iteration(vec![packet2], PortId(1), &mut io);
        assert_eq!(stats2.exact_hit, 1);
        assert_eq!(io.sent_on(PortId(7)), 2);
    }

    #[test]
    fn miss_without_install_executes_once_and_does_not_cache() {
        let (mut worker, _flow_table) = worker_with_upcall(Ok(UpcallOutcome {
            actions: vec![actions::Action::Output(PortId(3))],
            install: None,
        }));
        let mut io = ReferencePorts::new();
        let packet = Packet::new(TestBuffer::from_raw_data(&udp_frame(3000))).unwrap_or_else(|_| unreachable!());
        let stats = worker.run_iteration(vec![packet], PortId(1), &mut io);
        assert_eq!(stats.miss, 1);
        // the one-off sink does not actually transmit: no flow was
        // installed to carry the output action through the real pipeline.
        assert_eq!(io.sent_on(PortId(3)), 0);
    }

    #[test]
    fn gate_closed_counts_as_lost() {
        let (mut worker, _flow_table) = worker_with_upcall(Ok(UpcallOutcome::default()));
        let gate = Arc::new(UpcallGate::new());
        let _closed = gate.close();
        worker.upcall_gate = Arc::clone(&gate);
        let mut io = ReferencePorts::new();
        let packet = Packet::new(TestBuffer::from_raw_data(&udp_frame(4000))).unwrap_or_else(|_| unreachable!());
        let stats = worker.run_iteration(vec![packet], PortId(1), &mut io);
        assert_eq!(stats.lost, 1);
    }

    #[test]
    fn upcall_error_counts_as_lost() {
        let (mut worker, _flow_table) = worker_with_upcall(Err(UpcallError::Failed));
        let mut io = ReferencePorts::new();
        let packet = Packet::new(TestBuffer::from_raw_data(&udp_frame(5000))).unwrap_or_else(|_| unreachable!());
        let stats = worker.run_iteration(vec![packet], PortId(1), &mut io);
        assert_eq!(stats.lost, 1);
    }

    #[test]
    fn run_iteration_records_process_and_classify_cycles() {
        let (mut worker, _flow_table) = worker_with_upcall(Ok(UpcallOutcome::default()));
        let mut io = ReferencePorts::new();
        let packet = Packet::new(TestBuffer::from_raw_data(&udp_frame(6000))).unwrap_or_else(|_| unreachable!());
        worker.run_iteration(vec![packet], PortId(1), &mut io);
        // a worker's counters are shared via Arc, not cloned per-test, so
        // these are the same registration this worker recorded into.
        assert!(worker.stats().cycles.process.value() > 0);
        assert!(worker.stats().cycles.classify.value() > 0);
    }

    #[test]
    fn recirculation_stops_at_max_depth_instead_of_looping_forever() {
        let mask: Arc<Mask> = {
            let mut m = FlowKey::new();
            m.set_word(word::IN_PORT, u64::MAX);
            Arc::new(m)
        };
        let (mut worker, _flow_table) = worker_with_upcall(Ok(UpcallOutcome {
            actions: vec![actions::Action::Recirculate(0)],
            install: Some(InstallActions {
                mask,
                actions: vec![actions::Action::Recirculate(0)],
            }),
        }));
        let mut io = ReferencePorts::new();
        let packet = Packet::new(TestBuffer::from_raw_data(&udp_frame(7000))).unwrap_or_else(|_| unreachable!());

        // a flow that always recirculates would loop forever without a
        // depth bound; this call must return rather than hang, and the
        // round that would cross MAX_RECIRC_DEPTH must be counted dropped
        // instead of requeued.
        let stats = worker.run_iteration(vec![packet], PortId(1), &mut io);
        assert_eq!(stats.dropped, 1);
        assert_eq!(io.sent_on(PortId(7)), 0);
    }
}
