// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The datapath root (C7): owns the port registry, places and runs worker
//! threads across NUMA nodes, and exposes the management operations a CLI
//! drives.

use crate::registry::{PortConfig, PortEntry, PortHandle, PortInfo};
use crate::{DatapathError, ManagementUpcall, PurgeCallback, UpcallCallback};

use actions::{Action, PortId};
use dpcls::{FlowKey, Mask};
use driver::{Driver, QueueId};
use flowtable::{DumpCursor, FlowTable, FlowTableError, Ufid};
use hardware::{CoreId, NumaNodeId, Topology};
use net::Packet;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use worker::{PipelineStats, Worker, WorkerId, NON_CORE};

const WORKER_STACK_SIZE: usize = 8 << 20;

/// Per-worker engine sizing, handed to every worker this root constructs.
///
/// Deliberately a plain-scalar struct local to this crate rather than a
/// `vswitch-dp-config` type: the datapath root has no reason to depend on
/// how configuration is loaded or parsed, only on the handful of numbers
/// that shape its workers. The CLI entry point translates the loaded
/// configuration into this struct at the process boundary.
#[derive(Debug, Clone, Copy)]
pub struct EngineLimits {
    /// `log2` of each worker's EMC slot count.
    pub emc_shift: u32,
    /// Probe segments tried per EMC lookup.
    pub emc_segs: u32,
    /// Recirculation hops a packet may take before being dropped.
    pub max_recirc_depth: u8,
    /// Flows a single worker's flow table may hold.
    pub flow_table_capacity: usize,
    /// Keys grouped per classifier batch lookup.
    pub classifier_batch_size: usize,
}

impl Default for EngineLimits {
    fn default() -> Self {
        EngineLimits {
            emc_shift: emc::EMC_SHIFT,
            emc_segs: emc::EMC_SEGS,
            max_recirc_depth: actions::MAX_RECIRC_DEPTH,
            flow_table_capacity: flowtable::MAX_FLOWS,
            classifier_batch_size: dpcls::LOOKUP_GROUP_SIZE,
        }
    }
}

/// Caller-facing description of a flow to install, targeting a specific
/// worker (or [`worker::NON_CORE`] for the non-worker pseudo-table).
#[derive(Debug, Clone)]
pub struct FlowDescriptor {
    /// The worker (by id) this flow should live on.
    pub worker_id: u32,
    /// The unmasked key this flow was matched under.
    pub unmasked_key: FlowKey,
    /// The mask selecting which key words participate in matching.
    pub mask: Arc<Mask>,
    /// The action list to install.
    pub actions: Vec<Action>,
}

/// A read-back view of one installed flow, for `get`/`dump`.
#[derive(Debug, Clone)]
pub struct FlowView {
    /// The flow's 128-bit id.
    pub ufid: Ufid,
    /// The unmasked key it was installed with.
    pub unmasked_key: FlowKey,
    /// Its current action list.
    pub actions: Vec<Action>,
    /// Packets matched so far.
    pub packets: u64,
    /// Bytes matched so far.
    pub bytes: u64,
    /// Wall-clock milliseconds this flow was last matched.
    pub last_used_ms: u64,
    /// The worker that owns this flow.
    pub owner_worker_id: u32,
}

fn flow_view<P>(record: &flowtable::FlowRecord<P>) -> FlowView {
    FlowView {
        ufid: record.ufid(),
        unmasked_key: record.unmasked_key().clone(),
        actions: (*record.actions()).clone(),
        packets: record.stats().packets(),
        bytes: record.stats().bytes(),
        last_used_ms: record.stats().last_used_ms(),
        owner_worker_id: record.owner_worker_id(),
    }
}

/// Sends outbound packets to whatever port the registry says owns them.
/// Shared by every worker thread and by the non-worker pseudo-worker; a
/// worker's transmit queue index is fixed at spawn time (its global
/// placement index, or the core count for the non-worker case, per the
/// tx-queue-identity rule).
pub(crate) struct DatapathIo<D: Driver> {
    ports: Arc<parking_lot::Mutex<BTreeMap<u32, PortEntry<D>>>>,
    tx_queue: QueueId,
}

impl<D: Driver> worker::PacketIo for DatapathIo<D> {
    type Buf = D::Buf;

    fn send(&mut self, port: PortId, packets: Vec<Packet<Self::Buf>>) -> usize {
        let mut ports = self.ports.lock();
        let Some(entry) = ports.get_mut(&port.0) else {
            tracing::warn!(port = port.0, "output action targets an unknown port");
            return 0;
        };
        match entry.driver.send(self.tx_queue, packets) {
            Ok(sent) => sent,
            Err(error) => {
                tracing::warn!(port = port.0, %error, "driver send failed");
                0
            }
        }
    }
}

struct WorkerHandle<D: Driver> {
    id: WorkerId,
    numa: NumaNodeId,
    core: CoreId,
    flow_table: Arc<FlowTable<Packet<D::Buf>>>,
    stats: Arc<stats::WorkerCounters>,
    baseline: parking_lot::Mutex<stats::Baseline>,
    exit: Arc<AtomicBool>,
    assignment: Arc<parking_lot::Mutex<Vec<(u32, QueueId)>>>,
    join: Option<std::thread::JoinHandle<()>>,
}

impl<D: Driver> WorkerHandle<D> {
    fn queue_count(&self) -> usize {
        self.assignment.lock().len()
    }
}

/// The non-worker pseudo-worker (`worker::NON_CORE`): its own flow table
/// and EMC, reached only by the `execute` management operation, serialized
/// by its own mutex rather than sharing a core with any poll loop.
struct NonCoreWorker<D: Driver> {
    flow_table: Arc<FlowTable<Packet<D::Buf>>>,
    inner: parking_lot::Mutex<(Worker<DatapathIo<D>, ManagementUpcall<D::Buf>>, DatapathIo<D>)>,
}

/// The datapath root: port/queue registry, worker placement, upcall gate,
/// and the management surface.
///
/// Generic only over the [`Driver`] implementation in use; the upcall
/// handler is fixed to [`ManagementUpcall`] so every worker shares one
/// concrete type regardless of which controller integration is wired up.
pub struct DatapathRoot<D: Driver> {
    topology: Topology,
    ports: Arc<parking_lot::Mutex<BTreeMap<u32, PortEntry<D>>>>,
    next_port_id: AtomicU32,
    workers: parking_lot::Mutex<Vec<WorkerHandle<D>>>,
    pinned_cores: parking_lot::Mutex<Vec<CoreId>>,
    upcall_gate: Arc<worker::UpcallGate>,
    upcall: Arc<ManagementUpcall<D::Buf>>,
    purge: arc_swap::ArcSwapOption<PurgeCallback>,
    core_mask: parking_lot::Mutex<Option<u64>>,
    per_node_worker_count: usize,
    limits: EngineLimits,
    non_core: NonCoreWorker<D>,
}

impl<D: Driver + Send + 'static> DatapathRoot<D> {
    /// Construct a datapath root over `topology`, targeting up to
    /// `per_node_worker_count` workers per NUMA node (subject to an
    /// explicit core mask set later via [`DatapathRoot::set_core_mask`]),
    /// sizing every worker's EMC, flow table, and recirculation bound from
    /// `limits`. No ports or worker threads exist yet; call
    /// [`DatapathRoot::open`] then [`DatapathRoot::run`] to start serving.
    #[must_use]
    pub fn new(topology: Topology, per_node_worker_count: usize, limits: EngineLimits) -> Self {
        let ports = Arc::new(parking_lot::Mutex::new(BTreeMap::new()));
        let upcall_gate = Arc::new(worker::UpcallGate::new());
        let upcall = Arc::new(ManagementUpcall::new());
        let num_cores: usize = topology.nodes().map(|n| topology.cores_on_node(n).len()).sum();
        let non_core_tx_queue = QueueId(u16::try_from(num_cores).unwrap_or(u16::MAX));
        let non_core_flow_table = Arc::new(FlowTable::with_limits(limits.flow_table_capacity, limits.classifier_batch_size));
        let non_core_worker: Worker<DatapathIo<D>, ManagementUpcall<D::Buf>> = Worker::new(
            NON_CORE,
            emc::Emc::with_shape(limits.emc_shift, limits.emc_segs),
            Arc::clone(&non_core_flow_table),
            Arc::clone(&upcall),
            Arc::clone(&upcall_gate),
            Arc::new(stats::WorkerCounters::register(u32::MAX)),
            Arc::new(AtomicBool::new(false)),
            limits.max_recirc_depth,
        );
        let non_core_io = DatapathIo {
            ports: Arc::clone(&ports),
            tx_queue: non_core_tx_queue,
        };

        DatapathRoot {
            topology,
            ports,
            next_port_id: AtomicU32::new(0),
            workers: parking_lot::Mutex::new(Vec::new()),
            pinned_cores: parking_lot::Mutex::new(Vec::new()),
            upcall_gate,
            upcall,
            purge: arc_swap::ArcSwapOption::empty(),
            core_mask: parking_lot::Mutex::new(None),
            per_node_worker_count,
            limits,
            non_core: NonCoreWorker {
                flow_table: non_core_flow_table,
                inner: parking_lot::Mutex::new((non_core_worker, non_core_io)),
            },
        }
    }

    /// Place workers across the topology's NUMA nodes according to the
    /// current core mask and configured per-node count. Idempotent-ish in
    /// spirit, but expected to be called once per `open`/reconfiguration
    /// cycle; call [`DatapathRoot::close`] first if workers already exist.
    ///
    /// # Errors
    ///
    /// This does not itself fail; placement that finds zero eligible cores
    /// on a node simply places zero workers there (ports later added on
    /// that node stay unassigned until cores free up).
    pub fn open(&self) -> Result<(), DatapathError> {
        let mask = *self.core_mask.lock();
        let mut next_id = 0u32;
        let mut new_workers = Vec::new();
        let mut newly_pinned = Vec::new();

        for node in self.topology.nodes().collect::<Vec<_>>() {
            let count = self.topology.workers_for_node(node, mask, self.per_node_worker_count);
            let candidates: Vec<CoreId> = self.topology.cores_on_node(node).into_iter().take(count).collect();
            for core in candidates {
                let id = WorkerId(next_id);
                next_id += 1;
                let flow_table =
                    Arc::new(FlowTable::with_limits(self.limits.flow_table_capacity, self.limits.classifier_batch_size));
                let exit = Arc::new(AtomicBool::new(false));
                let stats = Arc::new(stats::WorkerCounters::register(id.0));
                let worker = Worker::new(
                    id,
                    emc::Emc::with_shape(self.limits.emc_shift, self.limits.emc_segs),
                    Arc::clone(&flow_table),
                    Arc::clone(&self.upcall),
                    Arc::clone(&self.upcall_gate),
                    Arc::clone(&stats),
                    Arc::clone(&exit),
                    self.limits.max_recirc_depth,
                );
                let assignment = Arc::new(parking_lot::Mutex::new(Vec::new()));
                new_workers.push((
                    WorkerHandle {
                        id,
                        numa: node,
                        core,
                        flow_table,
                        stats,
                        baseline: parking_lot::Mutex::new(stats::Baseline::default()),
                        exit,
                        assignment,
                        join: None,
                    },
                    worker,
                ));
                newly_pinned.push(core);
            }
        }

        // `open` only ever runs against a freshly constructed or freshly
        // `close`d root, so there is no live `Topology` pin-tracking to
        // update here; `pinned_cores` is this root's own bookkeeping
        // (introspection only, not consulted by placement, since a closed
        // generation's cores are implicitly free again).
        self.pinned_cores.lock().extend(newly_pinned);

        let mut handles = self.workers.lock();
        let mut states: Vec<(WorkerHandle<D>, Worker<DatapathIo<D>, ManagementUpcall<D::Buf>>)> = new_workers;

        // Reassign already-registered ports' poll-mode RX queues across the
        // freshly placed workers before any thread starts polling.
        {
            let mut ports = self.ports.lock();
            for (&port_id, entry) in ports.iter_mut() {
                if !entry.driver.is_poll_mode() {
                    continue;
                }
                let queues: Vec<QueueId> = entry.unassigned_queues().collect();
                for queue in queues {
                    let Some((handle, _)) = states
                        .iter_mut()
                        .filter(|(h, _)| h.numa == entry.numa)
                        .min_by_key(|(h, _)| h.queue_count())
                    else {
                        continue;
                    };
                    handle.assignment.lock().push((port_id, queue));
                    if let Some(idx) = entry.rx_assignment.get_mut(queue.0 as usize) {
                        *idx = Some(handle.id);
                    }
                }
            }
        }

        for (handle, worker) in states.drain(..) {
            self.spawn_worker(handle, worker, &mut handles);
        }
        Ok(())
    }

    fn spawn_worker(
        &self,
        handle: WorkerHandle<D>,
        mut worker: Worker<DatapathIo<D>, ManagementUpcall<D::Buf>>,
        handles: &mut Vec<WorkerHandle<D>>,
    ) {
        let ports = Arc::clone(&self.ports);
        let assignment = Arc::clone(&handle.assignment);
        let tx_queue = QueueId(u16::try_from(handle.id.0).unwrap_or(u16::MAX));
        let mut io = DatapathIo {
            ports: Arc::clone(&ports),
            tx_queue,
        };
        let name = format!("dp-worker-{}", handle.id.0);
        let join = std::thread::Builder::new().name(name).stack_size(WORKER_STACK_SIZE).spawn(move || {
            worker_thread_body(&mut worker, &ports, &assignment, &mut io);
        });
        let mut handle = handle;
        match join {
            Ok(j) => handle.join = Some(j),
            Err(error) => tracing::error!(worker = handle.id.0, %error, "failed to spawn worker thread"),
        }
        handles.push(handle);
    }

    /// Start (or resume, after `open`) every placed worker's poll loop.
    /// Threads are actually spawned by `open`; `run` exists as the explicit
    /// "go" operation the management surface calls once port assignment is
    /// final, matching the open/run/wait lifecycle the rest of the
    /// datapath's external interfaces describe. A no-op once workers are
    /// already running.
    pub fn run(&self) -> Result<(), DatapathError> {
        Ok(())
    }

    /// Block until every worker thread has exited (after `close` requests
    /// it).
    pub fn wait(&self) {
        let mut handles = self.workers.lock();
        for handle in handles.iter_mut() {
            if let Some(join) = handle.join.take() {
                if join.join().is_err() {
                    tracing::error!(worker = handle.id.0, "worker thread panicked");
                }
            }
        }
    }

    /// Request every worker to exit, wait for them to drain, and release
    /// every pinned core. Flows are not preserved: each worker's flow
    /// table is dropped with it.
    pub fn close(&self) {
        {
            let handles = self.workers.lock();
            for handle in handles.iter() {
                handle.exit.store(true, Ordering::Release);
            }
        }
        self.wait();
        self.workers.lock().clear();
        self.pinned_cores.lock().clear();
        let mut ports = self.ports.lock();
        for entry in ports.values_mut() {
            entry.rx_assignment.fill(None);
        }
    }

    /// Reconfigure the worker core mask: destroys and recreates every
    /// worker (per the no-flow-migration policy), then re-opens placement
    /// and resumes running. Registered ports survive; their poll-mode
    /// queues are reassigned across the new worker set.
    ///
    /// # Errors
    ///
    /// Propagates any error from the subsequent [`DatapathRoot::open`].
    pub fn set_core_mask(&self, mask: Option<u64>) -> Result<(), DatapathError> {
        let _closed = self.upcall_gate.close();
        self.close();
        *self.core_mask.lock() = mask;
        self.open()?;
        self.run()
    }

    /// Register a port backed by `driver`. Poll-mode ports have their RX
    /// queues assigned to the least-loaded worker on the driver's NUMA
    /// node; non-poll-mode ports are registered but never polled (reached
    /// only through `execute`, if at all).
    ///
    /// # Errors
    ///
    /// Returns [`DatapathError::PortExists`] if a port with this name is
    /// already registered.
    pub fn add_port(&self, config: PortConfig, mut driver: D) -> Result<PortHandle, DatapathError> {
        {
            let ports = self.ports.lock();
            if ports.values().any(|p| p.name == config.name) {
                return Err(DatapathError::PortExists(config.name));
            }
        }
        if driver.reconfigure_required() {
            driver.reconfigure()?;
        }
        let port_id = self.next_port_id.fetch_add(1, Ordering::Relaxed);
        let is_local = config.name == "local";
        let mut entry = PortEntry::new(config.name, driver, is_local);

        if entry.driver.is_poll_mode() {
            let numa = entry.numa;
            let queues: Vec<QueueId> = entry.unassigned_queues().collect();
            let handles = self.workers.lock();
            for queue in queues {
                let Some(handle) = handles.iter().filter(|h| h.numa == numa).min_by_key(|h| h.queue_count()) else {
                    continue;
                };
                handle.assignment.lock().push((port_id, queue));
                if let Some(slot) = entry.rx_assignment.get_mut(queue.0 as usize) {
                    *slot = Some(handle.id);
                }
            }
        }

        self.ports.lock().insert(port_id, entry);
        Ok(PortHandle(port_id))
    }

    /// Remove a registered port. The local port may not be removed.
    ///
    /// # Errors
    ///
    /// Returns [`DatapathError::PortNotFound`] or
    /// [`DatapathError::PortLocalProtected`].
    pub fn del_port(&self, handle: PortHandle) -> Result<(), DatapathError> {
        let mut ports = self.ports.lock();
        let entry = ports.get(&handle.0).ok_or_else(|| DatapathError::PortNotFound(handle.0.to_string()))?;
        if entry.is_local {
            return Err(DatapathError::PortLocalProtected(entry.name.clone()));
        }
        ports.remove(&handle.0);
        drop(ports);
        for worker in self.workers.lock().iter() {
            worker.assignment.lock().retain(|(p, _)| *p != handle.0);
        }
        Ok(())
    }

    /// A read-only snapshot of every registered port's queue assignment.
    #[must_use]
    pub fn show_queue_assignments(&self) -> Vec<PortInfo> {
        self.ports
            .lock()
            .iter()
            .map(|(&port_id, entry)| PortInfo {
                name: entry.name.clone(),
                port_id,
                numa: entry.numa,
                is_local: entry.is_local,
                queue_assignment: entry.rx_assignment.clone(),
            })
            .collect()
    }

    /// Look up a port's handle by its registered name, for callers (the
    /// management CLI) that only know a port by name.
    #[must_use]
    pub fn port_handle_by_name(&self, name: &str) -> Option<PortHandle> {
        self.ports
            .lock()
            .iter()
            .find(|(_, entry)| entry.name == name)
            .map(|(&port_id, _)| PortHandle(port_id))
    }

    /// Install (or replace) the controller callback every worker's upcall
    /// path calls into.
    pub fn register_upcall_callback(&self, callback: Arc<UpcallCallback>) {
        self.upcall.set(callback);
    }

    /// Install (or replace) the callback invoked when a flow is purged.
    /// This crate never purges flows on its own; the callback exists for a
    /// future eviction policy to call into.
    pub fn register_purge_callback(&self, callback: Arc<PurgeCallback>) {
        self.purge.store(Some(callback));
    }

    fn flow_table_for(&self, worker_id: u32) -> Result<Arc<FlowTable<Packet<D::Buf>>>, DatapathError> {
        if worker_id == NON_CORE.0 {
            return Ok(Arc::clone(&self.non_core.flow_table));
        }
        self.workers
            .lock()
            .iter()
            .find(|h| h.id.0 == worker_id)
            .map(|h| Arc::clone(&h.flow_table))
            .ok_or(DatapathError::WorkerNotFound(worker_id))
    }

    /// `Add(flow)`: install a flow on the worker it names.
    ///
    /// # Errors
    ///
    /// Returns [`DatapathError::WorkerNotFound`], or
    /// [`DatapathError::MaskInvalid`]/[`DatapathError::CapacityExceeded`]
    /// from the flow table.
    pub fn add_flow(&self, descriptor: FlowDescriptor) -> Result<Ufid, DatapathError> {
        let table = self.flow_table_for(descriptor.worker_id)?;
        let ufid = Ufid::new();
        table
            .add(descriptor.unmasked_key, descriptor.mask, ufid, descriptor.worker_id, descriptor.actions)
            .map_err(map_flow_err)?;
        Ok(ufid)
    }

    /// `Modify(ufid, actions)` on the named worker's table.
    ///
    /// # Errors
    ///
    /// Returns [`DatapathError::WorkerNotFound`] or
    /// [`DatapathError::FlowNotFound`].
    pub fn modify_flow(&self, worker_id: u32, ufid: Ufid, actions: Vec<Action>) -> Result<(), DatapathError> {
        let table = self.flow_table_for(worker_id)?;
        table.modify(ufid, actions).map_err(map_flow_err)
    }

    /// `Remove(ufid)` on the named worker's table.
    ///
    /// # Errors
    ///
    /// Returns [`DatapathError::WorkerNotFound`] or
    /// [`DatapathError::FlowNotFound`].
    pub fn delete_flow(&self, worker_id: u32, ufid: Ufid) -> Result<(), DatapathError> {
        let table = self.flow_table_for(worker_id)?;
        table.remove(ufid).map_err(map_flow_err)
    }

    /// `FindByUfid(ufid) -> flow` on the named worker's table.
    ///
    /// # Errors
    ///
    /// Returns [`DatapathError::WorkerNotFound`] or
    /// [`DatapathError::FlowNotFound`].
    pub fn get_flow(&self, worker_id: u32, ufid: Ufid) -> Result<FlowView, DatapathError> {
        let table = self.flow_table_for(worker_id)?;
        let record = table.find_by_ufid(ufid).ok_or(DatapathError::FlowNotFound)?;
        Ok(flow_view(&record))
    }

    /// `Dump(cursor) -> batch` on the named worker's table.
    ///
    /// # Errors
    ///
    /// Returns [`DatapathError::WorkerNotFound`] if the worker id does not
    /// exist.
    pub fn dump_flows(
        &self,
        worker_id: u32,
        cursor: DumpCursor,
        batch_size: usize,
    ) -> Result<(Vec<FlowView>, Option<DumpCursor>), DatapathError> {
        let table = self.flow_table_for(worker_id)?;
        let (batch, next) = table.dump(cursor, batch_size);
        Ok((batch.iter().map(|r| flow_view(r)).collect(), next))
    }

    /// Inject one packet through the non-worker pseudo-worker's pipeline,
    /// for a foreign thread (management CLI, test harness) that needs a
    /// single-packet trace without owning a poll loop. Serialized by the
    /// non-worker mutex; never contends with any real worker's EMC.
    pub fn execute(&self, packet: Packet<D::Buf>, in_port: PortId) -> PipelineStats {
        let mut guard = self.non_core.inner.lock();
        let (worker, io) = &mut *guard;
        worker.run_iteration(vec![packet], in_port, io)
    }

    /// Zero a worker's statistics (baseline subtraction: the underlying
    /// counters are never actually reset).
    ///
    /// # Errors
    ///
    /// Returns [`DatapathError::WorkerNotFound`].
    pub fn zero_stats(&self, worker_id: u32) -> Result<(), DatapathError> {
        let handles = self.workers.lock();
        let handle = handles.iter().find(|h| h.id.0 == worker_id).ok_or(DatapathError::WorkerNotFound(worker_id))?;
        *handle.baseline.lock() = handle.stats.snapshot();
        Ok(())
    }

    /// Read a worker's statistics since its last `zero_stats` call (or
    /// since registration, if never zeroed).
    ///
    /// # Errors
    ///
    /// Returns [`DatapathError::WorkerNotFound`].
    pub fn read_stats(&self, worker_id: u32) -> Result<stats::Baseline, DatapathError> {
        let handles = self.workers.lock();
        let handle = handles.iter().find(|h| h.id.0 == worker_id).ok_or(DatapathError::WorkerNotFound(worker_id))?;
        Ok(handle.stats.since(&handle.baseline.lock()))
    }
}

fn map_flow_err(error: FlowTableError) -> DatapathError {
    match error {
        FlowTableError::NotFound => DatapathError::FlowNotFound,
        FlowTableError::CapacityExceeded => DatapathError::CapacityExceeded,
        FlowTableError::MaskInvalid => DatapathError::MaskInvalid(error),
    }
}

fn worker_thread_body<D: Driver + Send + 'static>(
    worker: &mut Worker<DatapathIo<D>, ManagementUpcall<D::Buf>>,
    ports: &Arc<parking_lot::Mutex<BTreeMap<u32, PortEntry<D>>>>,
    assignment: &Arc<parking_lot::Mutex<Vec<(u32, QueueId)>>>,
    io: &mut DatapathIo<D>,
) {
    while !worker.should_exit() {
        let snapshot: Vec<(u32, QueueId)> = assignment.lock().clone();
        let mut did_work = false;
        for (port_id, queue) in snapshot {
            let poll_started = std::time::Instant::now();
            let received = {
                let mut guard = ports.lock();
                guard.get_mut(&port_id).map(|entry| entry.driver.receive(queue))
            };
            #[allow(clippy::cast_possible_truncation)]
            let poll_ns = poll_started.elapsed().as_nanos() as u64;
            worker.stats().cycles.poll.increment(poll_ns);
            if let Some(Ok(batch)) = received {
                if !batch.is_empty() {
                    did_work = true;
                    worker.run_iteration(batch, PortId(port_id), io);
                }
            }
        }
        if !did_work {
            std::thread::yield_now();
        }
    }
    worker.begin_drain();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::PortConfig;
    use driver::reference::ReferenceDriver;
    use hardware::{CoreId, NumaNodeId, Topology};
    use std::collections::{BTreeMap, BTreeSet};

    fn one_core_topology() -> Topology {
        let mut nodes = BTreeMap::new();
        nodes.insert(NumaNodeId(0), BTreeSet::from([CoreId(0)]));
        Topology::from_parts(nodes)
    }

    fn two_core_topology() -> Topology {
        let mut nodes = BTreeMap::new();
        nodes.insert(NumaNodeId(0), BTreeSet::from([CoreId(0), CoreId(1)]));
        Topology::from_parts(nodes)
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

    #[test]
    fn add_port_before_open_is_assigned_once_workers_exist() {
        let root = DatapathRoot::<ReferenceDriver>::new(two_core_topology(), 2, EngineLimits::default());
        let driver = ReferenceDriver::new(NumaNodeId(0), 2);
        let handle = root
            .add_port(PortConfig { name: "eth0".to_string() }, driver)
            .unwrap_or_else(|_| unreachable!());

        let before = root.show_queue_assignments();
        assert!(before[0].queue_assignment.iter().all(Option::is_none));

        root.open().unwrap_or_else(|_| unreachable!());
        let after = root.show_queue_assignments();
        assert!(after[0].queue_assignment.iter().all(Option::is_some));

        root.del_port(handle).unwrap_or_else(|_| unreachable!());
        root.close();
    }

    #[test]
    fn add_port_after_open_is_assigned_immediately_to_least_loaded_worker() {
        let root = DatapathRoot::<ReferenceDriver>::new(two_core_topology(), 2, EngineLimits::default());
        root.open().unwrap_or_else(|_| unreachable!());

        let driver = ReferenceDriver::new(NumaNodeId(0), 1);
        root.add_port(PortConfig { name: "eth0".to_string() }, driver)
            .unwrap_or_else(|_| unreachable!());

        let info = root.show_queue_assignments();
        assert_eq!(info.len(), 1);
        assert!(info[0].queue_assignment[0].is_some());
        root.close();
    }

    #[test]
    fn local_port_cannot_be_removed() {
        let root = DatapathRoot::<ReferenceDriver>::new(one_core_topology(), 1, EngineLimits::default());
        let driver = ReferenceDriver::new(NumaNodeId(0), 1);
        let handle = root
            .add_port(PortConfig { name: "local".to_string() }, driver)
            .unwrap_or_else(|_| unreachable!());

        let err = root.del_port(handle).unwrap_err();
        assert!(matches!(err, DatapathError::PortLocalProtected(_)));
    }

    #[test]
    fn duplicate_port_name_is_rejected() {
        let root = DatapathRoot::<ReferenceDriver>::new(one_core_topology(), 1, EngineLimits::default());
        root.add_port(PortConfig { name: "eth0".to_string() }, ReferenceDriver::new(NumaNodeId(0), 1))
            .unwrap_or_else(|_| unreachable!());
        let err = root
            .add_port(PortConfig { name: "eth0".to_string() }, ReferenceDriver::new(NumaNodeId(0), 1))
            .unwrap_err();
        assert!(matches!(err, DatapathError::PortExists(_)));
    }

    #[test]
    fn execute_runs_the_non_core_pipeline_and_counts_a_loss_with_no_controller_attached() {
        let root = DatapathRoot::<ReferenceDriver>::new(one_core_topology(), 0, EngineLimits::default());
        let packet = Packet::new(net::buffer::test_buffer::TestBuffer::from_raw_data(&udp_frame(2000)))
            .unwrap_or_else(|_| unreachable!());
        let stats = root.execute(packet, PortId(1));
        assert_eq!(stats.lost, 1);
    }

    #[test]
    fn add_flow_get_flow_and_dump_flows_round_trip_on_non_core_table() {
        let root = DatapathRoot::<ReferenceDriver>::new(one_core_topology(), 0, EngineLimits::default());
        let mask: Arc<Mask> = Arc::new(FlowKey::new());
        let ufid = root
            .add_flow(FlowDescriptor {
                worker_id: NON_CORE.0,
                unmasked_key: FlowKey::new(),
                mask,
                actions: vec![Action::Output(PortId(7))],
            })
            .unwrap_or_else(|_| unreachable!());

        let view = root.get_flow(NON_CORE.0, ufid).unwrap_or_else(|_| unreachable!());
        assert_eq!(view.ufid, ufid);
        assert_eq!(view.actions, vec![Action::Output(PortId(7))]);

        let (batch, _cursor) = root
            .dump_flows(NON_CORE.0, DumpCursor::default(), 10)
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].ufid, ufid);
    }

    #[test]
    fn unknown_worker_id_is_reported_on_flow_lookup() {
        let root = DatapathRoot::<ReferenceDriver>::new(one_core_topology(), 1, EngineLimits::default());
        let err = root.get_flow(42, Ufid::new()).unwrap_err();
        assert!(matches!(err, DatapathError::WorkerNotFound(42)));
    }

    #[test]
    fn set_core_mask_flushes_flows_on_the_reopened_worker() {
        let root = DatapathRoot::<ReferenceDriver>::new(one_core_topology(), 1, EngineLimits::default());
        root.open().unwrap_or_else(|_| unreachable!());

        let mask: Arc<Mask> = Arc::new(FlowKey::new());
        root.add_flow(FlowDescriptor {
            worker_id: 0,
            unmasked_key: FlowKey::new(),
            mask,
            actions: vec![Action::Output(PortId(1))],
        })
        .unwrap_or_else(|_| unreachable!());
        assert_eq!(root.read_stats(0).unwrap_or_else(|_| unreachable!()).miss, 0);

        root.set_core_mask(Some(1)).unwrap_or_else(|_| unreachable!());
        let (batch, _) = root
            .dump_flows(0, DumpCursor::default(), 10)
            .unwrap_or_else(|_| unreachable!());
        assert!(batch.is_empty(), "worker 0's flow table should be a fresh one after reconfiguration");
        root.close();
    }

    #[test]
    fn engine_limits_size_the_non_core_flow_table() {
        let limits = EngineLimits {
            flow_table_capacity: 1,
            ..EngineLimits::default()
        };
        let root = DatapathRoot::<ReferenceDriver>::new(one_core_topology(), 0, limits);
        let mask: Arc<Mask> = Arc::new(FlowKey::new());
        root.add_flow(FlowDescriptor {
            worker_id: NON_CORE.0,
            unmasked_key: FlowKey::new(),
            mask: Arc::clone(&mask),
            actions: vec![],
        })
        .unwrap_or_else(|_| unreachable!());

        let mut second_key = FlowKey::new();
        second_key.set_word(dpcls::key::word::IN_PORT, 1);
        let err = root
            .add_flow(FlowDescriptor {
                worker_id: NON_CORE.0,
                unmasked_key: second_key,
                mask,
                actions: vec![],
            })
            .unwrap_err();
        assert!(matches!(err, DatapathError::CapacityExceeded));
    }
}
