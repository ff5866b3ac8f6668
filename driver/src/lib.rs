// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![deny(missing_docs, clippy::all, clippy::pedantic)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

//! The driver/queue contract the datapath core consumes from a NIC
//! poll-mode driver, plus an in-memory reference implementation used for
//! tests and the non-worker pseudo-port.
//!
//! Vendor-specific poll-mode driver integration is an external
//! collaborator (out of scope): this crate defines only the safe trait
//! boundary a real driver would implement behind, grounded in shape on the
//! `DevIndex`/queue accessor style of the example corpus's DPDK device
//! wrapper, but with no unsafe FFI anywhere in this crate.

use hardware::NumaNodeId;
use net::Packet;
use net::buffer::PacketBufferMut;

/// A driver-assigned receive or transmit queue index on a port.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct QueueId(pub u16);

/// Errors a driver call can return.
#[derive(Debug, Clone, Copy, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum DriverError {
    /// No packets currently available (`receive`'s non-blocking miss).
    #[error("no packets available")]
    WouldBlock,
    /// The requested queue does not exist on this port.
    #[error("queue {0:?} does not exist")]
    NoSuchQueue(QueueId),
    /// The device needs reconfiguration before this call can proceed.
    #[error("device requires reconfiguration")]
    ReconfigureRequired,
}

/// The maximum number of packets a single `receive` call returns, per spec.
pub const MAX_BURST: usize = 32;

/// The safe contract a NIC poll-mode driver offers the datapath core.
///
/// Generic over the packet buffer type `Buf` so a real driver can use
/// whatever mbuf representation its hardware needs; the reference driver
/// in this crate uses `net::buffer::test_buffer::TestBuffer`.
pub trait Driver {
    /// The packet buffer type this driver produces and consumes.
    type Buf: PacketBufferMut;

    /// The NUMA node this device is attached to.
    fn numa_id(&self) -> NumaNodeId;

    /// Whether this device requires polling (worker-eligible) as opposed to
    /// being interrupt-driven.
    fn is_poll_mode(&self) -> bool;

    /// The number of receive queues this device exposes.
    fn num_rx_queues(&self) -> u16;

    /// Whether `reconfigure` must be called before queues can be touched.
    fn reconfigure_required(&self) -> bool;

    /// Idempotently apply any pending configuration. Must be called by the
    /// datapath's run step before any queue is touched if
    /// [`Driver::reconfigure_required`] returns true.
    ///
    /// # Errors
    ///
    /// Returns a [`DriverError`] if reconfiguration fails.
    fn reconfigure(&mut self) -> Result<(), DriverError>;

    /// Receive up to [`MAX_BURST`] packets from `queue`.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::WouldBlock`] if no packets are currently
    /// available, or [`DriverError::NoSuchQueue`]/[`DriverError::ReconfigureRequired`]
    /// as appropriate.
    fn receive(&mut self, queue: QueueId) -> Result<Vec<Packet<Self::Buf>>, DriverError>;

    /// Send `batch` on `queue`, returning the number of packets actually
    /// sent (a driver may accept fewer than the full batch).
    ///
    /// # Errors
    ///
    /// Returns a [`DriverError`] if the queue does not exist or the device
    /// needs reconfiguration.
    fn send(&mut self, queue: QueueId, batch: Vec<Packet<Self::Buf>>) -> Result<usize, DriverError>;

    /// Prepend a tunnel header to every packet in `batch`, in place.
    ///
    /// # Errors
    ///
    /// Returns a [`DriverError`] if the underlying buffer has no room.
    fn push_tunnel_header(&mut self, batch: &mut [Packet<Self::Buf>], data: &[u8]) -> Result<(), DriverError>;

    /// Strip a tunnel header from every packet in `batch`, in place.
    ///
    /// # Errors
    ///
    /// Returns a [`DriverError`] if a packet is too short to strip.
    fn pop_tunnel_header(&mut self, batch: &mut [Packet<Self::Buf>], len: u16) -> Result<(), DriverError>;
}

#[cfg(any(test, feature = "reference"))]
pub mod reference {
    //! An in-memory reference driver, used by tests and by the non-worker
    //! pseudo-port for foreign packet injection. Never used in production:
    //! it has no real NIC behind it.

    use super::{DriverError, MAX_BURST, QueueId};
    use hardware::NumaNodeId;
    use net::Packet;
    use net::buffer::test_buffer::TestBuffer;
    use std::collections::VecDeque;

    /// An in-memory driver backed by per-queue `VecDeque`s of raw frames.
    pub struct ReferenceDriver {
        numa: NumaNodeId,
        rx_queues: Vec<VecDeque<Vec<u8>>>,
        sent: Vec<Vec<Vec<u8>>>,
        reconfigure_required: bool,
    }

    impl ReferenceDriver {
        /// Create a reference driver on `numa` with `num_queues` empty RX
        /// queues (and matching TX sinks).
        #[must_use]
        pub fn new(numa: NumaNodeId, num_queues: u16) -> Self {
            ReferenceDriver {
                numa,
                rx_queues: (0..num_queues).map(|_| VecDeque::new()).collect(),
                sent: (0..num_queues).map(|_| Vec::new()).collect(),
                reconfigure_required: false,
            }
        }

        /// Enqueue a raw frame to be returned by a future `receive` call on
        /// `queue`.
        pub fn enqueue_rx(&mut self, queue: QueueId, frame: Vec<u8>) {
            if let Some(q) = self.rx_queues.get_mut(queue.0 as usize) {
                q.push_back(frame);
            }
        }

        /// The raw frames sent on `queue` so far, for test assertions.
        #[must_use]
        pub fn sent_on(&self, queue: QueueId) -> &[Vec<u8>] {
            self.sent.get(queue.0 as usize).map_or(&[], Vec::as_slice)
        }
    }

    impl super::Driver for ReferenceDriver {
        type Buf = TestBuffer;

        fn numa_id(&self) -> NumaNodeId {
            self.numa
        }

        fn is_poll_mode(&self) -> bool {
            true
        }

        fn num_rx_queues(&self) -> u16 {
            #[allow(clippy::cast_possible_truncation)]
            let n = self.rx_queues.len() as u16;
            n
        }

        fn reconfigure_required(&self) -> bool {
            self.reconfigure_required
        }

        fn reconfigure(&mut self) -> Result<(), DriverError> {
            self.reconfigure_required = false;
            Ok(())
        }

        fn receive(&mut self, queue: QueueId) -> Result<Vec<Packet<Self::Buf>>, DriverError> {
            let q = self
                .rx_queues
                .get_mut(queue.0 as usize)
                .ok_or(DriverError::NoSuchQueue(queue))?;
            if q.is_empty() {
                return Err(DriverError::WouldBlock);
            }
            let mut burst = Vec::new();
            while burst.len() < MAX_BURST {
                let Some(frame) = q.pop_front() else {
                    break;
                };
                let buf = TestBuffer::from_raw_data(&frame);
                if let Ok(packet) = Packet::new(buf) {
                    burst.push(packet);
                }
            }
            Ok(burst)
        }

        fn send(&mut self, queue: QueueId, batch: Vec<Packet<Self::Buf>>) -> Result<usize, DriverError> {
            let sink = self.sent.get_mut(queue.0 as usize).ok_or(DriverError::NoSuchQueue(queue))?;
            let count = batch.len();
            for packet in batch {
                sink.push(packet.into_buf().as_ref().to_vec());
            }
            Ok(count)
        }

        fn push_tunnel_header(&mut self, _batch: &mut [Packet<Self::Buf>], _data: &[u8]) -> Result<(), DriverError> {
            Ok(())
        }

        fn pop_tunnel_header(&mut self, _batch: &mut [Packet<Self::Buf>], _len: u16) -> Result<(), DriverError> {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::reference::ReferenceDriver;
    use super::*;

    #[test]
    fn receive_returns_would_block_on_empty_queue() {
        let mut driver = ReferenceDriver::new(NumaNodeId(0), 1);
        assert_eq!(driver.receive(QueueId(0)).unwrap_err(), DriverError::WouldBlock);
    }

    #[test]
    fn receive_returns_enqueued_frames() {
        let mut driver = ReferenceDriver::new(NumaNodeId(0), 1);
        let frame = vec![0xAAu8; 64];
        driver.enqueue_rx(QueueId(0), frame);
        let burst = driver.receive(QueueId(0)).unwrap_or_else(|_| unreachable!());
        assert_eq!(burst.len(), 1);
    }

    #[test]
    fn send_records_frames_on_the_target_queue() {
        let mut driver = ReferenceDriver::new(NumaNodeId(0), 1);
        let frame = vec![0xBBu8; 64];
        driver.enqueue_rx(QueueId(0), frame);
        let burst = driver.receive(QueueId(0)).unwrap_or_else(|_| unreachable!());
        let sent = driver.send(QueueId(0), burst).unwrap_or_else(|_| unreachable!());
        assert_eq!(sent, 1);
        assert_eq!(driver.sent_on(QueueId(0)).len(), 1);
    }

    #[test]
    fn no_such_queue_is_reported() {
        let mut driver = ReferenceDriver::new(NumaNodeId(0), 1);
        assert_eq!(driver.receive(QueueId(9)).unwrap_err(), DriverError::NoSuchQueue(QueueId(9)));
    }
}
