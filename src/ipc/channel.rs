/*!
 * Message Channel
 *
 * Multiplexed conduit between workers and the controller. Workers send to
 * one well-known inbox; replies go to per-slot mailboxes so each worker only
 * ever receives its own. Frames are ordered per sender and the inbox has a
 * single consumer.
 */

use super::types::*;
use super::wire;
use crate::core::id::{Pid, SlotId};
use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tracing::{debug, trace};

/// Shared message channel
pub struct MessageChannel {
    inbound_tx: UnboundedSender<Bytes>,
    inbound_rx: Mutex<Option<UnboundedReceiver<Bytes>>>,
    mailboxes: DashMap<SlotId, UnboundedSender<Bytes>>,
    released: AtomicBool,
    messages_sent: AtomicU64,
    replies_sent: AtomicU64,
}

impl MessageChannel {
    pub fn new() -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        Self {
            inbound_tx,
            inbound_rx: Mutex::new(Some(inbound_rx)),
            mailboxes: DashMap::new(),
            released: AtomicBool::new(false),
            messages_sent: AtomicU64::new(0),
            replies_sent: AtomicU64::new(0),
        }
    }

    fn ensure_open(&self) -> IpcResult<()> {
        if self.released.load(Ordering::Acquire) {
            Err(IpcError::Closed("message channel released".into()))
        } else {
            Ok(())
        }
    }

    /// Take the controller side of the channel (single consumer)
    pub fn take_inbox(&self) -> IpcResult<ControllerInbox> {
        self.ensure_open()?;
        self.inbound_rx
            .lock()
            .take()
            .map(|rx| ControllerInbox { rx })
            .ok_or(IpcError::InboxTaken)
    }

    /// Create the reply mailbox for a newly spawned worker
    pub fn register(self: &Arc<Self>, pid: Pid, slot: SlotId) -> IpcResult<WorkerEndpoint> {
        self.ensure_open()?;
        let (tx, rx) = mpsc::unbounded_channel();
        match self.mailboxes.entry(slot) {
            dashmap::mapref::entry::Entry::Occupied(_) => return Err(IpcError::MailboxExists(slot)),
            dashmap::mapref::entry::Entry::Vacant(v) => {
                v.insert(tx);
            }
        }
        trace!(slot = %slot, pid = %pid, "Mailbox registered");
        Ok(WorkerEndpoint {
            pid,
            slot,
            channel: Arc::clone(self),
            mailbox: rx,
        })
    }

    /// Drop a reaped worker's mailbox
    pub fn unregister(&self, slot: SlotId) -> bool {
        self.mailboxes.remove(&slot).is_some()
    }

    fn send_inbound(&self, envelope: &Envelope) -> IpcResult<()> {
        self.ensure_open()?;
        let frame = wire::encode(envelope)?;
        self.inbound_tx
            .send(frame)
            .map_err(|_| IpcError::Closed("controller inbox dropped".into()))?;
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Send a reply to the worker in `slot`
    pub fn reply(&self, slot: SlotId, reply: &Reply) -> IpcResult<()> {
        self.ensure_open()?;
        let frame = wire::encode(reply)?;
        let mailbox = self.mailboxes.get(&slot).ok_or(IpcError::NoMailbox(slot))?;
        mailbox
            .send(frame)
            .map_err(|_| IpcError::Disconnected(format!("worker in slot {} is gone", slot)))?;
        self.replies_sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Send `reply` to every registered mailbox; returns how many were delivered
    pub fn broadcast(&self, reply: &Reply) -> IpcResult<usize> {
        self.ensure_open()?;
        let frame = wire::encode(reply)?;
        let delivered = self
            .mailboxes
            .iter()
            .filter(|mailbox| mailbox.value().send(frame.clone()).is_ok())
            .count();
        self.replies_sent
            .fetch_add(delivered as u64, Ordering::Relaxed);
        Ok(delivered)
    }

    /// Remove the channel. Every mailbox is dropped so blocked workers wake up.
    pub fn release(&self) -> IpcResult<()> {
        if self.released.swap(true, Ordering::AcqRel) {
            return Err(IpcError::AlreadyReleased);
        }
        let mailboxes = self.mailboxes.len();
        self.mailboxes.clear();
        debug!(mailboxes, "Message channel released");
        Ok(())
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> ChannelStats {
        ChannelStats {
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            replies_sent: self.replies_sent.load(Ordering::Relaxed),
            live_mailboxes: self.mailboxes.len(),
        }
    }
}

impl Default for MessageChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Controller side: the single consumer of inbound frames
pub struct ControllerInbox {
    rx: UnboundedReceiver<Bytes>,
}

impl ControllerInbox {
    /// Next inbound message; `None` once every sender is gone
    pub async fn recv(&mut self) -> Option<IpcResult<Envelope>> {
        let frame = self.rx.recv().await?;
        Some(wire::decode(&frame))
    }
}

/// Worker side: send to the controller, receive replies for this slot only
pub struct WorkerEndpoint {
    pid: Pid,
    slot: SlotId,
    channel: Arc<MessageChannel>,
    mailbox: UnboundedReceiver<Bytes>,
}

impl WorkerEndpoint {
    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn slot(&self) -> SlotId {
        self.slot
    }

    pub fn send(&self, kind: MessageKind) -> IpcResult<()> {
        self.channel
            .send_inbound(&Envelope::new(self.pid, self.slot, kind))
    }

    /// Block until the next reply for this slot arrives
    pub async fn recv(&mut self) -> IpcResult<Reply> {
        let frame = self
            .mailbox
            .recv()
            .await
            .ok_or_else(|| IpcError::Disconnected(format!("mailbox for slot {} closed", self.slot)))?;
        wire::decode(&frame)
    }

    /// Send and wait for the matching reply
    pub async fn call(&mut self, kind: MessageKind) -> IpcResult<Reply> {
        self.send(kind)?;
        self.recv().await
    }

    /// Check for an unsolicited message (a shutdown notice) without blocking
    pub fn try_recv(&mut self) -> IpcResult<Option<Reply>> {
        match self.mailbox.try_recv() {
            Ok(frame) => wire::decode(&frame).map(Some),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(IpcError::Disconnected(format!(
                "mailbox for slot {} closed",
                self.slot
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reply_routed_by_slot() {
        let channel = Arc::new(MessageChannel::new());
        let mut inbox = channel.take_inbox().unwrap();
        let mut a = channel.register(Pid(10), SlotId(0)).unwrap();
        let mut b = channel.register(Pid(11), SlotId(1)).unwrap();

        b.send(MessageKind::Request { resource: 2 }).unwrap();
        let envelope = inbox.recv().await.unwrap().unwrap();
        assert_eq!(envelope.sender_slot, SlotId(1));
        assert_eq!(envelope.sender_pid, Pid(11));

        channel
            .reply(envelope.sender_slot, &Reply::Granted { resource: 2 })
            .unwrap();

        assert_eq!(b.recv().await.unwrap(), Reply::Granted { resource: 2 });
        assert_eq!(a.try_recv().unwrap(), None);
    }

    #[tokio::test]
    async fn test_in_order_per_sender() {
        let channel = Arc::new(MessageChannel::new());
        let mut inbox = channel.take_inbox().unwrap();
        let worker = channel.register(Pid(1), SlotId(0)).unwrap();

        for resource in 0..5 {
            worker.send(MessageKind::Release { resource }).unwrap();
        }
        for resource in 0..5 {
            let envelope = inbox.recv().await.unwrap().unwrap();
            assert_eq!(envelope.kind, MessageKind::Release { resource });
        }
    }

    #[test]
    fn test_single_consumer() {
        let channel = MessageChannel::new();
        assert!(channel.take_inbox().is_ok());
        assert!(matches!(channel.take_inbox(), Err(IpcError::InboxTaken)));
    }

    #[test]
    fn test_duplicate_mailbox_rejected() {
        let channel = Arc::new(MessageChannel::new());
        let _first = channel.register(Pid(1), SlotId(4)).unwrap();

        assert!(matches!(
            channel.register(Pid(2), SlotId(4)),
            Err(IpcError::MailboxExists(SlotId(4)))
        ));
        assert!(channel.unregister(SlotId(4)));
        assert!(channel.register(Pid(2), SlotId(4)).is_ok());
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_mailbox() {
        let channel = Arc::new(MessageChannel::new());
        let mut workers: Vec<_> = (0..3)
            .map(|i| channel.register(Pid(i + 1), SlotId(i)).unwrap())
            .collect();

        assert_eq!(channel.broadcast(&Reply::Shutdown).unwrap(), 3);
        for worker in workers.iter_mut() {
            assert_eq!(worker.try_recv().unwrap(), Some(Reply::Shutdown));
        }
    }

    #[tokio::test]
    async fn test_release_once_and_wakes_workers() {
        let channel = Arc::new(MessageChannel::new());
        let mut worker = channel.register(Pid(1), SlotId(0)).unwrap();

        channel.release().unwrap();
        assert_eq!(channel.release(), Err(IpcError::AlreadyReleased));

        assert!(matches!(worker.recv().await, Err(IpcError::Disconnected(_))));
        assert!(matches!(
            worker.send(MessageKind::Terminate { work_done_ns: 0 }),
            Err(IpcError::Closed(_))
        ));
    }
}
