//! Outstanding acknowledged requests.
//!
//! Every request that expects an acknowledgement gets a unique ack number.
//! The entry remembers what was asked, in which connection epoch, and when,
//! so the reply can be routed and late replies recognised.

use std::{collections::BTreeMap, ops::Sub, time::Duration};

use parley_proto::{EventKind, MessageId, RoomId};

/// What an outstanding request was for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RequestKind {
    FetchRooms,
    FetchMessages { room_id: RoomId },
    SendMessage { message_id: MessageId, room_id: RoomId },
    CreateRoom { ticket: u64 },
}

impl RequestKind {
    pub(crate) fn event(&self) -> EventKind {
        match self {
            Self::FetchRooms => EventKind::FetchRooms,
            Self::FetchMessages { .. } => EventKind::FetchMessages,
            Self::SendMessage { .. } => EventKind::SendMessage,
            Self::CreateRoom { .. } => EventKind::CreateRoom,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct PendingRequest<I> {
    pub(crate) kind: RequestKind,
    pub(crate) epoch: u64,
    sent_at: I,
    timeout: Duration,
}

/// Table of requests awaiting acknowledgement, keyed by ack number.
#[derive(Debug)]
pub(crate) struct PendingRequests<I> {
    next_ack: u64,
    pending: BTreeMap<u64, PendingRequest<I>>,
}

impl<I> PendingRequests<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    pub(crate) fn new() -> Self {
        Self { next_ack: 1, pending: BTreeMap::new() }
    }

    /// Register a request and return its ack number.
    pub(crate) fn insert(
        &mut self,
        kind: RequestKind,
        epoch: u64,
        sent_at: I,
        timeout: Duration,
    ) -> u64 {
        let ack = self.next_ack;
        self.next_ack += 1;
        self.pending.insert(ack, PendingRequest { kind, epoch, sent_at, timeout });
        ack
    }

    pub(crate) fn take(&mut self, ack: u64) -> Option<PendingRequest<I>> {
        self.pending.remove(&ack)
    }

    /// Remove and return every request older than its timeout, oldest first.
    pub(crate) fn expire(&mut self, now: I) -> Vec<PendingRequest<I>> {
        let expired: Vec<u64> = self
            .pending
            .iter()
            .filter(|(_, req)| now >= req.sent_at && now - req.sent_at >= req.timeout)
            .map(|(ack, _)| *ack)
            .collect();

        expired.into_iter().filter_map(|ack| self.pending.remove(&ack)).collect()
    }

    /// Remove every request, oldest first.
    pub(crate) fn drain(&mut self) -> Vec<PendingRequest<I>> {
        std::mem::take(&mut self.pending).into_values().collect()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use std::time::Instant;

    use super::*;

    #[test]
    fn ack_numbers_are_unique_and_increasing() {
        let now = Instant::now();
        let mut reqs = PendingRequests::new();

        let a = reqs.insert(RequestKind::FetchRooms, 1, now, Duration::from_secs(1));
        let b = reqs.insert(RequestKind::FetchRooms, 1, now, Duration::from_secs(1));

        assert!(b > a);
        assert_eq!(reqs.len(), 2);
    }

    #[test]
    fn take_removes_entry() {
        let now = Instant::now();
        let mut reqs = PendingRequests::new();
        let ack = reqs.insert(RequestKind::CreateRoom { ticket: 3 }, 2, now, Duration::from_secs(1));

        let req = reqs.take(ack).unwrap();
        assert_eq!(req.kind, RequestKind::CreateRoom { ticket: 3 });
        assert_eq!(req.epoch, 2);
        assert!(reqs.take(ack).is_none());
    }

    #[test]
    fn expire_respects_per_request_timeout() {
        let start = Instant::now();
        let mut reqs = PendingRequests::new();
        reqs.insert(
            RequestKind::SendMessage { message_id: "local-1".into(), room_id: "r1".into() },
            1,
            start,
            Duration::from_secs(10),
        );
        reqs.insert(RequestKind::FetchRooms, 1, start, Duration::from_secs(15));

        assert!(reqs.expire(start + Duration::from_secs(9)).is_empty());

        let expired = reqs.expire(start + Duration::from_secs(10));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].kind.event(), EventKind::SendMessage);

        let expired = reqs.expire(start + Duration::from_secs(15));
        assert_eq!(expired[0].kind, RequestKind::FetchRooms);
        assert_eq!(reqs.len(), 0);
    }

    #[test]
    fn drain_empties_table() {
        let now = Instant::now();
        let mut reqs = PendingRequests::new();
        reqs.insert(RequestKind::FetchRooms, 1, now, Duration::from_secs(1));
        reqs.insert(RequestKind::FetchMessages { room_id: "r1".into() }, 1, now, Duration::from_secs(1));

        assert_eq!(reqs.drain().len(), 2);
        assert_eq!(reqs.len(), 0);
    }
}
