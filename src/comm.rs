//! Rank-addressed message passing between the coordinator and tier workers.
//!
//! One unbounded channel per ordered rank pair gives MPI-style semantics:
//! sends never block, a receive blocks until the matching sender's next
//! message, and messages between two ranks arrive in order. Receiving a
//! message of the wrong kind is a protocol violation and aborts.

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::messages::{
    GreedyRefreshMessage, LctResponseMessage, Message, RefreshMessage, StreamMessage,
    UpdateMessage,
};

pub type Rank = usize;

/// One rank's endpoint of the mesh.
pub struct Mailbox {
    rank: Rank,
    senders: Vec<Sender<Message>>,
    receivers: Vec<Receiver<Message>>,
}

fn proto_panic(rank: Rank, from: Rank, got: &Message, want: &str) -> ! {
    panic!("rank {rank}: expected {want} from {from}, got {got:?}")
}

impl Mailbox {
    /// Build a fully connected mesh of `world` ranks.
    pub fn mesh(world: usize) -> Vec<Mailbox> {
        let mut sends = vec![vec![]; world];
        let mut recvs: Vec<Vec<Receiver<Message>>> = vec![vec![]; world];
        for from in 0..world {
            for _to in 0..world {
                let (s, r) = unbounded();
                sends[from].push(s);
                recvs[from].push(r);
            }
        }
        // recvs[from][to] receives what `from` sends to `to`; regroup by receiver.
        let mut by_receiver: Vec<Vec<Receiver<Message>>> = (0..world).map(|_| vec![]).collect();
        for from_recvs in recvs {
            for (to, r) in from_recvs.into_iter().enumerate() {
                by_receiver[to].push(r);
            }
        }
        sends
            .into_iter()
            .zip(by_receiver)
            .enumerate()
            .map(|(rank, (senders, receivers))| Mailbox {
                rank,
                senders,
                receivers,
            })
            .collect()
    }

    pub fn rank(&self) -> Rank {
        self.rank
    }

    pub fn world(&self) -> usize {
        self.senders.len()
    }

    pub fn send(&self, to: Rank, msg: Message) {
        log::trace!("rank {} -> {to}: {msg:?}", self.rank);
        // A send can only fail when the receiver is gone, which means a
        // worker died mid-protocol.
        if self.senders[to].send(msg).is_err() {
            panic!("rank {}: rank {to} hung up", self.rank);
        }
    }

    /// Blocking point-to-point receive from a specific rank.
    pub fn recv(&self, from: Rank) -> Message {
        match self.receivers[from].recv() {
            Ok(m) => m,
            Err(_) => panic!("rank {}: rank {from} hung up", self.rank),
        }
    }

    /// Send to every other rank, this rank acting as broadcast root.
    pub fn broadcast(&self, msg: Message) {
        for to in 0..self.world() {
            if to != self.rank {
                self.send(to, msg.clone());
            }
        }
    }

    /// Contribute a value and collect every rank's, in rank order.
    pub fn all_gather(&self, value: Option<usize>) -> Vec<Option<usize>> {
        self.broadcast(Message::Gather(value));
        (0..self.world())
            .map(|from| {
                if from == self.rank {
                    value
                } else {
                    match self.recv(from) {
                        Message::Gather(v) => v,
                        other => proto_panic(self.rank, from, &other, "Gather"),
                    }
                }
            })
            .collect()
    }

    /// Block until every rank has arrived here.
    pub fn barrier(&self) {
        self.all_gather(None);
    }

    // Typed receives. A mismatch means the refresh protocol lost sync,
    // which is fatal.

    pub fn recv_stream(&self, from: Rank) -> StreamMessage {
        match self.recv(from) {
            Message::Stream(m) => m,
            other => proto_panic(self.rank, from, &other, "Stream"),
        }
    }

    pub fn recv_update(&self, from: Rank) -> UpdateMessage {
        match self.recv(from) {
            Message::Update(m) => m,
            other => proto_panic(self.rank, from, &other, "Update"),
        }
    }

    pub fn recv_refresh(&self, from: Rank) -> RefreshMessage {
        match self.recv(from) {
            Message::Refresh(m) => m,
            other => proto_panic(self.rank, from, &other, "Refresh"),
        }
    }

    pub fn recv_greedy(&self, from: Rank) -> GreedyRefreshMessage {
        match self.recv(from) {
            Message::Greedy(m) => m,
            other => proto_panic(self.rank, from, &other, "Greedy"),
        }
    }

    pub fn recv_lct_response(&self, from: Rank) -> LctResponseMessage {
        match self.recv(from) {
            Message::LctResponse(m) => m,
            other => proto_panic(self.rank, from, &other, "LctResponse"),
        }
    }

    pub fn recv_components(&self, from: Rank) -> Vec<Vec<usize>> {
        match self.recv(from) {
            Message::Components(c) => c,
            other => proto_panic(self.rank, from, &other, "Components"),
        }
    }
}
