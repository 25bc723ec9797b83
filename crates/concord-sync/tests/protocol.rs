//! Protocol tests against a simulated central server.
//!
//! Clients edit concurrently while messages are delivered in random order.
//! The server transforms each submission against the history it missed and
//! broadcasts the result. Checked under every interleaving:
//!  - a client never has more than one operation in flight
//!  - all replicas converge once the network drains

use concord_core::PlainTextOperation;
use concord_sync::{StateMachine, TransitionHandler};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

struct Replica {
    machine: StateMachine<PlainTextOperation>,
    doc: String,
    revision: usize,
    outbox: Vec<PlainTextOperation>,
    in_flight: usize,
    max_in_flight: usize,
}

impl TransitionHandler<PlainTextOperation> for Replica {
    fn send_operation(&mut self, operation: &PlainTextOperation) {
        self.outbox.push(operation.clone());
        self.in_flight += 1;
        self.max_in_flight = self.max_in_flight.max(self.in_flight);
    }

    fn apply_operation(&mut self, operation: &PlainTextOperation) {
        self.doc = operation.apply(&self.doc).unwrap();
    }
}

impl Replica {
    fn new() -> Self {
        Self {
            machine: StateMachine::new(),
            doc: String::new(),
            revision: 0,
            outbox: Vec::new(),
            in_flight: 0,
            max_in_flight: 0,
        }
    }
}

enum Downstream {
    Ack,
    Operation(PlainTextOperation),
}

struct Network {
    replicas: Vec<Replica>,
    upstream: VecDeque<(usize, usize, PlainTextOperation)>,
    downstream: Vec<VecDeque<Downstream>>,
    history: Vec<PlainTextOperation>,
    server_doc: String,
}

impl Network {
    fn new(clients: usize) -> Self {
        Self {
            replicas: (0..clients).map(|_| Replica::new()).collect(),
            upstream: VecDeque::new(),
            downstream: (0..clients).map(|_| VecDeque::new()).collect(),
            history: Vec::new(),
            server_doc: String::new(),
        }
    }

    fn flush_outbox(&mut self, client: usize) {
        let replica = &mut self.replicas[client];
        let revision = replica.revision;
        for op in replica.outbox.drain(..) {
            self.upstream.push_back((client, revision, op));
        }
    }

    fn local_edit(&mut self, client: usize, rng: &mut StdRng) {
        let replica = &mut self.replicas[client];
        let len = replica.doc.chars().count();
        let at = rng.gen_range(0..=len);

        let op = if len > at && rng.gen_bool(0.4) {
            let count = rng.gen_range(1..=(len - at).min(3));
            PlainTextOperation::new().retain(at).delete(count).retain(len - at - count)
        } else {
            let ch = (b'a' + rng.gen_range(0..26u8)) as char;
            PlainTextOperation::new()
                .retain(at)
                .insert(&ch.to_string())
                .retain(len - at)
        };

        replica.doc = op.apply(&replica.doc).unwrap();
        let mut machine = std::mem::take(&mut replica.machine);
        machine.apply_client(op, replica).unwrap();
        replica.machine = machine;
        self.flush_outbox(client);
    }

    fn deliver_upstream(&mut self) -> bool {
        let Some((client, revision, mut op)) = self.upstream.pop_front() else {
            return false;
        };
        for concurrent in &self.history[revision..] {
            op = op.transform(concurrent).unwrap().0;
        }
        self.server_doc = op.apply(&self.server_doc).unwrap();
        self.history.push(op.clone());

        for (other, queue) in self.downstream.iter_mut().enumerate() {
            if other == client {
                queue.push_back(Downstream::Ack);
            } else {
                queue.push_back(Downstream::Operation(op.clone()));
            }
        }
        true
    }

    fn deliver_downstream(&mut self, client: usize) -> bool {
        let Some(message) = self.downstream[client].pop_front() else {
            return false;
        };
        let replica = &mut self.replicas[client];
        replica.revision += 1;

        let mut machine = std::mem::take(&mut replica.machine);
        match message {
            Downstream::Ack => {
                replica.in_flight -= 1;
                machine.server_ack(replica).unwrap();
            }
            Downstream::Operation(op) => {
                machine.apply_server(op, replica).unwrap();
            }
        }
        replica.machine = machine;
        self.flush_outbox(client);
        true
    }

    fn drain(&mut self) {
        loop {
            let mut progressed = self.deliver_upstream();
            for client in 0..self.replicas.len() {
                progressed |= self.deliver_downstream(client);
            }
            if !progressed {
                break;
            }
        }
    }
}

fn simulate(seed: u64, clients: usize, steps: usize) -> Network {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut network = Network::new(clients);

    for _ in 0..steps {
        match rng.gen_range(0..3) {
            0 => {
                let client = rng.gen_range(0..clients);
                network.local_edit(client, &mut rng);
            }
            1 => {
                network.deliver_upstream();
            }
            _ => {
                let client = rng.gen_range(0..clients);
                network.deliver_downstream(client);
            }
        }
    }

    network.drain();
    network
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn at_most_one_operation_in_flight(seed in any::<u64>(), clients in 2usize..5) {
        let network = simulate(seed, clients, 120);
        for replica in &network.replicas {
            prop_assert!(replica.max_in_flight <= 1);
            prop_assert_eq!(replica.in_flight, 0);
        }
    }

    #[test]
    fn replicas_converge(seed in any::<u64>(), clients in 2usize..5) {
        let network = simulate(seed, clients, 120);
        for replica in &network.replicas {
            prop_assert!(replica.machine.is_synchronized());
            prop_assert_eq!(&replica.doc, &network.server_doc);
        }
    }
}

#[test]
fn buffered_edits_reach_server_in_order() {
    let mut network = Network::new(2);
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..5 {
        network.local_edit(0, &mut rng);
    }
    // Only the first edit left the client; the rest sit in the buffer.
    assert_eq!(network.upstream.len(), 1);
    assert!(network.replicas[0].machine.is_awaiting_with_buffer());

    network.drain();
    assert_eq!(network.replicas[0].doc, network.server_doc);
    assert_eq!(network.replicas[1].doc, network.server_doc);
    assert_eq!(network.history.len(), 2);
}
