//! Randomized sessions: several clients type, delete, undo and redo against
//! one server while event delivery is interleaved at random. Once every
//! queue drains, all editors must show the server's document.

use concord_client::memory::{MemoryBackend, MemoryEditor, MemoryEditorHandle, MemoryServer};
use concord_client::{ClientConfigBuilder, ClientDriver, ClientEvent, EditorClient};
use concord_core::Cursor;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::broadcast;

struct Session {
    driver: ClientDriver<MemoryEditor, MemoryBackend>,
    handle: MemoryEditorHandle,
    events: broadcast::Receiver<ClientEvent>,
}

impl Session {
    fn open(server: &MemoryServer, index: usize) -> Self {
        let config = ClientConfigBuilder::new()
            .user_id(format!("user-{index}"))
            .event_capacity(4096)
            .build();
        let backend = server.connect(config.user_id.clone());
        let (editor, handle, editor_events) = MemoryEditor::new();
        let client = EditorClient::new(config, editor, backend);
        let events = client.subscribe();
        let mut session = Self {
            driver: ClientDriver::new(client, editor_events),
            handle,
            events,
        };
        session.driver.pump();
        session
    }

    fn errors(&mut self) -> Vec<String> {
        std::iter::from_fn(|| self.events.try_recv().ok())
            .filter_map(|event| match event {
                ClientEvent::Error { message, .. } => Some(message),
                _ => None,
            })
            .collect()
    }
}

fn random_text(rng: &mut StdRng) -> String {
    const ALPHABET: &[char] = &['a', 'b', 'c', 'x', 'y', ' ', 'é', '中'];
    let len = rng.gen_range(1..=3);
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())])
        .collect()
}

fn act(session: &Session, rng: &mut StdRng) {
    let len = session.handle.len();
    match rng.gen_range(0..10) {
        0..=3 => session.handle.insert(rng.gen_range(0..=len), &random_text(rng)),
        4..=5 if len > 0 => {
            let at = rng.gen_range(0..len);
            session.handle.delete(at, rng.gen_range(1..=2));
        }
        6 => session.handle.undo(),
        7 => session.handle.redo(),
        8 => session.handle.move_cursor(Cursor::caret(rng.gen_range(0..=len))),
        _ => {
            if rng.gen_bool(0.5) {
                session.handle.focus();
            } else {
                session.handle.blur();
            }
        }
    }
}

fn run_session(seed: u64, clients: usize, steps: usize) {
    let mut rng = StdRng::seed_from_u64(seed);
    let server = MemoryServer::new();
    let mut sessions: Vec<Session> = (0..clients).map(|i| Session::open(&server, i)).collect();

    for _ in 0..steps {
        let index = rng.gen_range(0..clients);
        if rng.gen_bool(0.6) {
            act(&sessions[index], &mut rng);
        } else {
            sessions[index].driver.pump();
        }
    }

    loop {
        let handled: usize = sessions.iter_mut().map(|s| s.driver.pump()).sum();
        if handled == 0 {
            break;
        }
    }

    let document = server.document();
    for (index, session) in sessions.iter_mut().enumerate() {
        assert_eq!(
            session.handle.text(),
            document,
            "client {index} diverged (seed {seed})"
        );
        assert!(session.driver.client().is_synchronized());
        assert_eq!(session.errors(), Vec::<String>::new(), "seed {seed}");
    }
    assert_eq!(server.stats().rejected, 0);
}

#[test]
fn test_two_clients_converge() {
    run_session(7, 2, 200);
}

#[test]
fn test_undo_heavy_session_converges() {
    let mut rng = StdRng::seed_from_u64(42);
    let server = MemoryServer::new();
    let mut alice = Session::open(&server, 0);
    let mut bob = Session::open(&server, 1);

    for round in 0..50 {
        alice.handle.insert(rng.gen_range(0..=alice.handle.len()), "ab");
        bob.handle.insert(rng.gen_range(0..=bob.handle.len()), "xy");
        if round % 3 == 0 {
            alice.handle.undo();
        }
        if round % 5 == 0 {
            bob.handle.undo();
            bob.handle.redo();
        }
        alice.driver.pump();
        bob.driver.pump();
    }
    while alice.driver.pump() + bob.driver.pump() > 0 {}

    assert_eq!(alice.handle.text(), server.document());
    assert_eq!(bob.handle.text(), server.document());
    assert!(alice.errors().is_empty());
    assert!(bob.errors().is_empty());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_sessions_converge(seed in any::<u64>(), clients in 2usize..5, steps in 20usize..150) {
        run_session(seed, clients, steps);
    }
}
