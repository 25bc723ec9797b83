use concord_client::memory::{MemoryBackend, MemoryEditor, MemoryEditorHandle, MemoryServer};
use concord_client::{ClientConfigBuilder, ClientDriver, ClientEvent, EditorClient};
use concord_core::Cursor;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

const COLORS: &[&str] = &["#e6194b", "#3cb44b", "#4363d8", "#f58231", "#911eb4", "#46f0f0"];
const WORDS: &[&str] = &["the ", "quick ", "brown ", "fox ", "jumps ", "über ", "鹿 ", "\n"];

/// Parameters of one simulated editing session.
#[derive(Clone, Debug)]
pub struct SimulationConfig {
    pub clients: usize,
    pub edits: usize,
    pub seed: u64,
    /// Chance that a user action is an undo or a redo.
    pub undo_probability: f64,
    /// Chance that a step delivers pending events instead of editing.
    pub delivery_probability: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            clients: 4,
            edits: 500,
            seed: 0,
            undo_probability: 0.1,
            delivery_probability: 0.5,
        }
    }
}

/// Builder for [`SimulationConfig`].
pub struct SimulationConfigBuilder {
    config: SimulationConfig,
}

impl SimulationConfigBuilder {
    /// Start from the default configuration.
    pub fn new() -> Self {
        Self {
            config: SimulationConfig::default(),
        }
    }

    /// Number of connected clients, at least one.
    pub fn clients(mut self, clients: usize) -> Self {
        self.config.clients = clients.max(1);
        self
    }

    /// Number of user actions to perform.
    pub fn edits(mut self, edits: usize) -> Self {
        self.config.edits = edits;
        self
    }

    /// Seed for the random number generator.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Chance of an undo or redo, clamped to `0.0..=1.0`.
    pub fn undo_probability(mut self, probability: f64) -> Self {
        self.config.undo_probability = probability.clamp(0.0, 1.0);
        self
    }

    /// Chance of delivering events instead of acting, capped at `0.95`.
    pub fn delivery_probability(mut self, probability: f64) -> Self {
        self.config.delivery_probability = probability.clamp(0.0, 0.95);
        self
    }

    /// Finish the configuration.
    pub fn build(self) -> SimulationConfig {
        self.config
    }
}

impl Default for SimulationConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics collected during a simulation run
#[derive(Clone, Debug)]
pub struct SimulationStats {
    pub clients: usize,
    pub seed: u64,
    pub edits: usize,
    pub undos: usize,
    pub redos: usize,
    pub deliveries: usize,
    pub accepted: usize,
    pub retries: usize,
    pub cursor_updates: usize,
    pub errors: usize,
    pub document_len: usize,
    pub divergent: Vec<usize>,
    pub total_time: Duration,
}

impl SimulationStats {
    /// Every client matches the server and nothing failed.
    pub fn converged(&self) -> bool {
        self.divergent.is_empty() && self.errors == 0
    }

    /// Print the statistics box.
    pub fn print(&self) {
        let verdict = if self.converged() { "yes" } else { "NO" };
        println!("\n╔════════════════════════════════════════════════════════════╗");
        println!("║              Simulation Statistics                         ║");
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║  Seed:                      {:>30} ║", self.seed);
        println!("║  Clients:                   {:>30} ║", self.clients);
        println!("║  Edits:                     {:>30} ║", self.edits);
        println!("║  Undos / Redos:             {:>30} ║", format!("{} / {}", self.undos, self.redos));
        println!("║  Events Delivered:          {:>30} ║", self.deliveries);
        println!("║  Operations Acknowledged:   {:>30} ║", self.accepted);
        println!("║  Retries:                   {:>30} ║", self.retries);
        println!("║  Cursor Updates:            {:>30} ║", self.cursor_updates);
        println!("║  Final Document Length:     {:>30} ║", self.document_len);
        println!("║  Total Time:                {:>29}s ║", format!("{:.3}", self.total_time.as_secs_f64()));
        println!("║  Converged:                 {:>30} ║", verdict);
        println!("╚════════════════════════════════════════════════════════════╝");
    }
}

struct SimulatedUser {
    driver: ClientDriver<MemoryEditor, MemoryBackend>,
    handle: MemoryEditorHandle,
    events: broadcast::Receiver<ClientEvent>,
    errors: usize,
}

impl SimulatedUser {
    fn connect(server: &MemoryServer, index: usize) -> Self {
        let config = ClientConfigBuilder::new()
            .user_id(format!("user-{index}"))
            .user_name(format!("User {index}"))
            .user_color(COLORS[index % COLORS.len()])
            .event_capacity(1024)
            .build();
        let backend = server.connect(config.user_id.clone());
        let (editor, handle, editor_events) = MemoryEditor::new();
        let client = EditorClient::new(config, editor, backend);
        let events = client.subscribe();

        Self {
            driver: ClientDriver::new(client, editor_events),
            handle,
            events,
            errors: 0,
        }
    }

    fn deliver(&mut self) -> usize {
        let handled = self.driver.pump();
        self.collect_errors();
        handled
    }

    fn collect_errors(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(ClientEvent::Error { message, .. }) => {
                    warn!(%message, "client reported an error");
                    self.errors += 1;
                }
                Ok(_) | Err(broadcast::error::TryRecvError::Lagged(_)) => {}
                Err(_) => return,
            }
        }
    }
}

#[derive(Default)]
struct Counters {
    edits: usize,
    undos: usize,
    redos: usize,
    deliveries: usize,
}

fn act(user: &SimulatedUser, config: &SimulationConfig, rng: &mut StdRng, counters: &mut Counters) {
    let handle = &user.handle;
    let len = handle.len();

    if rng.gen_bool(config.undo_probability) {
        if rng.gen_bool(0.7) {
            handle.undo();
            counters.undos += 1;
        } else {
            handle.redo();
            counters.redos += 1;
        }
        return;
    }

    match rng.gen_range(0..10) {
        0..=5 => {
            let word = WORDS[rng.gen_range(0..WORDS.len())];
            handle.insert(rng.gen_range(0..=len), word);
            counters.edits += 1;
        }
        6..=7 if len > 0 => {
            handle.delete(rng.gen_range(0..len), rng.gen_range(1..=4));
            counters.edits += 1;
        }
        8 => {
            let a = rng.gen_range(0..=len);
            let b = rng.gen_range(0..=len);
            handle.move_cursor(Cursor::new(a, b));
        }
        _ if rng.gen_bool(0.8) => handle.focus(),
        _ => handle.blur(),
    }
}

/// Run one seeded session and check that every client ends up with the
/// server's document.
pub fn run_simulation(config: &SimulationConfig) -> SimulationStats {
    info!(clients = config.clients, edits = config.edits, seed = config.seed, "starting simulation");
    let start = Instant::now();
    let mut rng = StdRng::seed_from_u64(config.seed);
    let server = MemoryServer::new();
    let mut counters = Counters::default();

    let mut users: Vec<SimulatedUser> = (0..config.clients)
        .map(|index| SimulatedUser::connect(&server, index))
        .collect();
    for user in &mut users {
        counters.deliveries += user.deliver();
    }

    let mut actions = 0;
    while actions < config.edits {
        let index = rng.gen_range(0..users.len());
        if rng.gen_bool(config.delivery_probability) {
            counters.deliveries += users[index].deliver();
        } else {
            act(&users[index], config, &mut rng, &mut counters);
            actions += 1;
        }
    }

    loop {
        let handled: usize = users.iter_mut().map(SimulatedUser::deliver).sum();
        if handled == 0 {
            break;
        }
        counters.deliveries += handled;
    }

    let document = server.document();
    let divergent = verify(&users, &document);
    let server_stats = server.stats();
    let stats = SimulationStats {
        clients: config.clients,
        seed: config.seed,
        edits: counters.edits,
        undos: counters.undos,
        redos: counters.redos,
        deliveries: counters.deliveries,
        accepted: server_stats.accepted,
        retries: server_stats.retries,
        cursor_updates: server_stats.cursor_updates,
        errors: users.iter().map(|user| user.errors).sum::<usize>() + server_stats.rejected,
        document_len: document.chars().count(),
        divergent,
        total_time: start.elapsed(),
    };
    debug!(?stats, "simulation finished");
    stats
}

/// Indices of clients whose text differs from the server or that still have
/// unacknowledged edits.
fn verify(users: &[SimulatedUser], document: &str) -> Vec<usize> {
    users
        .iter()
        .enumerate()
        .filter(|(index, user)| {
            let text_matches = user.handle.text() == document;
            let synced = user.driver.client().is_synchronized();
            if !text_matches || !synced {
                warn!(client = index, text_matches, synced, "client diverged");
            }
            !(text_matches && synced)
        })
        .map(|(index, _)| index)
        .collect()
}
