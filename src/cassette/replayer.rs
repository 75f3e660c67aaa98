//! Serves recorded interactions back in call order.

use std::collections::HashMap;

use super::format::{Cassette, Interaction};

/// Replays a cassette, one queue per `(port, method)` pair.
///
/// Calls on different methods do not disturb each other's order, so a
/// recording stays valid when unrelated ports are called in a different
/// interleaving.
pub struct CassetteReplayer {
    queues: HashMap<(String, String), Vec<Interaction>>,
    cursors: HashMap<(String, String), usize>,
}

impl CassetteReplayer {
    /// Indexes a loaded cassette for replay.
    #[must_use]
    pub fn new(cassette: &Cassette) -> Self {
        let mut queues: HashMap<(String, String), Vec<Interaction>> = HashMap::new();
        for interaction in &cassette.interactions {
            queues
                .entry((interaction.port.clone(), interaction.method.clone()))
                .or_default()
                .push(interaction.clone());
        }
        Self { queues, cursors: HashMap::new() }
    }

    /// Returns the next interaction for `port`/`method`.
    ///
    /// # Panics
    ///
    /// Panics when the cassette holds no further interaction for the pair.
    /// A replay that asks for more than was recorded means the code under
    /// test diverged from the recording.
    pub fn next_interaction(&mut self, port: &str, method: &str) -> &Interaction {
        let key = (port.to_string(), method.to_string());
        let Some(queue) = self.queues.get(&key) else {
            let mut available: Vec<String> =
                self.queues.keys().map(|(p, m)| format!("{p}::{m}")).collect();
            available.sort();
            panic!(
                "Cassette exhausted: no interactions recorded for {port}::{method}. \
                 Recorded pairs: [{}]",
                available.join(", ")
            );
        };

        let cursor = self.cursors.entry(key).or_insert(0);
        assert!(
            *cursor < queue.len(),
            "Cassette exhausted: all {} interactions for {port}::{method} were consumed",
            queue.len()
        );
        let interaction = &queue[*cursor];
        *cursor += 1;
        interaction
    }

    /// Interactions not yet served, across all pairs.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.queues
            .iter()
            .map(|(key, queue)| queue.len() - self.cursors.get(key).copied().unwrap_or(0))
            .sum()
    }
}
