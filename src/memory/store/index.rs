// src/memory/store/index.rs
// In-memory HNSW indices over query-context embeddings.
//
// Two sets of graphs are maintained: one per `(bank_id, fact_id)` for
// `find_nearest` (SignalIngestor's merge-or-create decision, RecallBooster's
// per-fact lookup), and one per `bank_id` spanning every fact for
// `find_nearest_any` (batch recall boosting across a whole bank).

use std::collections::HashMap;
use std::sync::RwLock;

use hnsw::{Hnsw, Searcher};
use rand_pcg::Pcg64;
use space::{Metric, Neighbor};
use uuid::Uuid;

use crate::embedding::{cosine_similarity, Embedding};

const EF_CONSTRUCTION: usize = 200;
const M: usize = 12;
const M0: usize = 24;

/// Cosine distance as an HNSW metric: HNSW wants a `space::Metric` whose
/// distances decrease with similarity, quantized to an integer `Unit`
/// because `f32` has no total order.
struct CosineMetric;

impl Metric<Vec<f32>> for CosineMetric {
    type Unit = u32;

    fn distance(&self, a: &Vec<f32>, b: &Vec<f32>) -> u32 {
        let similarity = cosine_similarity(a, b);
        // Map [-1, 1] similarity to an ascending [0, 2_000_000] distance.
        ((1.0 - similarity) * 1_000_000.0).round() as u32
    }
}

type Graph = Hnsw<CosineMetric, Vec<f32>, Pcg64, M, M0>;

struct IndexedGraph {
    hnsw: Graph,
    ids: Vec<Uuid>,
}

impl Default for IndexedGraph {
    fn default() -> Self {
        Self {
            hnsw: Hnsw::new_params(CosineMetric, hnsw::Params::new().ef_construction(EF_CONSTRUCTION)),
            ids: Vec::new(),
        }
    }
}

impl IndexedGraph {
    fn insert(&mut self, context_id: Uuid, embedding: &Embedding) {
        let mut searcher = Searcher::default();
        self.hnsw.insert(embedding.as_slice().to_vec(), &mut searcher);
        self.ids.push(context_id);
    }

    fn search(&self, query: &Embedding, k: usize) -> Vec<(Uuid, f32)> {
        if self.ids.is_empty() {
            return Vec::new();
        }

        let mut searcher = Searcher::default();
        let ef = (k * 4).max(16);
        let mut dest = vec![
            Neighbor {
                index: !0,
                distance: !0
            };
            k.min(self.ids.len())
        ];
        let found = self
            .hnsw
            .nearest(&query.as_slice().to_vec(), ef, &mut searcher, &mut dest);

        found
            .iter()
            .filter(|n| n.index != !0 && n.index < self.ids.len())
            .map(|n| {
                let id = self.ids[n.index];
                let similarity = 1.0 - (n.distance as f32 / 1_000_000.0);
                (id, similarity)
            })
            .collect()
    }
}

#[derive(Default)]
pub struct ContextIndex {
    per_fact: RwLock<HashMap<(String, String), IndexedGraph>>,
    per_bank: RwLock<HashMap<String, IndexedGraph>>,
}

impl ContextIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, bank_id: &str, fact_id: &str, context_id: Uuid, embedding: &Embedding) {
        self.per_fact
            .write()
            .expect("context index lock poisoned")
            .entry((bank_id.to_string(), fact_id.to_string()))
            .or_default()
            .insert(context_id, embedding);

        self.per_bank
            .write()
            .expect("context index lock poisoned")
            .entry(bank_id.to_string())
            .or_default()
            .insert(context_id, embedding);
    }

    /// Approximate top-`k` nearest context ids for a `(bank_id, fact_id)`
    /// pair, most-similar first, alongside their cosine similarity.
    pub fn search_fact(&self, bank_id: &str, fact_id: &str, query: &Embedding, k: usize) -> Vec<(Uuid, f32)> {
        let key = (bank_id.to_string(), fact_id.to_string());
        let guard = self.per_fact.read().expect("context index lock poisoned");
        guard.get(&key).map(|g| g.search(query, k)).unwrap_or_default()
    }

    /// Approximate top-`k` nearest context ids across every fact in a bank.
    pub fn search_bank(&self, bank_id: &str, query: &Embedding, k: usize) -> Vec<(Uuid, f32)> {
        let guard = self.per_bank.read().expect("context index lock poisoned");
        guard.get(bank_id).map(|g| g.search(query, k)).unwrap_or_default()
    }
}
