//! Parallel HNSW construction.
//!
//! [`HnswBuilder`] pre-sizes every per-node structure up front (the dataset
//! is static), then accepts concurrent `insert` calls: each node's neighbor
//! table sits behind its own `RwLock`, and the entry point behind another,
//! so an insertion is atomic with respect to neighbor-list reads by other
//! inserters. [`build_index`] drives the inserts across a worker pool and
//! freezes the result into a lock-free [`HnswIndex`].

use crate::dataset::PointSet;
use crate::distance::euclidean_sq;
use crate::error::{EngineError, Result};
use crate::hnsw::graph::{GraphView, HnswConfig, HnswIndex};
use crate::hnsw::search::{descend, search_layer};
use crate::hnsw::visited::VisitedSet;
use crate::parallel;
use parking_lot::RwLock;
use std::cell::RefCell;

thread_local! {
    /// Per-worker visited set, grown to the node count on first use so
    /// inserts do not allocate per call.
    static BUILD_VISITED: RefCell<VisitedSet> = RefCell::new(VisitedSet::new(0));
}

#[derive(Debug, Clone, Copy)]
struct EntryState {
    point: Option<u32>,
    top_layer: usize,
}

/// An HNSW graph under construction. Shared by reference across the build
/// worker pool.
pub struct HnswBuilder {
    config: HnswConfig,
    dim: usize,
    vectors: Vec<f32>,
    levels: Vec<u8>,
    links: Vec<RwLock<Vec<Vec<u32>>>>,
    entry: RwLock<EntryState>,
}

impl HnswBuilder {
    /// Pre-size a builder over the dataset's vector lanes.
    ///
    /// Copies every vector into the packed arena and samples each node's top
    /// layer from the standard exponential distribution with multiplier
    /// `1 / ln(m)`.
    pub fn new(points: &PointSet, config: HnswConfig) -> Result<Self> {
        if config.m < 2 {
            return Err(EngineError::InvalidParameter(
                "hnsw m must be at least 2".into(),
            ));
        }
        if config.m_max0 == 0 || config.ef_construction == 0 {
            return Err(EngineError::InvalidParameter(
                "hnsw m_max0 and ef_construction must be positive".into(),
            ));
        }
        if config.max_layers == 0 || config.max_layers > 256 {
            return Err(EngineError::InvalidParameter(format!(
                "hnsw max_layers {} is outside [1, 256]",
                config.max_layers
            )));
        }

        let n = points.len();
        let dim = points.vec_dim();
        let mut vectors = Vec::with_capacity(n * dim);
        for id in 0..n as u32 {
            vectors.extend_from_slice(points.vector(id));
        }

        let ml = 1.0 / (config.m as f64).ln();
        let levels: Vec<u8> = (0..n)
            .map(|_| random_level(ml, config.max_layers) as u8)
            .collect();
        let links = levels
            .iter()
            .map(|&level| RwLock::new(vec![Vec::new(); level as usize + 1]))
            .collect();

        Ok(Self {
            config,
            dim,
            vectors,
            levels,
            links,
            entry: RwLock::new(EntryState {
                point: None,
                top_layer: 0,
            }),
        })
    }

    /// Insert one node. Callable concurrently for distinct ids; every id in
    /// `[0, n)` must be inserted exactly once.
    pub fn insert(&self, id: u32) {
        let node_level = self.levels[id as usize] as usize;

        // First node: claim the entry point and return with no links.
        {
            let mut entry = self.entry.write();
            if entry.point.is_none() {
                entry.point = Some(id);
                entry.top_layer = node_level;
                return;
            }
        }
        let (entry_point, top_layer) = {
            let entry = self.entry.read();
            let point = entry
                .point
                .expect("entry point is claimed before other inserts proceed");
            (point, entry.top_layer)
        };

        let query = self.vector(id);
        BUILD_VISITED.with(|cell| {
            let mut visited = cell.borrow_mut();
            visited.grow(self.levels.len());

            // Greedy descent through the layers above this node's level.
            let ep = descend(
                self,
                query,
                entry_point,
                top_layer,
                node_level.min(top_layer),
                &mut visited,
            );

            // Beam search per layer, connecting as we go down.
            let mut layer_eps: Vec<u32> = vec![ep];
            for layer in (0..=node_level.min(top_layer)).rev() {
                let candidates = search_layer(
                    self,
                    query,
                    &layer_eps,
                    self.config.ef_construction,
                    layer,
                    &mut visited,
                );

                let m_max = if layer == 0 {
                    self.config.m_max0
                } else {
                    self.config.m
                };
                let selected = self.select_neighbors(&candidates, m_max);

                {
                    let mut own = self.links[id as usize].write();
                    own[layer] = selected.iter().map(|&(_, nid)| nid).collect();
                }

                for &(_, neighbor) in &selected {
                    let mut neighbor_links = self.links[neighbor as usize].write();
                    if layer >= neighbor_links.len() {
                        continue;
                    }
                    neighbor_links[layer].push(id);
                    if neighbor_links[layer].len() > m_max {
                        let base = self.vector(neighbor);
                        let scored: Vec<(f32, u32)> = neighbor_links[layer]
                            .iter()
                            .map(|&cid| (euclidean_sq(base, self.vector(cid)), cid))
                            .collect();
                        let pruned = self.select_neighbors(&scored, m_max);
                        neighbor_links[layer] = pruned.into_iter().map(|(_, cid)| cid).collect();
                    }
                }

                layer_eps.clear();
                layer_eps.extend(candidates.iter().map(|&(_, cid)| cid));
                if layer_eps.is_empty() {
                    layer_eps.push(entry_point);
                }
            }
        });

        // Promote to entry point if this node tops the graph.
        if node_level > top_layer {
            let mut entry = self.entry.write();
            if node_level > entry.top_layer {
                entry.top_layer = node_level;
                entry.point = Some(id);
            }
        }
    }

    /// Heuristic neighbor selection: prefer diverse neighbors, keeping a
    /// candidate only if it is closer to the base than to every neighbor
    /// already kept, then backfill with the closest leftovers up to `m`.
    fn select_neighbors(&self, candidates: &[(f32, u32)], m: usize) -> Vec<(f32, u32)> {
        let mut sorted = candidates.to_vec();
        sorted.sort_unstable_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.cmp(&b.1))
        });

        let mut selected: Vec<(f32, u32)> = Vec::with_capacity(m);
        for &(dist_to_base, cid) in &sorted {
            if selected.len() >= m {
                break;
            }
            let diverse = selected.iter().all(|&(_, sid)| {
                dist_to_base <= euclidean_sq(self.vector(cid), self.vector(sid))
            });
            if diverse {
                selected.push((dist_to_base, cid));
            }
        }

        if selected.len() < m {
            for &(dist, cid) in &sorted {
                if selected.len() >= m {
                    break;
                }
                if !selected.iter().any(|&(_, sid)| sid == cid) {
                    selected.push((dist, cid));
                }
            }
        }

        selected
    }

    /// Freeze into an immutable index for the query phase.
    pub fn into_index(self) -> HnswIndex {
        let entry = self.entry.into_inner();
        HnswIndex {
            config: self.config,
            dim: self.dim,
            vectors: self.vectors,
            neighbors: self.links.into_iter().map(|l| l.into_inner()).collect(),
            levels: self.levels,
            entry_point: entry.point,
            max_layer: entry.top_layer,
        }
    }
}

impl GraphView for HnswBuilder {
    #[inline]
    fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    fn vector(&self, id: u32) -> &[f32] {
        let start = id as usize * self.dim;
        &self.vectors[start..start + self.dim]
    }

    #[inline]
    fn read_neighbors(&self, id: u32, layer: usize, out: &mut Vec<u32>) {
        let layers = self.links[id as usize].read();
        if layer < layers.len() {
            out.extend_from_slice(&layers[layer]);
        }
    }
}

/// Sample a node's top layer: `floor(-ln(uniform) / ln(m))`, capped at
/// `max_layers - 1`.
fn random_level(ml: f64, max_layers: usize) -> usize {
    let r: f64 = rand::random();
    let level = (-r.ln() * ml).floor() as usize;
    level.min(max_layers - 1)
}

/// Build a frozen HNSW index over the dataset's vectors.
///
/// Inserts are distributed across `num_threads` workers (0 = one per
/// hardware thread) claiming ids from an atomic counter; a panic on any
/// worker propagates after all workers drain.
pub fn build_index(
    points: &PointSet,
    config: &HnswConfig,
    num_threads: usize,
) -> Result<HnswIndex> {
    let builder = HnswBuilder::new(points, config.clone())?;
    parallel::parallel_for(points.len(), num_threads, |i| builder.insert(i as u32));
    let index = builder.into_index();
    tracing::debug!(
        nodes = index.len(),
        max_layer = index.max_layer(),
        "hnsw build complete"
    );
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn small_config() -> HnswConfig {
        HnswConfig {
            m: 8,
            m_max0: 16,
            ef_construction: 64,
            ef_search: 64,
            max_layers: 16,
        }
    }

    /// PointSet whose vector lanes are the given vectors; the continuous
    /// attribute is the point's own index.
    fn points_with_vectors(vectors: &[Vec<f32>]) -> PointSet {
        let dim = vectors.first().map_or(1, Vec::len);
        let mut data = Vec::with_capacity(vectors.len() * (config::POINT_EXTRAS + dim));
        for (i, v) in vectors.iter().enumerate() {
            data.push(0.0);
            data.push(i as f32);
            data.extend_from_slice(v);
        }
        PointSet::new(data, config::POINT_EXTRAS + dim).unwrap()
    }

    fn random_vectors(n: usize, dim: usize, seed: u64) -> Vec<Vec<f32>> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| (0..dim).map(|_| rng.gen_range(-1.0..1.0f32)).collect())
            .collect()
    }

    #[test]
    fn test_empty_graph() {
        let points = points_with_vectors(&[]);
        let index = build_index(&points, &small_config(), 1).unwrap();
        assert!(index.is_empty());
        assert!(index.search(&[0.0], 5).is_empty());
    }

    #[test]
    fn test_single_node() {
        let points = points_with_vectors(&[vec![1.0, 2.0, 3.0]]);
        let index = build_index(&points, &small_config(), 1).unwrap();
        assert_eq!(index.len(), 1);
        let found = index.search(&[1.0, 2.0, 3.0], 3);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].1, 0);
        assert_eq!(found[0].0, 0.0);
    }

    #[test]
    fn test_self_recall() {
        let vectors = random_vectors(200, 8, 0x5eed);
        let points = points_with_vectors(&vectors);
        let index = build_index(&points, &small_config(), 1).unwrap();

        let mut hits = 0;
        for (i, v) in vectors.iter().enumerate() {
            let found = index.search(v, 1);
            if found.first().map(|&(_, id)| id) == Some(i as u32) {
                hits += 1;
            }
        }
        let recall = hits as f32 / vectors.len() as f32;
        assert!(recall >= 0.95, "self-recall {recall} below 0.95");
    }

    #[test]
    fn test_parallel_build_self_recall() {
        let vectors = random_vectors(300, 8, 0xfeed);
        let points = points_with_vectors(&vectors);
        let index = build_index(&points, &small_config(), 4).unwrap();

        let mut hits = 0;
        for (i, v) in vectors.iter().enumerate() {
            let found = index.search(v, 1);
            if found.first().map(|&(_, id)| id) == Some(i as u32) {
                hits += 1;
            }
        }
        let recall = hits as f32 / vectors.len() as f32;
        assert!(recall >= 0.95, "parallel self-recall {recall} below 0.95");
    }

    #[test]
    fn test_search_results_sorted_and_unique() {
        let vectors = random_vectors(150, 6, 0xcafe);
        let points = points_with_vectors(&vectors);
        let index = build_index(&points, &small_config(), 2).unwrap();

        let query: Vec<f32> = vec![0.1; 6];
        let found = index.search(&query, 10);
        assert_eq!(found.len(), 10);
        for pair in found.windows(2) {
            assert!(pair[0].0 <= pair[1].0, "unsorted results: {found:?}");
        }
        let mut ids: Vec<u32> = found.iter().map(|&(_, id)| id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 10, "duplicate ids in results");
    }

    #[test]
    fn test_degree_bounds_hold() {
        let vectors = random_vectors(250, 4, 0xd00d);
        let points = points_with_vectors(&vectors);
        let cfg = small_config();
        let index = build_index(&points, &cfg, 4).unwrap();

        for layers in &index.neighbors {
            for (layer, list) in layers.iter().enumerate() {
                let cap = if layer == 0 { cfg.m_max0 } else { cfg.m };
                assert!(
                    list.len() <= cap,
                    "layer {layer} degree {} exceeds {cap}",
                    list.len()
                );
            }
        }
    }

    #[test]
    fn test_builder_rejects_bad_config() {
        let points = points_with_vectors(&[vec![0.0; 4]]);
        let mut cfg = small_config();
        cfg.m = 1;
        assert!(HnswBuilder::new(&points, cfg).is_err());

        let mut cfg = small_config();
        cfg.max_layers = 0;
        assert!(HnswBuilder::new(&points, cfg).is_err());

        let mut cfg = small_config();
        cfg.ef_construction = 0;
        assert!(HnswBuilder::new(&points, cfg).is_err());
    }
}
