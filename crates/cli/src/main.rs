//! vecrange: answer range-filtered approximate k-NN queries over a binary
//! vector dataset.
//!
//! Reads the dataset and query files, bulk-loads the B+-tree, builds the
//! HNSW graph in parallel, answers every query, writes the `(N x K)` u32
//! result table, and verifies the written file by reading it back.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use vecrange_core::{config, io, recall, BuildOptions, EngineParams, HnswConfig, SearchEngine};

/// Sentinel written into result rows when a filter admits fewer than `k`
/// candidates.
const PAD_ID: u32 = u32::MAX;

#[derive(Parser)]
#[command(
    name = "vecrange",
    about = "Range-filtered approximate k-NN over binary vector datasets"
)]
struct Args {
    /// Dataset file: little-endian u32 row count, then rows of
    /// (vec_dim + 2) f32 lanes
    dataset: PathBuf,

    /// Query file: little-endian u32 row count, then rows of
    /// (vec_dim + 4) f32 lanes
    queries: PathBuf,

    /// Output file for the row-major (N x k) u32 result table
    output: PathBuf,

    /// Vector lanes per row (excluding the scalar metadata lanes)
    #[arg(long, default_value_t = config::VEC_DIM)]
    vec_dim: usize,

    /// Neighbors returned per query
    #[arg(short, long, default_value_t = config::K)]
    k: usize,

    /// Graph candidate breadth before post-filtering
    #[arg(long, default_value_t = config::DEFAULT_K_INIT)]
    k_init: usize,

    /// Filtered-candidate count at or below which queries are answered by
    /// exhaustive scoring
    #[arg(long, default_value_t = config::DEFAULT_BRUTE_THRESHOLD)]
    brute_threshold: usize,

    /// B+-tree order (a leaf holds at most 2 * order keys)
    #[arg(long, default_value_t = config::BPTREE_DEFAULT_ORDER)]
    tree_order: usize,

    /// Leaf fill fraction during bulk load, in (0, 1]
    #[arg(long, default_value_t = config::DEFAULT_FILL_FACTOR)]
    fill_factor: f32,

    /// HNSW links per node on upper layers (layer 0 uses twice this)
    #[arg(long, default_value_t = config::HNSW_DEFAULT_M)]
    m: usize,

    /// HNSW candidate-list width during construction
    #[arg(long, default_value_t = config::HNSW_DEFAULT_EF_CONSTRUCTION)]
    ef_construction: usize,

    /// HNSW candidate-list width during search
    #[arg(long, default_value_t = config::HNSW_DEFAULT_EF_SEARCH)]
    ef_search: usize,

    /// Worker threads for graph build and query batches (0 = one per
    /// hardware thread)
    #[arg(long, default_value_t = 0)]
    threads: usize,

    /// Compute exact ground truth per query and log the mean recall
    /// (slow: one exhaustive scan per query)
    #[arg(long, default_value_t = false)]
    audit_recall: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> vecrange_core::Result<()> {
    let points = io::read_points(&args.dataset, args.vec_dim + config::POINT_EXTRAS)?;
    let queries = io::read_queries(&args.queries, args.vec_dim + config::QUERY_EXTRAS)?;

    let options = BuildOptions {
        tree_order: args.tree_order,
        fill_factor: args.fill_factor,
        hnsw: HnswConfig {
            m: args.m,
            m_max0: args.m * 2,
            ef_construction: args.ef_construction,
            ef_search: args.ef_search,
            max_layers: config::HNSW_DEFAULT_MAX_LAYERS,
        },
        num_threads: args.threads,
    };
    let params = EngineParams {
        k: args.k,
        k_init: args.k_init,
        brute_threshold: args.brute_threshold,
    };
    let engine = SearchEngine::build(points, &options, params)?;

    let start = Instant::now();
    let mut answers = engine.answer_all(&queries)?;
    let elapsed = start.elapsed();
    tracing::info!(
        queries = queries.len(),
        elapsed_ms = elapsed.as_millis() as u64,
        qps = (queries.len() as f64 / elapsed.as_secs_f64()) as u64,
        "query batch answered"
    );

    if args.audit_recall {
        let truths: Vec<_> = vecrange_core::parallel::parallel_map(
            queries.len(),
            args.threads,
            |i| engine.exact_answer(&queries, i),
        );
        let mut total = 0.0f64;
        for (answer, truth) in answers.iter().zip(&truths) {
            let truth = truth.as_ref().map_err(|e| std::io::Error::other(e.to_string()))?;
            total += f64::from(recall(answer, truth));
        }
        let mean = total / answers.len().max(1) as f64;
        tracing::info!(mean_recall = mean, "recall audit finished");
    }

    // Keep the output's fixed row shape: short answers get the sentinel.
    let mut short_rows = 0usize;
    for row in &mut answers {
        if row.len() < args.k {
            short_rows += 1;
            row.resize(args.k, PAD_ID);
        }
    }
    if short_rows > 0 {
        tracing::warn!(
            rows = short_rows,
            "padded answers whose filter admitted fewer than k candidates"
        );
    }

    io::save_knn(&answers, args.k, &args.output)?;

    let loaded = io::read_knn(&args.output, args.k)?;
    if loaded != answers {
        return Err(std::io::Error::other("output read-back does not match in-memory results").into());
    }
    tracing::info!(path = %args.output.display(), "output written and verified");

    Ok(())
}
