//! 搜索驱动：按块遍历参考库，查询间并行，块间合并并再做一次 culling。

use std::io::Write;

use anyhow::{Context, Result};
use rayon::prelude::*;

use crate::align::culling::cull_matches;
use crate::align::memory::QueryMemory;
use crate::align::query::QueryInput;
use crate::align::seed::ExtendScratch;
use crate::align::target::Match;
use crate::align::{extend, SearchContext};
use crate::config::ExtendConfig;
use crate::dp::SimdEngine;
use crate::index::kmer::SeedIndex;
use crate::index::store::SeqStore;
use crate::io::fasta::FastaRecord;
use crate::score::ScoreMatrix;
use crate::stats::{LocalStats, Statistics};

/// 单条查询的最终结果；`Match::block_id` 已换算为全库序列编号
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub query_id: usize,
    pub title: String,
    pub matches: Vec<Match>,
}

/// 对全部查询搜索整个库
pub fn search(queries: &[FastaRecord], db: &SeqStore, cfg: &ExtendConfig, stats: &Statistics) -> Result<Vec<QueryResult>> {
    cfg.validate()?;
    let matrix = ScoreMatrix::new(cfg.gap_open, cfg.gap_extend, db.total_len())?;
    let engine = SimdEngine::current();
    let memory = QueryMemory::new(cfg.max_alignments);

    let inputs: Vec<QueryInput> = queries
        .iter()
        .enumerate()
        .map(|(k, r)| QueryInput::from_config(k, r.id.clone(), &r.seq, cfg, &matrix))
        .collect();
    let mut merged: Vec<Vec<Match>> = vec![Vec::new(); inputs.len()];

    let blocks = db.blocks(cfg.block_size);
    for (b, block) in blocks.iter().enumerate() {
        log::info!(
            "Processing reference block {}/{} ({} sequences, {} letters)",
            b + 1,
            blocks.len(),
            block.len(),
            block.total_len()
        );
        let index = SeedIndex::build(block, cfg.seed_len, cfg.max_seed_occurrences);
        let ctx = SearchContext { cfg, matrix: &matrix, store: block, memory: &memory, engine };

        let per_query: Vec<Vec<Match>> = inputs
            .par_iter()
            .map_init(ExtendScratch::new, |scratch, q| {
                let mut local = LocalStats::new();
                let mut hits = index.hits(q, &matrix);
                let r = extend(q, &mut hits, &ctx, scratch, &mut local);
                stats.merge(&local);
                r
            })
            .collect::<crate::error::Result<_>>()
            .with_context(|| format!("extension failed in reference block {}", b + 1))?;

        for (acc, matches) in merged.iter_mut().zip(per_query) {
            acc.extend(matches.into_iter().map(|mut m| {
                m.block_id += block.first_oid as u32;
                m
            }));
        }
    }

    Ok(inputs
        .iter()
        .zip(merged)
        .map(|(q, mut matches)| {
            cull_matches(&mut matches, q.source_len(), db, cfg);
            QueryResult { query_id: q.id, title: q.title.clone(), matches }
        })
        .collect())
}

/// 每条 HSP 一行的制表符分隔输出：
/// qseqid sseqid pident length mismatch gapopen qstart qend sstart send evalue bitscore
pub fn write_tsv(out: &mut dyn Write, results: &[QueryResult], db: &SeqStore) -> Result<()> {
    for r in results {
        for m in &r.matches {
            let sid = db.id(m.block_id as usize);
            for h in &m.hsps {
                let q = h.query_source_range;
                // reverse-strand frames report descending query coordinates
                let (qstart, qend) = if h.frame >= 3 { (q.end, q.begin + 1) } else { (q.begin + 1, q.end) };
                writeln!(
                    out,
                    "{}\t{}\t{:.1}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{:.2e}\t{:.1}",
                    r.title,
                    sid,
                    h.approx_id(),
                    h.length,
                    h.mismatches,
                    h.gap_openings,
                    qstart,
                    qend,
                    h.subject_range.begin + 1,
                    h.subject_range.end,
                    h.evalue,
                    h.bit_score,
                )?;
            }
        }
    }
    Ok(())
}
