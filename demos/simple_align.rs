//! 演示如何在 library 模式下使用 seed-extend 做种子扩展。
//!
//! 运行方式：
//! ```bash
//! cargo run --example simple_align
//! ```

use seed_extend::align::memory::QueryMemory;
use seed_extend::align::query::QueryInput;
use seed_extend::align::seed::ExtendScratch;
use seed_extend::align::sw::banded_sw;
use seed_extend::align::{extend, SearchContext};
use seed_extend::config::ExtendConfig;
use seed_extend::dp::SimdEngine;
use seed_extend::index::kmer::SeedIndex;
use seed_extend::index::store::SeqStore;
use seed_extend::score::ScoreMatrix;
use seed_extend::stats::{LocalStats, Stat};
use seed_extend::util::alphabet::{decode_protein, encode_protein};

fn main() -> anyhow::Result<()> {
    // 1. 构建参考库：一条同源序列（含一处插入）和两条无关序列
    let query_seq = b"MKVLAAGWYRDEHIKLPQSTNCFMWVRRGLEDNAPKWYHC";
    let mut store = SeqStore::new();
    store.push("homolog", &encode_protein(b"MKVLAAGWYRDEHIKGGGLPQSTNCFMWVRRGLEDNAPKWYHC"));
    store.push("unrelated1", &encode_protein(b"GSGSGSGSGSGSGSGSGSGSGSGSGSGS"));
    store.push("unrelated2", &encode_protein(b"PPPPAPPPPAPPPPAPPPPA"));
    println!("参考库: {} 条序列, {} 个残基", store.len(), store.total_len());

    // 2. k-mer 种子索引
    let cfg = ExtendConfig::default();
    cfg.validate()?;
    let matrix = ScoreMatrix::new(cfg.gap_open, cfg.gap_extend, store.total_len())?;
    let index = SeedIndex::build(&store, cfg.seed_len, cfg.max_seed_occurrences);
    println!("种子索引: k={}, {} 个不同的 k-mer", index.k(), index.len());

    let query = QueryInput::from_config(0, "demo_query", query_seq, &cfg, &matrix);
    let mut hits = index.hits(&query, &matrix);
    println!("查询 '{}' 产生 {} 个种子命中", query.title, hits.len());

    // 3. 种子扩展
    let memory = QueryMemory::new(cfg.max_alignments);
    let engine = SimdEngine::current();
    println!("DP 引擎: {}", engine.description());
    let ctx = SearchContext { cfg: &cfg, matrix: &matrix, store: &store, memory: &memory, engine };
    let mut scratch = ExtendScratch::new();
    let mut stats = LocalStats::new();
    let matches = extend(&query, &mut hits, &ctx, &mut scratch, &mut stats)?;

    println!("\n比对结果:");
    for m in &matches {
        for h in &m.hsps {
            println!(
                "  {}: score={} bits={:.1} evalue={:.2e} q[{}..{}] s[{}..{}] cigar={}",
                store.id(m.block_id as usize),
                h.score,
                h.bit_score,
                h.evalue,
                h.query_range.begin,
                h.query_range.end,
                h.subject_range.begin,
                h.subject_range.end,
                h.cigar
            );
        }
    }
    println!(
        "有命中的目标 {}，DP 调用 {} 次",
        stats.get(Stat::TargetHits0),
        stats.get(Stat::DpCalls)
    );

    // 4. 标量参照实现，直接在给定对角线带上比对
    let q = encode_protein(query_seq);
    let s = store.seq(0);
    let r = banded_sw(&q, s, (-8, 9), &matrix, None);
    println!("\n标量带状 SW: score={} cigar={}", r.score, r.cigar);
    println!("  query  : {}", String::from_utf8_lossy(&decode_protein(&q[r.query_start..r.query_end])));
    println!("  subject: {}", String::from_utf8_lossy(&decode_protein(&s[r.ref_start..r.ref_end])));

    Ok(())
}
