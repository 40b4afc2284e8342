use std::io::Write;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use seed_extend::config::{ExtendConfig, ExtensionMode, SequenceMode};
use seed_extend::index::store::SeqStore;
use seed_extend::io::fasta;
use seed_extend::search;
use seed_extend::stats::Statistics;
use seed_extend::util::alphabet;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "seed-extend", author, version, about = "Seed-and-extend protein alignment", arg_required_else_help = true)]
struct Cli {
    /// Debug-level logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Mode {
    Blastp,
    Blastx,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Ext {
    Banded,
    Full,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a protein database from FASTA
    Makedb {
        /// Protein FASTA file
        input: String,
        /// Output database path (.sdb appended)
        #[arg(short = 'd', long = "db")]
        db: String,
    },
    /// Search queries against a database
    Search {
        /// Database built with makedb
        #[arg(short = 'd', long = "db")]
        db: String,
        /// Query FASTA file
        #[arg(short = 'q', long = "query")]
        query: String,
        /// Output TSV path (stdout if omitted)
        #[arg(short, long)]
        out: Option<String>,
        #[arg(long, value_enum, default_value_t = Mode::Blastp)]
        mode: Mode,
        #[arg(long, value_enum, default_value_t = Ext::Banded)]
        ext: Ext,
        #[arg(short = 'e', long = "evalue", default_value_t = 1e-3)]
        evalue: f64,
        #[arg(long = "min-score", default_value_t = 0.0)]
        min_score: f64,
        #[arg(short = 'k', long = "max-target-seqs", default_value_t = 25)]
        max_target_seqs: usize,
        #[arg(long = "top", default_value_t = 100.0)]
        top: f64,
        #[arg(long = "max-hsps", default_value_t = 1)]
        max_hsps: usize,
        #[arg(long = "id", default_value_t = 0.0)]
        min_id: f64,
        #[arg(long = "query-cover", default_value_t = 0.0)]
        query_cover: f64,
        #[arg(long = "subject-cover", default_value_t = 0.0)]
        subject_cover: f64,
        #[arg(long = "gapopen", default_value_t = 11)]
        gap_open: i32,
        #[arg(long = "gapextend", default_value_t = 1)]
        gap_extend: i32,
        #[arg(long, default_value_t = 0)]
        padding: i32,
        #[arg(long = "ext-chunk-size", default_value_t = 400)]
        ext_chunk_size: usize,
        #[arg(long = "adaptive-ranking")]
        adaptive_ranking: bool,
        #[arg(long = "query-memory")]
        query_memory: bool,
        #[arg(long = "gapped-filter-evalue", default_value_t = 0.0)]
        gapped_filter_evalue: f64,
        /// Disable composition-based score correction
        #[arg(long = "no-comp-based-stats")]
        no_cbs: bool,
        #[arg(long = "no-traceback")]
        no_traceback: bool,
        #[arg(long = "log-query")]
        log_query: bool,
        #[arg(long = "log-extend")]
        log_extend: bool,
        /// Reference block size in letters
        #[arg(short = 'b', long = "block-size", default_value_t = 400_000_000)]
        block_size: u64,
        #[arg(short = 't', long = "threads", default_value_t = 0)]
        threads: usize,
        /// Write the effective configuration next to the output
        #[arg(long = "dump-config")]
        dump_config: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Commands::Makedb { input, db } => run_makedb(&input, &db),
        Commands::Search {
            db,
            query,
            out,
            mode,
            ext,
            evalue,
            min_score,
            max_target_seqs,
            top,
            max_hsps,
            min_id,
            query_cover,
            subject_cover,
            gap_open,
            gap_extend,
            padding,
            ext_chunk_size,
            adaptive_ranking,
            query_memory,
            gapped_filter_evalue,
            no_cbs,
            no_traceback,
            log_query,
            log_extend,
            block_size,
            threads,
            dump_config,
        } => {
            let cfg = ExtendConfig {
                mode: match mode {
                    Mode::Blastp => SequenceMode::Protein,
                    Mode::Blastx => SequenceMode::Translated,
                },
                ext: match ext {
                    Ext::Banded => ExtensionMode::Banded,
                    Ext::Full => ExtensionMode::Full,
                },
                max_evalue: evalue,
                min_bit_score: min_score,
                max_alignments: max_target_seqs,
                toppercent: top,
                max_hsps,
                min_id,
                query_cover,
                subject_cover,
                gap_open,
                gap_extend,
                padding,
                ext_chunk_size,
                adaptive_ranking,
                query_memory,
                gapped_filter_evalue,
                comp_based_stats: !no_cbs,
                disable_traceback: no_traceback,
                log_query,
                log_extend,
                block_size,
                threads,
                ..Default::default()
            };
            if let Some(p) = dump_config {
                cfg.save_to_file(&p).with_context(|| format!("cannot write config to '{}'", p))?;
            }
            run_search(&db, &query, out.as_deref(), &cfg)
        }
    }
}

fn run_makedb(input: &str, output: &str) -> Result<()> {
    let records =
        fasta::read_fasta_file(input).with_context(|| format!("cannot read protein FASTA '{}'", input))?;
    if records.is_empty() {
        anyhow::bail!("FASTA file '{}' contains no sequences", input);
    }

    let mut store = SeqStore::new();
    for rec in &records {
        store.push(rec.id.clone(), &alphabet::encode_protein(&rec.seq));
    }
    if store.total_len() == 0 {
        anyhow::bail!("FASTA file '{}' contains only empty sequences", input);
    }
    log::info!("sequences: {}", store.len());
    log::info!("letters: {}", store.total_len());

    let out_path = format!("{}.sdb", output);
    store
        .save_to_file(&out_path)
        .with_context(|| format!("cannot write database to '{}'", out_path))?;
    log::info!("database saved: {}", out_path);
    Ok(())
}

fn run_search(db_path: &str, query_path: &str, out_path: Option<&str>, cfg: &ExtendConfig) -> Result<()> {
    if cfg.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cfg.threads)
            .build_global()
            .context("cannot configure worker threads")?;
    }
    let db = SeqStore::load_from_file(db_path).with_context(|| format!("cannot load database '{}'", db_path))?;
    log::info!("database: {} sequences, {} letters (built {})", db.len(), db.total_len(), db.meta.created_at);
    let queries =
        fasta::read_fasta_file(query_path).with_context(|| format!("cannot read query FASTA '{}'", query_path))?;
    log::info!("queries: {}", queries.len());

    let stats = Statistics::new();
    let results = search::search(&queries, &db, cfg, &stats)?;

    let mut out: Box<dyn Write> = match out_path {
        Some(p) => Box::new(std::io::BufWriter::new(
            std::fs::File::create(p).with_context(|| format!("cannot create output '{}'", p))?,
        )),
        None => Box::new(std::io::BufWriter::new(std::io::stdout())),
    };
    search::write_tsv(&mut out, &results, &db)?;
    out.flush()?;

    let reported: usize = results.iter().map(|r| r.matches.len()).sum();
    log::info!("reported {} target sequences", reported);
    log::debug!("statistics:\n{}", stats.report());
    Ok(())
}
