use chrono::Local;
use clap::Parser;
use kbreslib::{
    error::Result,
    kb::{ClauseKb, Kb},
    proofs::GraphvizMode,
    propositional::PropKb,
    resolution::{AnswerFilter, ResolutionConfig, ResourceLimitConfig},
};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Answer queries against a knowledge base
#[derive(Parser)]
struct Cli {
    /// Path to a file with one formula per line, lines starting with `//` are skipped
    file: PathBuf,
    /// Query to prove, may be repeated
    #[arg(long)]
    ask: Vec<String>,
    /// Query to list the answers of, may be repeated
    #[arg(long)]
    bindings: Vec<String>,
    /// Read the file as propositional formulas and decide queries with the SAT oracle
    #[arg(long)]
    propositional: bool,
    /// Print the DIMACS problem of this propositional query
    #[arg(long)]
    dimacs: Option<String>,
    /// Resolutions allowed while eliminating a single predicate
    #[arg(long, default_value_t = 100)]
    max_resolutions: usize,
    /// Which answers a bindings query reports
    #[arg(long, value_enum, default_value_t = AnswerFilter::Ground)]
    answers: AnswerFilter,
    /// Print the proof of every successful query
    #[arg(long)]
    proofs: bool,
    /// Print a graphviz rendering of the proof of every query
    #[arg(long, value_enum)]
    proof_graph: Option<GraphvizMode>,
    /// Give up a query after this many seconds
    #[arg(long)]
    timeout: Option<u64>,
    /// Give up a query once the prover uses more than this many MB
    #[arg(long)]
    memory_limit: Option<usize>,
}

fn megabytes(mb: usize) -> usize {
    mb.saturating_mul(1024 * 1024)
}

fn read_axioms(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("//"))
        .map(str::to_string)
        .collect())
}

fn tell_all<K: Kb>(kb: &mut K, axioms: &[String]) -> Result<()> {
    for axiom in axioms {
        match kb.tell(axiom) {
            Ok(()) => {}
            Err(err) if err.is_recoverable() => log::warn!("Skipping {}: {}", axiom, err),
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

fn run_queries<K: Kb>(kb: &mut K, args: &Cli, mut report: impl FnMut(&K)) -> Result<()> {
    for query in args.ask.iter() {
        let proven = kb.ask(query)?;
        println!("ask {}: {} ({})", query, proven, kb.stats());
        report(kb);
    }
    for query in args.bindings.iter() {
        let bindings = kb.ask_bindings(query)?;
        println!(
            "bindings {}: {} answer(s) ({})",
            query,
            bindings.len(),
            kb.stats()
        );
        print!("{}", bindings);
        report(kb);
    }
    Ok(())
}

fn run(args: &Cli) -> Result<()> {
    log::info!("Parse file: {:?}", args.file);
    let axioms = read_axioms(&args.file)?;

    if args.propositional {
        let mut kb = PropKb::new();
        tell_all(&mut kb, &axioms)?;
        if let Some(query) = &args.dimacs {
            print!("{}", kb.export_clauses(query)?);
        }
        return run_queries(&mut kb, args, |_| {});
    }

    if args.dimacs.is_some() {
        log::warn!("--dimacs only applies to propositional knowledge bases");
    }
    let config = ResolutionConfig {
        max_resolutions_per_elimination: args.max_resolutions,
        answer_filter: args.answers,
        track_proofs: args.proofs || args.proof_graph.is_some(),
        limits: ResourceLimitConfig {
            duration: args.timeout.map(Duration::from_secs),
            memory_limit: args.memory_limit.map(megabytes),
        },
    };
    let mut kb = ClauseKb::with_config(config);
    tell_all(&mut kb, &axioms)?;
    run_queries(&mut kb, args, |kb| {
        if args.proofs {
            if let Some(tree) = kb.last_proof().print_tree() {
                print!("{}", tree);
            }
        }
        if let Some(mode) = args.proof_graph {
            println!("{}", kb.last_proof().to_graphviz(mode));
        }
    })
}

fn main() {
    let args = Cli::parse();
    env_logger::builder()
        .format(|buf, record| {
            let level_style = buf.default_level_style(record.level()).bold();
            writeln!(
                buf,
                "{}|{level_style}{:7}{level_style:#}|{:10}| {}",
                Local::now().format("%H:%M:%S"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
    if let Err(err) = run(&args) {
        log::error!("{}", err);
        std::process::exit(1);
    }
}
