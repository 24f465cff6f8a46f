//! Command line interface

use std::fmt::Display;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use aigfraig::equiv::{
    fraig, random_simulation, FecPartition, FraigConfig, KissatOracle, MinisatOracle, SimPolicy,
};
use aigfraig::io::{read_network_file, read_pattern_file, write_network_file};
use aigfraig::network::stats::stats;
use aigfraig::sim::{pack_patterns, simulate_words, write_sim_log};
use aigfraig::{optim, Network};
use clap::{Args, Parser, Subcommand, ValueEnum};
use itertools::Itertools;
use kdam::{tqdm, BarExt};
use rand::rngs::SmallRng;
use rand::SeedableRng;

/// Command line arguments
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Command line arguments
#[derive(Subcommand)]
pub enum Commands {
    /// Show statistics about a logic network
    ///
    /// Will print statistics on the number of inputs, outputs and gates in the network,
    /// as well as the gates with undefined fanins and the gates that are never used.
    #[clap()]
    Show(ShowArgs),

    /// Optimize a logic network
    ///
    /// Removes unreachable gates, merges structurally identical gates, propagates constants,
    /// then merges functionally equivalent gates proven with a SAT solver.
    #[clap(alias = "opt")]
    Optimize(OptArgs),

    /// Simulate a logic network
    ///
    /// Patterns are given with one 0/1 character per input, separated by whitespace:
    ///    00011101
    ///    01110000
    /// The groups of gates that are not distinguished by the patterns are reported.
    /// The whole file is checked first: nothing is simulated if any pattern is invalid.
    /// The log only holds the patterns of the file; random simulation is run by `opt`.
    #[clap(alias = "sim")]
    Simulate(SimulateArgs),
}

/// Print an error and exit
fn exit_on_error<T, E: Display>(res: Result<T, E>) -> T {
    match res {
        Ok(v) => v,
        Err(e) => {
            eprintln!("[ERROR] {e}");
            std::process::exit(1);
        }
    }
}

fn read_network(path: &Path) -> Network {
    exit_on_error(read_network_file(path))
}

/// Command arguments for network informations
#[derive(Args)]
pub struct ShowArgs {
    /// Network to show
    file: PathBuf,

    /// Print the gates in topological order
    #[arg(long)]
    netlist: bool,

    /// Print a single gate with its fanins, fanouts and simulation value
    #[arg(long)]
    gate: Option<u32>,

    /// Print the fanin cone of the gate, up to this depth
    #[arg(long, requires = "gate")]
    fanin: Option<usize>,

    /// Print the fanout cone of the gate, up to this depth
    #[arg(long, requires = "gate")]
    fanout: Option<usize>,

    /// Run random simulation and print the groups of candidate equivalent gates
    #[arg(long)]
    fec: bool,

    /// Seed for random simulation
    #[arg(long, default_value_t = 1)]
    seed: u64,
}

impl ShowArgs {
    pub fn run(&self) {
        let mut aig = read_network(&self.file);
        println!("{}", stats(&aig));
        if self.netlist {
            println!("{aig}");
        }
        let mut partition = FecPartition::new();
        if self.fec {
            let mut rng = SmallRng::seed_from_u64(self.seed);
            random_simulation(&mut aig, &mut partition, &SimPolicy::default(), &mut rng);
            println!("Total #FEC Group = {}", partition.nb_groups());
            print!("{partition}");
        }
        if let Some(id) = self.gate {
            let Some(g) = aig.get_gate(id) else {
                eprintln!("[ERROR] Gate {id} does not exist");
                std::process::exit(1);
            };
            println!("{g}");
            println!("  Fanins:  {}", g.fanins().iter().join(" "));
            println!("  Fanouts: {}", g.fanouts().iter().join(" "));
            if self.fec {
                println!(
                    "  FECs:    {}",
                    partition.equivalent_gates(&aig, id).iter().join(" ")
                );
            }
            let bits = format!("{:064b}", g.value());
            println!(
                "  Value:   {}",
                bits.as_bytes().chunks(8).map(String::from_utf8_lossy).join("_")
            );
            if let Some(level) = self.fanin {
                print!("{}", aig.fanin_report(id, level));
            }
            if let Some(level) = self.fanout {
                print!("{}", aig.fanout_report(id, level));
            }
        }
    }
}

/// SAT solver used to prove equivalences
#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SolverKind {
    /// Incremental Minisat, kept for the whole run
    Minisat,
    /// A new Kissat instance for each query
    Kissat,
}

/// Command arguments for optimization
#[derive(Args)]
pub struct OptArgs {
    /// Network to optimize
    file: PathBuf,

    /// Output file for optimized network
    #[arg(short = 'o', long)]
    output: PathBuf,

    /// Seed for random simulation
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Number of counterexamples without any merge before giving up on equivalence proofs
    #[arg(long, default_value_t = FraigConfig::default().effort_limit)]
    effort_limit: usize,

    /// Maximum number of counterexamples collected before simulating them
    #[arg(long, default_value_t = FraigConfig::default().max_counterexamples)]
    max_counterexamples: usize,

    /// Minimum number of rounds of random simulation
    #[arg(long, default_value_t = SimPolicy::default().min_rounds)]
    min_rounds: usize,

    /// Maximum number of rounds of random simulation
    #[arg(long, default_value_t = SimPolicy::default().max_rounds)]
    max_rounds: usize,

    /// Skip the SAT-based merging of equivalent gates
    #[arg(long)]
    no_fraig: bool,

    /// SAT solver for equivalence proofs
    #[arg(long, value_enum, default_value_t = SolverKind::Minisat)]
    solver: SolverKind,
}

impl OptArgs {
    pub fn run(&self) {
        let mut aig = read_network(&self.file);
        let before = aig.nb_ands();
        aig.sweep();
        optim::strash(&mut aig);
        optim::optimize(&mut aig);
        aig.sweep();
        if !self.no_fraig {
            let policy = SimPolicy {
                min_rounds: self.min_rounds,
                max_rounds: self.max_rounds.max(self.min_rounds),
                ..SimPolicy::default()
            };
            let config = FraigConfig {
                effort_limit: self.effort_limit,
                max_counterexamples: self.max_counterexamples.clamp(1, 64),
            };
            let mut rng = SmallRng::seed_from_u64(self.seed);
            let mut partition = FecPartition::new();
            random_simulation(&mut aig, &mut partition, &policy, &mut rng);
            let res = match self.solver {
                SolverKind::Minisat => {
                    fraig(&mut aig, &mut partition, &mut MinisatOracle::new(), &config)
                }
                SolverKind::Kissat => {
                    fraig(&mut aig, &mut partition, &mut KissatOracle::new(), &config)
                }
            };
            let stats = exit_on_error(res);
            println!("{stats}");
            aig.sweep();
            optim::strash(&mut aig);
        }
        println!("{} And gates before optimization, {} after", before, aig.nb_ands());
        exit_on_error(write_network_file(&self.output, &aig));
    }
}

/// Command arguments for simulation
#[derive(Args)]
pub struct SimulateArgs {
    /// Network to simulate
    network: PathBuf,

    /// Input patterns file
    #[arg(short = 'i', long)]
    input: PathBuf,

    /// Log file for the input and output values of each pattern
    #[arg(long)]
    log: Option<PathBuf>,
}

impl SimulateArgs {
    pub fn run(&self) {
        let mut aig = read_network(&self.network);
        let patterns = exit_on_error(read_pattern_file(&self.input, aig.nb_inputs()));
        let mut log = self
            .log
            .as_ref()
            .map(|p| BufWriter::new(exit_on_error(File::create(p))));
        let batches = pack_patterns(&patterns, aig.nb_inputs());

        let mut partition = FecPartition::new();
        partition.seed(&mut aig);
        let mut progress = tqdm!(total = batches.len());
        progress.set_description("Simulation");
        for batch in &batches {
            simulate_words(&mut aig, &batch.words);
            let nb_groups = partition.refine(&mut aig);
            if let Some(w) = log.as_mut() {
                exit_on_error(write_sim_log(w, &aig, &batch.words, batch.count));
            }
            progress.set_postfix(format!("groups={nb_groups}"));
            let _ = progress.update(1);
        }
        if let Some(mut w) = log {
            exit_on_error(w.flush());
        }
        println!("{} patterns simulated.", patterns.len());
        println!("Total #FEC Group = {}", partition.nb_groups());
        print!("{partition}");
    }
}
