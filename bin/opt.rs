use std::path::PathBuf;

use clap::{Parser, Subcommand};
use crosscat::cc::transition::StateTransition;
use crosscat::config::EngineUpdateConfig;
use crosscat::Error;

#[derive(Parser, Debug)]
#[command(name = "crosscat", author, version, about)]
pub struct Opt {
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Run inference on a CSV table
    Run(RunArgs),
    /// Summarize a saved engine
    Summarize(SummarizeArgs),
}

#[derive(Parser, Debug)]
pub struct SummarizeArgs {
    /// The path to the saved engine
    #[arg(value_name = "ENGINE")]
    pub engine: PathBuf,
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to .csv data source. The first column holds the row names.
    #[arg(long = "csv")]
    pub csv_src: PathBuf,
    /// Comma-separated column types: `c` for continuous, `k<N>` for
    /// categorical with N levels. One per data column.
    #[arg(long = "types")]
    pub col_types: String,
    /// The number of states to create
    #[arg(long = "n-states", short = 's', default_value = "8")]
    pub n_states: usize,
    /// The number of iterations to run each state
    #[arg(
        long = "n-iters",
        short = 'n',
        required_unless_present = "run_config"
    )]
    pub n_iters: Option<usize>,
    /// The number of points in each hyperparameter grid
    #[arg(long = "n-grid", default_value = "31")]
    pub n_grid: usize,
    /// The PRNG seed
    #[arg(long = "seed")]
    pub seed: Option<u64>,
    /// Path to the engine run config yaml file.
    #[arg(long, conflicts_with_all = ["n_iters", "no_col_reassign"])]
    pub run_config: Option<PathBuf>,
    /// Initialize each state with one view. Make sure you do not run the
    /// column assignment transition if you want to keep the columns in one
    /// view.
    #[arg(short = 'F', long = "flat-columns")]
    pub flat_cols: bool,
    /// Do not run the column reassignment kernel
    #[arg(short = 'R', long = "no-column-reassign")]
    pub no_col_reassign: bool,
    /// Where to save the engine as YAML
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

fn filter_transitions(
    transitions: Vec<StateTransition>,
    no_col_reassign: bool,
) -> Vec<StateTransition> {
    transitions
        .into_iter()
        .filter(|t| {
            !(no_col_reassign && matches!(t, StateTransition::ColumnAssignment))
        })
        .collect()
}

impl RunArgs {
    pub fn engine_update_config(&self) -> Result<EngineUpdateConfig, Error> {
        match self.run_config {
            Some(ref path) => {
                let f = std::fs::File::open(path)?;
                let config: EngineUpdateConfig = serde_yaml::from_reader(f)?;
                Ok(config)
            }
            None => {
                let config = EngineUpdateConfig::with_default_transitions()
                    .n_iters(self.n_iters.unwrap_or(1));
                let transitions =
                    filter_transitions(config.transitions, self.no_col_reassign);
                Ok(EngineUpdateConfig {
                    transitions,
                    ..config
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_col_reassign_drops_column_assignment() {
        let transitions = filter_transitions(
            crosscat::cc::transition::DEFAULT_STATE_TRANSITIONS.to_vec(),
            true,
        );
        assert_eq!(transitions.len(), 4);
        assert!(!transitions.contains(&StateTransition::ColumnAssignment));
    }

    #[test]
    fn parse_run_args() {
        let opt = Opt::parse_from([
            "crosscat", "run", "--csv", "data.csv", "--types", "c,k3",
            "--n-iters", "10", "--seed", "3",
        ]);
        match opt.cmd {
            Cmd::Run(args) => {
                assert_eq!(args.n_iters, Some(10));
                assert_eq!(args.n_states, 8);
                assert_eq!(args.n_grid, 31);
                assert_eq!(args.seed, Some(3));
                let config = args.engine_update_config().unwrap();
                assert_eq!(config.n_iters, 10);
                assert_eq!(config.transitions.len(), 5);
            }
            Cmd::Summarize(_) => panic!("wrong subcommand"),
        }
    }

    #[test]
    fn n_iters_or_run_config_is_required() {
        let res = Opt::try_parse_from([
            "crosscat", "run", "--csv", "data.csv", "--types", "c",
        ]);
        assert!(res.is_err());
    }
}
