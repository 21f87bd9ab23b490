use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;

use super::error::NewEngineError;
use super::Engine;
use crate::cc::feature::ColType;
use crate::cc::state::{Builder, InitPolicy, State};
use crate::data::DataTable;

const DEFAULT_NSTATES: usize = 8;

/// Builds `Engine`s
#[derive(Clone, Debug)]
pub struct EngineBuilder {
    table: DataTable,
    col_types: Vec<ColType>,
    n_states: Option<usize>,
    n_grid: Option<usize>,
    seed: Option<u64>,
    flat_cols: bool,
    hypers_from_prior: bool,
}

impl EngineBuilder {
    #[must_use]
    pub fn new(table: DataTable, col_types: Vec<ColType>) -> Self {
        Self {
            table,
            col_types,
            n_states: None,
            n_grid: None,
            seed: None,
            flat_cols: false,
            hypers_from_prior: false,
        }
    }

    /// With a certain number of states
    #[must_use]
    pub fn with_nstates(mut self, n_states: usize) -> Self {
        self.n_states = Some(n_states);
        self
    }

    /// With a certain number of points in each hyperparameter grid
    #[must_use]
    pub fn n_grid(mut self, n_grid: usize) -> Self {
        self.n_grid = Some(n_grid);
        self
    }

    /// With a given random number generator
    #[must_use]
    pub fn seed_from_u64(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// With a flat column structure -- one view in each state
    #[must_use]
    pub fn flat_cols(mut self) -> Self {
        self.flat_cols = true;
        self
    }

    /// Draw each state's column hypers from the grids
    #[must_use]
    pub fn hypers_from_prior(mut self) -> Self {
        self.hypers_from_prior = true;
        self
    }

    /// Build the `Engine`; consume the `Builder`.
    pub fn build(self) -> Result<Engine, NewEngineError> {
        let n_states = self.n_states.unwrap_or(DEFAULT_NSTATES);
        if n_states == 0 {
            return Err(NewEngineError::ZeroStatesRequested);
        }

        let mut rng = match self.seed {
            Some(seed) => Xoshiro256Plus::seed_from_u64(seed),
            None => Xoshiro256Plus::from_entropy(),
        };

        let col_init = if self.flat_cols {
            InitPolicy::Together
        } else {
            InitPolicy::FromThePrior
        };

        let states: Vec<State> = (0..n_states)
            .map(|_| {
                let mut builder = Builder::new()
                    .columns(self.table.columns.clone(), self.col_types.clone())
                    .column_init(col_init)
                    .seed_from_rng(&mut rng);
                if let Some(n_grid) = self.n_grid {
                    builder = builder.n_grid(n_grid);
                }
                if self.hypers_from_prior {
                    builder = builder.hypers_from_prior();
                }
                builder.build()
            })
            .collect::<Result<_, _>>()?;

        Ok(Engine {
            states,
            row_names: self.table.row_names,
            col_names: self.table.col_names,
            rng,
        })
    }
}
