//! The inference engine: independent CrossCat states run in parallel
mod builder;
mod error;

pub use builder::EngineBuilder;
pub use error::NewEngineError;

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use log::info;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::cc::error::StateError;
use crate::cc::state::State;
use crate::config::EngineUpdateConfig;
use crate::error::Error;
use crate::utils::logsumexp;

/// Runs independent CrossCat states over one table
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Engine {
    /// Vector of states
    pub states: Vec<State>,
    pub row_names: Vec<String>,
    pub col_names: Vec<String>,
    pub rng: Xoshiro256Plus,
}

impl Engine {
    /// Returns the number of states
    pub fn n_states(&self) -> usize {
        self.states.len()
    }

    pub fn n_rows(&self) -> usize {
        self.states.first().map_or(0, State::n_rows)
    }

    pub fn n_cols(&self) -> usize {
        self.states.first().map_or(0, State::n_cols)
    }

    /// Returns true if there are no states
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Re-seed the RNG. Each later `update` reseeds every state from it.
    pub fn seed_from_u64(&mut self, seed: u64) {
        self.rng = Xoshiro256Plus::seed_from_u64(seed);
    }

    /// Run each state for `config.n_iters` iterations, in parallel. Every
    /// state is first reseeded from the engine's RNG.
    pub fn update(
        &mut self,
        config: &EngineUpdateConfig,
    ) -> Result<(), StateError> {
        if self.is_empty() {
            return Ok(());
        }

        let state_config = config.state_config();
        info!(
            "updating {} states for {} iterations",
            self.n_states(),
            state_config.n_iters
        );

        let seeds: Vec<u64> =
            (0..self.n_states()).map(|_| self.rng.gen()).collect();

        self.states
            .par_iter_mut()
            .zip(seeds.into_par_iter())
            .enumerate()
            .map(|(state_ix, (state, seed))| -> Result<(), StateError> {
                state.seed_from_u64(seed);
                state.update(&state_config)?;
                info!(
                    "state {state_ix} finished: marginal_logp = {}, n_views = {}",
                    state.marginal_logp(),
                    state.n_views()
                );
                Ok(())
            })
            .collect::<Result<Vec<()>, StateError>>()?;

        Ok(())
    }

    /// The marginal log probability of each state
    pub fn marginal_logps(&self) -> Vec<f64> {
        self.states.iter().map(State::marginal_logp).collect()
    }

    /// Log predictive probability of a new row, averaged over states.
    /// Missing values are `NaN`.
    pub fn row_predictive_logp(&self, row: &[f64]) -> Result<f64, StateError> {
        let logps = self
            .states
            .iter()
            .map(|state| state.calc_row_predictive_logp(row))
            .collect::<Result<Vec<f64>, _>>()?;
        Ok(logsumexp(&logps) - (logps.len() as f64).ln())
    }

    /// A plain-text summary of each state's structure and score
    pub fn summary(&self) -> String {
        let mut out = format!(
            "{} states, {} rows, {} columns\n",
            self.n_states(),
            self.n_rows(),
            self.n_cols()
        );
        for (state_ix, state) in self.states.iter().enumerate() {
            let groups: Vec<Vec<&str>> = state
                .column_groups()
                .iter()
                .map(|cols| {
                    cols.iter()
                        .filter_map(|&ix| self.col_names.get(ix))
                        .map(String::as_str)
                        .collect()
                })
                .collect();
            out.push_str(&format!(
                "state {state_ix}: marginal_logp = {:.4}, column alpha = {:.4}, views = {groups:?}\n",
                state.marginal_logp(),
                state.column_crp_alpha(),
            ));
        }
        out
    }

    /// Save the Engine as YAML
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let file = File::create(path.as_ref())?;
        serde_yaml::to_writer(BufWriter::new(file), self)?;
        info!("saved engine to {:?}", path.as_ref());
        Ok(())
    }

    /// Load an Engine from YAML
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file = File::open(path.as_ref())?;
        let engine = serde_yaml::from_reader(BufReader::new(file))?;
        Ok(engine)
    }
}
