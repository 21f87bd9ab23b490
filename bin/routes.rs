use crosscat::data::{parse_col_types, read_csv_path};
use crosscat::{Engine, EngineBuilder, Error};
use log::info;

use crate::opt;

fn new_engine(cmd: &opt::RunArgs) -> Result<Engine, Error> {
    let table = read_csv_path(&cmd.csv_src)?;
    let col_types = parse_col_types(&cmd.col_types)?;
    info!(
        "read {} rows and {} columns from {:?}",
        table.n_rows(),
        table.n_cols(),
        cmd.csv_src
    );

    let mut builder = EngineBuilder::new(table, col_types)
        .with_nstates(cmd.n_states)
        .n_grid(cmd.n_grid);
    if let Some(seed) = cmd.seed {
        builder = builder.seed_from_u64(seed);
    }
    if cmd.flat_cols {
        builder = builder.flat_cols();
    }
    Ok(builder.build()?)
}

fn run_engine(cmd: &opt::RunArgs) -> Result<Engine, Error> {
    let config = cmd.engine_update_config()?;
    let mut engine = new_engine(cmd)?;
    engine.update(&config)?;
    if let Some(ref path) = cmd.output {
        engine.save(path)?;
    }
    Ok(engine)
}

pub fn run(cmd: opt::RunArgs) -> i32 {
    match run_engine(&cmd) {
        Ok(engine) => {
            print!("{}", engine.summary());
            0
        }
        Err(err) => {
            eprintln!("Error: {err}");
            1
        }
    }
}

pub fn summarize_engine(cmd: opt::SummarizeArgs) -> i32 {
    match Engine::load(&cmd.engine) {
        Ok(engine) => {
            print!("{}", engine.summary());
            0
        }
        Err(err) => {
            eprintln!("Error: {err}");
            1
        }
    }
}
