use criterion::BatchSize;
use criterion::Criterion;
use criterion::{black_box, criterion_group, criterion_main};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;

use crosscat::cc::feature::ColType;
use crosscat::data::DataTable;
use crosscat::{EngineBuilder, EngineUpdateConfig};

const NROWS: usize = 100;
const NCOLS: usize = 10;

fn table() -> (DataTable, Vec<ColType>) {
    let mut rng = Xoshiro256Plus::seed_from_u64(1337);
    let columns = (0..NCOLS)
        .map(|_| (0..NROWS).map(|_| rng.gen::<f64>()).collect())
        .collect();
    let table = DataTable {
        row_names: (0..NROWS).map(|ix| ix.to_string()).collect(),
        col_names: (0..NCOLS).map(|ix| format!("col_{ix}")).collect(),
        columns,
    };
    (table, vec![ColType::continuous(); NCOLS])
}

fn bench_engine_update(c: &mut Criterion) {
    let (table, col_types) = table();
    c.bench_function("engine update 4 states", |b| {
        let engine = EngineBuilder::new(table.clone(), col_types.clone())
            .with_nstates(4)
            .seed_from_u64(1)
            .build()
            .unwrap();
        let config = EngineUpdateConfig::default().n_iters(1);
        b.iter_batched(
            || engine.clone(),
            |mut engine| black_box(engine.update(&config)),
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(engine_benches, bench_engine_update);
criterion_main!(engine_benches);
