use approx::*;
use crosscat_cc::config::StateUpdateConfig;
use crosscat_cc::feature::{ColModel, ColType, Feature, Hyper};
use crosscat_cc::state::{Builder, State};
use crosscat_cc::transition::StateTransition;
use crosscat_stats::{CategoricalHyper, Crp, PriorProcess};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;

fn gen_mixed_state<R: Rng>(
    n_rows: usize,
    n_cols: usize,
    seed: u64,
    rng: &mut R,
) -> State {
    let mut builder = Builder::new();
    for col_ix in 0..n_cols {
        builder = if col_ix % 3 == 2 {
            let data = (0..n_rows)
                .map(|_| rng.gen_range(0..4) as f64)
                .collect();
            builder.column(data, ColType::categorical(4))
        } else {
            let shift = if col_ix % 2 == 0 { 0.0 } else { 5.0 };
            let data = (0..n_rows)
                .map(|row_ix| {
                    if row_ix % 7 == 3 {
                        f64::NAN
                    } else {
                        shift + rng.gen::<f64>()
                    }
                })
                .collect();
            builder.column(data, ColType::continuous())
        };
    }
    builder.seed_from_u64(seed).build().unwrap()
}

fn assert_consistent(state: &State) {
    let from_scratch = state.calc_marginal_logp_from_scratch();
    assert_relative_eq!(
        state.marginal_logp(),
        from_scratch,
        max_relative = 1E-9,
        epsilon = 1E-9
    );
    assert_eq!(state.view_counts().iter().sum::<usize>(), state.n_cols());
    assert!(state.view_counts().iter().all(|&ct| ct > 0));
}

/// Four rows, continuous columns 0 and 1 together in one view, categorical
/// column 2 alone in a second view
fn four_by_three() -> State {
    Builder::new()
        .column(vec![0.5, -0.2, 1.1, 0.9], ColType::continuous())
        .column(vec![1.5, 1.7, -0.3, 0.1], ColType::continuous())
        .column(vec![0.0, 1.0, 1.0, 2.0], ColType::categorical(3))
        .column_partition(vec![0, 0, 1])
        .row_partitions(vec![vec![0, 0, 1, 1], vec![0, 0, 0, 0]])
        .row_alphas(vec![1.0, 1.0])
        .column_crp_alpha(1.0)
        .seed_from_u64(1337)
        .build()
        .unwrap()
}

#[test]
fn smoke() {
    let mut rng = Xoshiro256Plus::seed_from_u64(0xABCD);
    let mut state = gen_mixed_state(20, 6, 1, &mut rng);

    assert_eq!(state.n_rows(), 20);
    assert_eq!(state.n_cols(), 6);

    let config = StateUpdateConfig {
        n_iters: 50,
        ..Default::default()
    };
    state.update(&config).unwrap();
    assert_eq!(state.diagnostics.marginal_logp.len(), 50);
    assert_consistent(&state);
}

#[test]
fn scores_track_from_scratch_through_every_transition() {
    let mut rng = Xoshiro256Plus::seed_from_u64(0x1234);
    let mut state = gen_mixed_state(15, 5, 2, &mut rng);
    let transitions = [
        StateTransition::ColumnAssignment,
        StateTransition::RowAssignment,
        StateTransition::ColumnCrpAlpha,
        StateTransition::RowCrpAlphas,
        StateTransition::ColumnHypers,
    ];

    for _ in 0..10 {
        for transition in transitions.iter() {
            let before = state.marginal_logp();
            let delta = state.step(std::slice::from_ref(transition)).unwrap();
            assert_relative_eq!(
                state.marginal_logp() - before,
                delta,
                epsilon = 1E-8
            );
            assert_consistent(&state);
        }
    }
}

#[test]
fn remove_insert_restores_suffstats() {
    let mut rng = Xoshiro256Plus::seed_from_u64(0x5678);
    let mut state = gen_mixed_state(12, 4, 3, &mut rng);
    state
        .update(&StateUpdateConfig {
            n_iters: 5,
            ..Default::default()
        })
        .unwrap();

    // pick a column that shares its view so the view survives removal
    let shared = (0..state.n_cols()).find(|&ix| {
        let view_id = state.view_of(ix).unwrap();
        state.view(view_id).unwrap().n_cols() > 1
    });
    let col_ix = match shared {
        Some(col_ix) => col_ix,
        None => return,
    };

    // one cycle rebuilds the column's statistics from its data, after which
    // further cycles must reproduce them exactly
    let removed = state.remove_feature(col_ix).unwrap();
    state.insert_feature(removed.ftr, removed.view).unwrap();

    let view_id = state.view_of(col_ix).unwrap();
    let view_ix = state.views().position(|(id, _)| id == view_id).unwrap();
    let suffstats_before = state.column_component_suffstats(view_ix).unwrap();
    let score_before = state.marginal_logp();

    let removed = state.remove_feature(col_ix).unwrap();
    assert!(removed.dropped_view.is_none());
    let inserted = state.insert_feature(removed.ftr, removed.view).unwrap();

    assert_relative_eq!(removed.delta + inserted, 0.0, epsilon = 1E-10);
    assert_relative_eq!(state.marginal_logp(), score_before, epsilon = 1E-10);
    assert_eq!(
        state.column_component_suffstats(view_ix).unwrap(),
        suffstats_before
    );
}

#[test]
fn uninformative_column_follows_crp_weights() {
    let mut state = four_by_three();
    state.remove_feature(2).unwrap();

    // An all-missing column has zero marginal likelihood everywhere, so its
    // candidate weights are the column CRP weights alone
    let ftr = ColModel::new(
        2,
        vec![f64::NAN; 4],
        Hyper::Categorical(CategoricalHyper::uniform(3)),
    );
    let singleton = PriorProcess::flat(Crp::new(1.0), 4);
    let logps = state
        .calc_feature_view_predictive_logps(&ftr, &singleton)
        .unwrap();

    assert_eq!(logps.len(), 2);
    assert_relative_eq!(logps[0], (2.0_f64 / 3.0).ln(), epsilon = 1E-12);
    assert_relative_eq!(logps[1], (1.0_f64 / 3.0).ln(), epsilon = 1E-12);
    let total: f64 = logps.iter().map(|logp| logp.exp()).sum();
    assert_relative_eq!(total, 1.0, epsilon = 1E-12);
}

#[test]
fn four_by_three_candidate_weights() {
    let mut state = four_by_three();
    assert_eq!(state.n_views(), 2);
    assert_consistent(&state);

    let removed = state.remove_feature(2).unwrap();
    assert!(removed.dropped_view.is_some());
    assert_eq!(state.n_views(), 1);
    assert_eq!(state.column_groups(), vec![vec![0, 1]]);
    assert_consistent(&state);

    let view_id = state.get_view(0).unwrap();
    let (crp, data) = state
        .calc_feature_view_predictive_logp(&removed.ftr, view_id)
        .unwrap();
    // two other columns, both in view 0
    assert_relative_eq!(crp, (2.0_f64 / 3.0).ln(), epsilon = 1E-12);
    // rows {0, 1} hold categories {0, 1}, rows {2, 3} hold {1, 2}; each
    // cluster has marginal 2! / 4! = 1/12 under a uniform Dirichlet(1, 1, 1)
    assert_relative_eq!(data, (1.0_f64 / 144.0).ln(), epsilon = 1E-12);

    let singleton = PriorProcess::flat(Crp::new(1.0), 4);
    let logps = state
        .calc_feature_view_predictive_logps(&removed.ftr, &singleton)
        .unwrap();
    assert_eq!(logps.len(), 2);
    assert_relative_eq!(logps[0], (1.0_f64 / 216.0).ln(), epsilon = 1E-12);
    // one cluster with counts [1, 2, 1]: 2! * 1 * 2 * 1 / 6! = 1/180
    assert_relative_eq!(logps[1], (1.0_f64 / 540.0).ln(), epsilon = 1E-12);

    // reinserting through the sampler lands in one of the two candidates
    let delta = state.sample_insert_feature(removed.ftr, singleton).unwrap();
    assert!(state.n_views() == 1 || state.n_views() == 2);
    assert!(delta.is_finite());
    assert_consistent(&state);
}

#[test]
fn empty_view_cleanup_removes_exactly_one_view() {
    let mut state = four_by_three();
    let n_views = state.n_views();
    let removed = state.remove_feature(2).unwrap();
    assert_eq!(state.n_views(), n_views - 1);
    assert!(removed.dropped_view.unwrap().is_empty());
}

#[test]
fn column_crp_alpha_transition_is_reproducible() {
    let mut rng_a = Xoshiro256Plus::seed_from_u64(99);
    let mut rng_b = Xoshiro256Plus::seed_from_u64(99);
    let mut a = gen_mixed_state(10, 4, 7, &mut rng_a);
    let mut b = gen_mixed_state(10, 4, 7, &mut rng_b);

    let deltas_a: Vec<f64> =
        (0..10).map(|_| a.transition_column_crp_alpha()).collect();
    let deltas_b: Vec<f64> =
        (0..10).map(|_| b.transition_column_crp_alpha()).collect();
    assert_eq!(deltas_a, deltas_b);
    assert_eq!(a.column_crp_alpha(), b.column_crp_alpha());
}

#[test]
fn full_updates_are_reproducible() {
    let mut rng = Xoshiro256Plus::seed_from_u64(3);
    let mut a = gen_mixed_state(10, 5, 11, &mut rng);
    let mut b = a.clone();
    let config = StateUpdateConfig {
        n_iters: 10,
        ..Default::default()
    };
    a.update(&config).unwrap();
    b.update(&config).unwrap();
    assert_eq!(a.column_groups(), b.column_groups());
    assert_eq!(a.x_d(), b.x_d());
    assert_eq!(a.diagnostics, b.diagnostics);
}

#[test]
fn transition_feature_moves_only_the_target_column() {
    let mut state = four_by_three();
    for _ in 0..20 {
        state.transition_feature(2).unwrap();
        let view_0 = state.view_of(0).unwrap();
        assert_eq!(state.view_of(1).unwrap(), view_0);
        assert_consistent(&state);
    }
}

#[test]
fn single_row_state() {
    let mut state = Builder::new()
        .column(vec![1.0], ColType::continuous())
        .column(vec![0.0], ColType::categorical(2))
        .seed_from_u64(8)
        .build()
        .unwrap();
    state
        .update(&StateUpdateConfig {
            n_iters: 5,
            ..Default::default()
        })
        .unwrap();
    assert_eq!(state.x_d().iter().flatten().count(), state.n_views());
    assert_consistent(&state);
}

#[test]
fn row_predictive_of_all_missing_row_is_zero() {
    let state = four_by_three();
    let logp = state.calc_row_predictive_logp(&[f64::NAN; 3]).unwrap();
    assert_relative_eq!(logp, 0.0, epsilon = 1E-12);
}

#[test]
fn column_model_uses_current_hypers() {
    let state = four_by_three();
    let ftr = state.column_model(2, vec![2.0, 2.0, 0.0, 1.0]).unwrap();
    assert_eq!(ftr.hyper(), state.feature(2).unwrap().hyper());
    assert_eq!(ftr.id(), 2);
    assert!(state.column_model(2, vec![3.0; 4]).is_err());
    assert!(state.column_model(5, vec![0.0; 4]).is_err());
}
