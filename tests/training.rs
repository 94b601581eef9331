use rand::SeedableRng;
use rand::rngs::StdRng;

use dlnet::schedule::MIN_LEARNING_RATE;
use dlnet::{
    AdaptiveRate, CheckpointSink, DatasetProvider, Hyperparams, InMemoryDataset, InitMode,
    LabeledSet, Network, NoCheckpoints, ParameterSet, Regularization, StandardInitializer,
    Topology, TrainConfig,
};

/// Points of an `n x n` grid over the unit square, labelled by the side of
/// `x + y = 1` they fall on. Points within 0.15 of the line are dropped.
fn grid(n: usize, offset: f32) -> LabeledSet {
    let mut rows = Vec::new();
    let mut labels = Vec::new();
    for i in 0..n {
        for j in 0..n {
            let x = (i as f32 + offset) / n as f32;
            let y = (j as f32 + offset) / n as f32;
            let s = x + y - 1.0;
            if s.abs() < 0.15 {
                continue;
            }
            rows.push(vec![x, y]);
            labels.push(usize::from(s > 0.0));
        }
    }
    LabeledSet::from_rows(&rows, &labels).unwrap()
}

fn separable_data() -> InMemoryDataset {
    InMemoryDataset::new(grid(10, 0.0), grid(9, 0.5)).unwrap()
}

fn network(hyper: &Hyperparams, seed: u64) -> Network {
    let topology = Topology::new(&[2, 4, 2]).unwrap();
    let mut init = StandardInitializer::new(InitMode::Random, seed);
    Network::with_initializer(topology, hyper, &mut init).unwrap()
}

fn hyper() -> Hyperparams {
    Hyperparams {
        learning_rate: 1.0,
        mini_batch: 4,
        ..Hyperparams::default()
    }
}

fn cfg(epochs: usize) -> TrainConfig {
    TrainConfig {
        epochs,
        shuffle: true,
        save_best: None,
    }
}

#[test]
fn converges_on_separable_data() {
    for seed in [0, 1, 2] {
        let mut data = separable_data();
        let mut net = network(&hyper(), seed);
        let before = net.training_cost(&data).unwrap();

        let report = net
            .train(
                &mut data,
                &cfg(100),
                &mut StdRng::seed_from_u64(seed),
                &mut NoCheckpoints,
            )
            .unwrap();

        let last = report.last().unwrap().eval;
        assert!(last.accuracy() >= 0.95, "seed {seed}: {last:?}");
        assert!(net.training_cost(&data).unwrap() < before);
        assert!(net.params().is_finite());
    }
}

#[test]
fn seeded_runs_are_reproducible() {
    let run = || {
        let mut data = separable_data();
        let mut net = network(&hyper(), 11);
        net.train(
            &mut data,
            &cfg(5),
            &mut StdRng::seed_from_u64(5),
            &mut NoCheckpoints,
        )
        .unwrap();
        net.params().clone()
    };
    assert_eq!(run(), run());
}

#[test]
fn l2_keeps_weights_smaller() {
    let l2 = Hyperparams {
        regularization: Regularization::L2 { lambda: 5.0 },
        ..hyper()
    };

    let mut plain = network(&hyper(), 3);
    let mut decayed = network(&l2, 3);
    assert_eq!(plain.params(), decayed.params());

    plain
        .train(
            &mut separable_data(),
            &cfg(30),
            &mut StdRng::seed_from_u64(3),
            &mut NoCheckpoints,
        )
        .unwrap();
    decayed
        .train(
            &mut separable_data(),
            &cfg(30),
            &mut StdRng::seed_from_u64(3),
            &mut NoCheckpoints,
        )
        .unwrap();

    assert!(decayed.params().weight_norm_sq() < plain.params().weight_norm_sq());
}

#[test]
fn adaptive_rate_drops_once_test_error_is_low() {
    let adaptive = Hyperparams {
        adaptive_rate: AdaptiveRate::Linear,
        ..hyper()
    };
    let mut net = network(&adaptive, 0);
    let report = net
        .train(
            &mut separable_data(),
            &cfg(60),
            &mut StdRng::seed_from_u64(0),
            &mut NoCheckpoints,
        )
        .unwrap();

    assert_eq!(report.epochs[0].learning_rate, 1.0);
    assert!(net.learning_rate() < 1.0);
    assert!(net.learning_rate() >= MIN_LEARNING_RATE);
    assert!(report.last().unwrap().eval.accuracy() >= 0.95);
}

struct FailingSink {
    calls: usize,
}

impl CheckpointSink for FailingSink {
    fn save(&mut self, _params: &ParameterSet, _topology: &Topology, _score: usize) -> bool {
        self.calls += 1;
        false
    }
}

#[test]
fn failing_checkpoint_sink_does_not_stop_training() {
    let mut net = network(&hyper(), 4);
    let mut sink = FailingSink { calls: 0 };
    let cfg = TrainConfig {
        epochs: 4,
        shuffle: false,
        save_best: Some(0),
    };

    let report = net
        .train(
            &mut separable_data(),
            &cfg,
            &mut StdRng::seed_from_u64(0),
            &mut sink,
        )
        .unwrap();

    assert_eq!(report.epochs.len(), 4);
    assert!(sink.calls >= 1);
    assert!(report.epochs.iter().all(|e| !e.eval.checkpoint_saved));
    assert!(report.best_successes.is_some());
}

#[test]
fn shuffling_keeps_every_sample_with_its_label() {
    let mut data = separable_data();
    let mut net = network(&hyper(), 6);
    net.train(
        &mut data,
        &cfg(3),
        &mut StdRng::seed_from_u64(6),
        &mut NoCheckpoints,
    )
    .unwrap();

    let original = grid(10, 0.0);
    assert_ne!(data.train(), &original);
    for idx in 0..data.training_len() {
        let ex = data.training_example(idx);
        let expected = usize::from(ex.input[0] + ex.input[1] > 1.0);
        assert_eq!(ex.label, expected);
    }
}

#[cfg(feature = "serde")]
#[test]
fn json_checkpoints_reload_with_recorded_score() {
    let dir = tempfile::tempdir().unwrap();
    let mut sink = dlnet::JsonCheckpointDir::new(dir.path());
    let mut net = network(&hyper(), 0);
    let cfg = TrainConfig {
        epochs: 20,
        shuffle: true,
        save_best: Some(40),
    };

    let report = net
        .train(
            &mut separable_data(),
            &cfg,
            &mut StdRng::seed_from_u64(0),
            &mut sink,
        )
        .unwrap();

    let best = report.best_successes.unwrap();
    let path = sink.path_for(net.topology(), best);
    let params = dlnet::load_params(&path).unwrap();
    params.check_topology(net.topology()).unwrap();
    assert!(report.epochs.iter().any(|e| e.eval.checkpoint_saved));
}
