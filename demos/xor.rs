use rand::SeedableRng;
use rand::rngs::StdRng;

use dlnet::{
    Hyperparams, InMemoryDataset, InitMode, LabeledSet, Network, NoCheckpoints,
    StandardInitializer, Topology, TrainConfig,
};

fn main() -> dlnet::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    // Classic XOR; the test split is the training split.
    let xs = vec![
        vec![0.0, 0.0],
        vec![0.0, 1.0],
        vec![1.0, 0.0],
        vec![1.0, 1.0],
    ];
    let ys = vec![0, 1, 1, 0];
    let set = LabeledSet::from_rows(&xs, &ys)?;
    let mut data = InMemoryDataset::new(set.clone(), set)?;

    // 2 -> 4 -> 2, one output unit per class.
    let hyper = Hyperparams {
        learning_rate: 3.0,
        mini_batch: 4,
        ..Hyperparams::default()
    };
    let mut init = StandardInitializer::new(InitMode::Random, 0);
    let mut net = Network::with_initializer(Topology::new(&[2, 4, 2])?, &hyper, &mut init)?;

    let report = net.train(
        &mut data,
        &TrainConfig {
            epochs: 2_000,
            shuffle: true,
            save_best: None,
        },
        &mut StdRng::seed_from_u64(0),
        &mut NoCheckpoints,
    )?;

    if let Some(last) = report.last() {
        println!(
            "epochs={} accuracy={:.2} cost={:.4}",
            report.epochs.len(),
            last.eval.accuracy(),
            net.training_cost(&data)?
        );
    }
    for x in xs {
        println!("x={x:?} class={} y={:?}", net.predict(&x)?, net.output(&x)?);
    }

    Ok(())
}
