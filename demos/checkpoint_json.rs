use rand::SeedableRng;
use rand::rngs::StdRng;

use dlnet::{
    Hyperparams, InMemoryDataset, InitMode, JsonCheckpointDir, LabeledSet, Network,
    StandardInitializer, Topology, TrainConfig, load_params,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Two noisy clusters around (0.25, 0.25) and (0.75, 0.75).
    let mut rng = StdRng::seed_from_u64(0);
    let mut rows = Vec::new();
    let mut labels = Vec::new();
    for i in 0..200 {
        let label = i % 2;
        let centre = if label == 0 { 0.25 } else { 0.75 };
        let jitter = |rng: &mut StdRng| rand::Rng::gen_range(rng, -0.2_f32..0.2);
        rows.push(vec![centre + jitter(&mut rng), centre + jitter(&mut rng)]);
        labels.push(label);
    }
    let all = LabeledSet::from_rows(&rows, &labels)?;
    let train = LabeledSet::from_flat(
        (0..150).flat_map(|i| all.input(i).to_vec()).collect(),
        (0..150).map(|i| all.label(i)).collect(),
        2,
    )?;
    let test = LabeledSet::from_flat(
        (150..200).flat_map(|i| all.input(i).to_vec()).collect(),
        (150..200).map(|i| all.label(i)).collect(),
        2,
    )?;
    let mut data = InMemoryDataset::new(train, test)?;

    let dir = std::env::temp_dir().join("dlnet-checkpoints");
    let mut sink = JsonCheckpointDir::new(&dir);

    let hyper = Hyperparams {
        learning_rate: 1.0,
        mini_batch: 10,
        ..Hyperparams::default()
    };
    let mut init = StandardInitializer::new(InitMode::Random, 1);
    let mut net = Network::with_initializer(Topology::new(&[2, 3, 2])?, &hyper, &mut init)?;

    let report = net.train(
        &mut data,
        &TrainConfig {
            epochs: 15,
            shuffle: true,
            save_best: Some(25),
        },
        &mut rng,
        &mut sink,
    )?;

    let Some(best) = report.best_successes else {
        return Ok(());
    };
    let path = sink.path_for(net.topology(), best);
    let restored = load_params(&path)?;
    net.set_params(restored)?;

    let eval = net.accuracy_on(&data)?;
    println!(
        "restored {} -> {}/{} correct",
        path.display(),
        eval.successes,
        eval.total
    );

    Ok(())
}
