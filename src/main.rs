use std::env;

use anyhow::{bail, Context};
use log::{info, warn};
use rand::{rngs::StdRng, SeedableRng};

use sigmoid_net::{
    data::{Gate, LabeledImages},
    CooperativeLoop, DataProvider, Network, Trainer, TrainingConfig,
};

const DIGIT_CLASSES: usize = 10;
const DIGIT_SIZES: [usize; 4] = [784, 16, 16, 10];

fn load_config(path: Option<&String>) -> anyhow::Result<TrainingConfig> {
    match path {
        Some(path) => TrainingConfig::from_path(path).with_context(|| format!("reading {path}")),
        None => Ok(TrainingConfig::default()),
    }
}

fn make_rng(config: &TrainingConfig) -> StdRng {
    match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

async fn train_gate(gate: Gate, config: TrainingConfig) -> anyhow::Result<()> {
    let sizes = config
        .sizes
        .clone()
        .unwrap_or_else(|| vec![gate.input_size(), 2, gate.output_size()]);

    let mut rng = make_rng(&config);
    let mut network = Network::with_rng(&sizes, config.learning_rate, &mut rng)?;
    let trainer = Trainer::new(CooperativeLoop::new(config.yield_interval()));

    let mut batch_size = config.batch_size;
    if batch_size > gate.len() {
        warn!(
            "{} has only {} rows, using them as the batch size",
            gate.name(),
            gate.len()
        );
        batch_size = gate.len();
    }

    info!("training {} on {sizes:?}", gate.name());
    trainer
        .run_batches(config.batches, batch_size, &gate, &mut network, &mut rng)
        .await?;

    let examples = gate.examples();
    let mse = Trainer::mean_squared_error(&examples, &network)?;
    println!("{} (mean squared error {mse:.5})", gate.name());

    for ex in examples {
        let trace = sigmoid_net::feed(&ex.inputs, &network)?;
        println!(
            "{:?} -> {:.3} (expected {:?})",
            ex.inputs,
            trace.output(),
            ex.expected_outputs
        );
    }

    Ok(())
}

fn load_images(name: &'static str, path: &str) -> anyhow::Result<LabeledImages> {
    let mut images = LabeledImages::new(name, DIGIT_CLASSES);
    images
        .load_path(path)
        .with_context(|| format!("loading {path}"))?;
    Ok(images)
}

async fn train_digits(train: &str, test: &str, config: TrainingConfig) -> anyhow::Result<f32> {
    let sizes = config.sizes.clone().unwrap_or_else(|| DIGIT_SIZES.to_vec());

    let images = load_images("digits", train)?;
    let test_images = load_images("digits test", test)?;

    let mut rng = make_rng(&config);
    let mut network = Network::with_rng(&sizes, config.learning_rate, &mut rng)?;
    let trainer = Trainer::new(CooperativeLoop::new(config.yield_interval()));

    info!("training on {} images with {sizes:?}", images.len());
    let report = trainer
        .run_batches(
            config.batches,
            config.batch_size,
            &images,
            &mut network,
            &mut rng,
        )
        .await?;

    let test_set = test_images.batch(config.eval_size.min(test_images.len()), &mut rng)?;
    let accuracy = trainer.evaluate(&test_set, &network).await?;

    println!(
        "accuracy {:.2}% on {} held-out images after {} batches ({:?})",
        accuracy * 100.,
        test_set.len(),
        report.batches,
        report.elapsed
    );

    Ok(accuracy)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();

    match args.first().map(String::as_str) {
        Some("digits") => {
            let (Some(train), Some(test)) = (args.get(1), args.get(2)) else {
                bail!("usage: sigmoid-net digits <train.json> <test.json> [config.json]");
            };
            let config = load_config(args.get(3))?;
            train_digits(train, test, config).await.map(|_| ())
        }
        name => {
            let name = name.unwrap_or("xor");
            let Some(gate) = Gate::by_name(name) else {
                bail!("unknown gate {name}, try one of: {}", gate_names());
            };
            let config = load_config(args.get(1))?;
            train_gate(gate, config).await
        }
    }
}

fn gate_names() -> String {
    Gate::ALL
        .iter()
        .map(|g| g.name())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigmoid_net::data::IMAGE_PIXELS;
    use std::{env, fs, path::PathBuf};

    fn write_corpus(name: &str, label: usize) -> PathBuf {
        let pixels: Vec<String> = (0..IMAGE_PIXELS).map(|i| (i % 2 * 255).to_string()).collect();
        let image = format!(r#"{{"label": {label}, "data": [{}]}}"#, pixels.join(","));
        let path = env::temp_dir().join(format!("sigmoid-net-{}-{name}.json", std::process::id()));

        fs::write(&path, format!("[{}]", vec![image; 4].join(","))).unwrap();
        path
    }

    #[tokio::test]
    async fn digits_accuracy_comes_from_the_test_corpus() {
        // same pixels, different labels: a network fit to the training corpus misses
        // every test image
        let train = write_corpus("train", 3);
        let test = write_corpus("test", 5);
        let config = TrainingConfig {
            batches: 300,
            batch_size: 4,
            eval_size: 4,
            seed: Some(1),
            ..Default::default()
        };

        let accuracy = train_digits(
            train.to_str().unwrap(),
            test.to_str().unwrap(),
            config,
        )
        .await;

        fs::remove_file(&train).unwrap();
        fs::remove_file(&test).unwrap();
        assert_eq!(accuracy.unwrap(), 0.);
    }

    #[tokio::test]
    async fn digits_need_a_readable_test_corpus() {
        let train = write_corpus("train-only", 1);

        let result = train_digits(
            train.to_str().unwrap(),
            "/nonexistent/sigmoid-net-test.json",
            TrainingConfig::default(),
        )
        .await;

        fs::remove_file(&train).unwrap();
        assert!(result.is_err());
    }
}
