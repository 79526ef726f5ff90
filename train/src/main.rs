use std::fs::File;
use std::path::PathBuf;

use clap::Parser;
use mirepoix::{
    fit, flat_accuracy, flat_classification_report, load_corpus, sample, train_test_split,
    LabeledSequence, Predictor, RuleTagger, Tagger, TrainParams, OUTSIDE,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "A program to train ingredient extraction models of Mirepoix.")]
struct Args {
    /// A recipe corpus (.csv, .jsonl or .ndjson)
    #[arg(long)]
    corpus: PathBuf,

    /// The file to write the trained model to
    #[arg(long)]
    model: PathBuf,

    /// The fraction of the corpus to use
    #[arg(long, default_value = "1.0")]
    sample_frac: f64,

    /// The fraction of the sampled corpus held out for evaluation
    #[arg(long, default_value = "0.2")]
    test_size: f64,

    /// The random seed of sampling and splitting
    #[arg(long, default_value = "42")]
    seed: u64,

    /// The coefficient of L1 regularization
    #[arg(long, default_value = "0.1")]
    c1: f64,

    /// The coefficient of L2 regularization
    #[arg(long, default_value = "0.1")]
    c2: f64,

    /// The maximum number of L-BFGS iterations
    #[arg(long, default_value = "100")]
    max_iterations: usize,

    /// Learn transitions only between label pairs that appear in the training data.
    #[arg(long)]
    observed_transitions_only: bool,

    /// The number of workers for zstd (0 means multithreaded will be disabled)
    #[arg(long, default_value = "0")]
    zstd_workers: u32,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    info!(path = ?args.corpus, "loading corpus");
    let recipes = load_corpus(&args.corpus)?;
    let recipes = sample(recipes, args.sample_frac, args.seed)?;
    info!(n_recipes = recipes.len(), "sampled corpus");

    info!("extracting features");
    let tagger = RuleTagger;
    let sequences: Vec<_> = recipes
        .iter()
        .map(|r| LabeledSequence::from_sentence(&tagger.tag(&r.document_text()), &r.tag_set()))
        .collect();
    let (train, test) = train_test_split(sequences, args.test_size, args.seed)?;
    info!(n_train = train.len(), n_test = test.len(), "split dataset");

    let params = TrainParams {
        c1: args.c1,
        c2: args.c2,
        max_iterations: args.max_iterations,
        all_possible_transitions: !args.observed_transitions_only,
        ..TrainParams::default()
    };
    let model = fit(&train, &params)?;

    let predictor = Predictor::new(model);
    let y_true: Vec<Vec<&str>> = test
        .iter()
        .map(|seq| seq.labels.iter().map(String::as_str).collect())
        .collect();
    let y_pred: Vec<Vec<&str>> = test
        .iter()
        .map(|seq| predictor.predict(&seq.features))
        .collect();
    let labels: Vec<&str> = predictor
        .model()
        .classes()
        .iter()
        .map(String::as_str)
        .filter(|&l| l != OUTSIDE)
        .collect();
    let report = flat_classification_report(&y_true, &y_pred, &labels)?.with_digits(4);
    println!("Classification Report:\n{report}");
    println!("Overall Accuracy: {:.4}", flat_accuracy(&y_true, &y_pred)?);

    info!(path = ?args.model, "saving model");
    let mut f = zstd::Encoder::new(File::create(args.model)?, 19)?;
    f.multithread(args.zstd_workers)?;
    predictor.model().write(&mut f)?;
    f.finish()?;

    Ok(())
}
