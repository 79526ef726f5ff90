use std::fs::File;
use std::path::PathBuf;

use clap::Parser;
use mirepoix::{
    encode_labels, flat_accuracy, flat_classification_report, load_corpus, sample, Model,
    Predictor, RuleTagger, Tagger, OUTSIDE,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "A program to evaluate the accuracy of Mirepoix.")]
struct Args {
    /// The model file to use when labeling text
    #[arg(long)]
    model: PathBuf,

    /// A recipe corpus (.csv, .jsonl or .ndjson)
    #[arg(long)]
    corpus: PathBuf,

    /// The fraction of the corpus to evaluate on
    #[arg(long, default_value = "1.0")]
    sample_frac: f64,

    /// The random seed of sampling
    #[arg(long, default_value = "42")]
    seed: u64,

    /// The number of decimal digits in the report
    #[arg(long, default_value = "4")]
    digits: usize,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    info!(path = ?args.model, "loading model");
    let mut f = zstd::Decoder::new(File::open(args.model)?)?;
    let model = Model::read(&mut f)?;
    let predictor = Predictor::new(model);

    info!(path = ?args.corpus, "loading corpus");
    let recipes = sample(load_corpus(&args.corpus)?, args.sample_frac, args.seed)?;

    info!(n_recipes = recipes.len(), "start labeling");
    let tagger = RuleTagger;
    let mut y_true = vec![];
    let mut y_pred = vec![];
    for recipe in &recipes {
        let sentence = tagger.tag(&recipe.document_text());
        let tag_set = recipe.tag_set();
        y_true.push(encode_labels(&sentence, &tag_set));
        y_pred.push(predictor.predict_sentence(&sentence, &tag_set));
    }

    let labels: Vec<&str> = predictor
        .model()
        .classes()
        .iter()
        .map(String::as_str)
        .filter(|&l| l != OUTSIDE)
        .collect();
    let report = flat_classification_report(&y_true, &y_pred, &labels)?.with_digits(args.digits);
    println!("Classification Report:\n{report}");
    println!(
        "Overall Accuracy: {:.*}",
        args.digits,
        flat_accuracy(&y_true, &y_pred)?
    );

    Ok(())
}
