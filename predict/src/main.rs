use std::fs::File;
use std::io::{prelude::*, stdin, stdout, BufWriter};
use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use mirepoix::{Model, Predictor, RawTags, RuleTagger, Sentence, TagSet, Tagger};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "A program to label ingredient mentions in text.")]
struct Args {
    /// The model file to use when labeling text
    #[arg(long)]
    model: PathBuf,

    /// Input lines are already tagged as `word/POS word/POS ...`
    #[arg(long)]
    tagged: bool,

    /// Comma separated tags of the recipe the input belongs to
    #[arg(long)]
    tags: Option<String>,
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
    let tag_set = args
        .tags
        .map_or_else(TagSet::new, |tags| TagSet::from(&RawTags::Joined(tags)));
    let tagger = RuleTagger;

    info!("start labeling");
    let mut out = BufWriter::new(stdout().lock());
    let mut n_tokens = 0;
    let start = Instant::now();
    for line in stdin().lock().lines() {
        let line = line?;
        let s = if args.tagged {
            if line.trim().is_empty() {
                writeln!(out)?;
                continue;
            }
            Sentence::from_tagged(&line)?
        } else {
            tagger.tag(&line)
        };
        let labels = predictor.predict_sentence(&s, &tag_set);
        n_tokens += labels.len();
        writeln!(out, "{}", s.to_labeled_string(&labels)?)?;
    }
    out.flush()?;
    let duration = start.elapsed();
    info!(
        elapsed_sec = duration.as_secs_f64(),
        tokens_per_sec = n_tokens as f64 / duration.as_secs_f64(),
        "finished labeling"
    );

    Ok(())
}
