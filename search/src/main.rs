use std::fs::File;
use std::io::{prelude::*, stdin, stdout};
use std::path::PathBuf;

use clap::Parser;
use mirepoix::{load_corpus, Model, Query, SearchContext, SearchResult, DEFAULT_LIMIT};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "A program to find recipes by ingredients.")]
struct Args {
    /// The model file to use when labeling queries
    #[arg(long)]
    model: PathBuf,

    /// A recipe corpus (.csv, .jsonl or .ndjson)
    #[arg(long)]
    corpus: PathBuf,

    /// The maximum number of recipes returned per query
    #[arg(long, default_value_t = DEFAULT_LIMIT)]
    limit: usize,

    /// Shuffle matching recipes before applying the limit
    #[arg(long)]
    randomize: bool,
}

#[derive(Serialize)]
struct Row<'a> {
    query: &'a str,
    name: String,
    ingredients: String,
    steps: String,
}

impl<'a> Row<'a> {
    fn new(query: &'a str, result: SearchResult) -> Self {
        Self {
            query,
            name: result.name,
            ingredients: result.ingredients,
            steps: result.steps,
        }
    }
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
    let mut f = zstd::Decoder::new(File::open(&args.model)?)?;
    let model = Model::read(&mut f)?;
    info!(path = ?args.corpus, "loading corpus");
    let corpus = load_corpus(&args.corpus)?;
    let context = SearchContext::new(model, corpus);
    info!(n_recipes = context.corpus().len(), "ready");

    // One `ingredient, ingredient, ...` query per line.
    let mut wtr = csv::Writer::from_writer(stdout().lock());
    for line in stdin().lock().lines() {
        let query = Query::new(line?, args.limit, args.randomize);
        let results = context.search(&query);
        debug!(query = %query.text, n_results = results.len(), "answered query");
        for result in results {
            wtr.serialize(Row::new(&query.text, result))?;
        }
        wtr.flush()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_carry_the_query() {
        let result = SearchResult {
            name: "Fried Rice".to_string(),
            ingredients: "rice, egg".to_string(),
            steps: "Fry.".to_string(),
        };
        let mut wtr = csv::Writer::from_writer(vec![]);
        wtr.serialize(Row::new("rice, egg", result)).unwrap();
        let data = String::from_utf8(wtr.into_inner().unwrap()).unwrap();

        assert_eq!(
            "query,name,ingredients,steps\n\"rice, egg\",Fried Rice,\"rice, egg\",Fry.\n",
            data
        );
    }
}
