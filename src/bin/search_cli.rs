use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use mimalloc::MiMalloc;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

use quarry::query_processor::query_processor::{DEFAULT_MAX_RESULTS, QueryType};
use quarry::scoring::scoring::ScoringMethod;
use quarry::search_engine::search_engine::SearchEngine;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Interactive search over a previously built index.
#[derive(Debug, Parser)]
#[command(name = "search_cli")]
struct Args {
    /// Directory holding the index artifacts.
    #[arg(long, env = "RESOURCES_PATH", default_value = "resources")]
    resources: PathBuf,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();
    println!("Loading resources from {}...", args.resources.display());
    let engine = match SearchEngine::load(&args.resources) {
        Ok(engine) => engine,
        Err(error) => {
            eprintln!("failed to load the index: {error}");
            return ExitCode::FAILURE;
        }
    };
    println!(
        "Loaded {} documents and {} terms.",
        engine.document_count(),
        engine.term_count()
    );

    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(error) => {
            eprintln!("failed to start the prompt: {error}");
            return ExitCode::FAILURE;
        }
    };

    loop {
        let query = match prompt(&mut editor, "\nEnter query (or 'exit' to quit): ") {
            Some(line) => line,
            None => break,
        };
        if query.eq_ignore_ascii_case("exit") {
            break;
        }
        if query.is_empty() {
            println!("Query cannot be empty.");
            continue;
        }

        let query_type = match prompt(&mut editor, "Query type (1 = conjunctive, 2 = disjunctive): ") {
            Some(choice) => match choice.as_str() {
                "1" => QueryType::Conjunctive,
                "2" => QueryType::Disjunctive,
                _ => {
                    println!("Invalid query type. Enter 1 or 2.");
                    continue;
                }
            },
            None => break,
        };

        let method = match prompt(&mut editor, "Method (1 = TF-IDF, 2 = BM25): ") {
            Some(choice) => match choice.as_str() {
                "1" => ScoringMethod::TfIdf,
                "2" => ScoringMethod::Bm25,
                _ => {
                    println!("Invalid method. Enter 1 or 2.");
                    continue;
                }
            },
            None => break,
        };

        match engine.search(&query, query_type, method, DEFAULT_MAX_RESULTS) {
            Ok(results) if results.is_empty() => println!("No results found."),
            Ok(results) => {
                for document in results {
                    println!("{} {}", document.doc_id, document.score);
                }
            }
            Err(error) => eprintln!("query failed: {error}"),
        }
    }

    ExitCode::SUCCESS
}

fn prompt(editor: &mut DefaultEditor, message: &str) -> Option<String> {
    match editor.readline(message) {
        Ok(line) => Some(line.trim().to_string()),
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => None,
        Err(error) => {
            eprintln!("input error: {error}");
            None
        }
    }
}
