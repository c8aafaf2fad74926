use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Local};
use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use smart_labels::config::SchemaConfig;
use smart_labels::search::{search, search_examples, INVALID_CRITERIA, MATCH_LIMIT};
use smart_labels::sql_compiler::SqlCompiler;
use smart_labels::{compile_filter, parse, SyntaxError, Track};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Compile smart label criteria into predicates and SQL.
#[derive(Debug, Parser)]
#[command(name = "smart_labels", version)]
struct Args {
    /// Criteria to compile. Starts an interactive prompt when omitted.
    criteria: Option<String>,

    /// JSON file mapping the track schema
    #[arg(long)]
    schema: Option<PathBuf>,

    /// JSON array of tracks to search
    #[arg(long)]
    tracks: Option<PathBuf>,

    /// Evaluation time as RFC 3339 (defaults to the local clock)
    #[arg(long, value_parser = DateTime::parse_from_rfc3339)]
    now: Option<DateTime<FixedOffset>>,

    /// User whose tracks the SQL is scoped to
    #[arg(long, default_value_t = 1)]
    user_id: i64,

    /// Print predicates as JSON
    #[arg(long)]
    json: bool,
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Loads the schema mapping, falling back to the default one.
fn create_compiler(path: Option<&Path>) -> SqlCompiler {
    let Some(path) = path else {
        return SqlCompiler::default();
    };
    match SchemaConfig::from_json_file(path) {
        Ok(schema) => {
            tracing::info!(path = %path.display(), "using schema config");
            SqlCompiler::new(schema)
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to load schema config, using default schema");
            SqlCompiler::default()
        }
    }
}

fn load_tracks(path: &Path) -> Result<Vec<Track>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read tracks file {}", path.display()))?;
    let tracks: Vec<Track> = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse tracks file {}", path.display()))?;
    tracing::info!(count = tracks.len(), "loaded tracks");
    Ok(tracks)
}

struct Session {
    compiler: SqlCompiler,
    tracks: Vec<Track>,
    now: DateTime<FixedOffset>,
    user_id: i64,
    json: bool,
}

impl Session {
    fn run(&self, source: &str) -> Result<()> {
        let predicate = match compile_filter(source, &self.now) {
            Ok(predicate) => predicate,
            Err(e) => {
                report_error(source, &e);
                return Ok(());
            }
        };

        match &predicate {
            None => println!("criteria:  (none, matches every track)"),
            Some(predicate) => {
                // Canonical form of what was understood
                if let Ok(expr) = parse(source) {
                    println!("criteria:  {}", expr);
                }
                if self.json {
                    println!("predicate: {}", serde_json::to_string_pretty(predicate)?);
                } else {
                    println!("predicate: {:#?}", predicate);
                }
            }
        }

        let select = self
            .compiler
            .select_tracks(predicate.as_ref(), self.user_id, Some(MATCH_LIMIT as u64));
        println!("sql:       {}", self.compiler.to_sql(&select));

        if !self.tracks.is_empty() {
            let summary = search(source, &self.now, &self.tracks)?;
            println!("matches:   {}", summary.match_count);
            for name in &summary.match_examples {
                println!("  • {}", name);
            }
        }
        Ok(())
    }

    fn print_examples(&self) {
        let mut labels: Vec<String> = self
            .tracks
            .iter()
            .flat_map(|track| track.labels.iter().cloned())
            .collect();
        labels.sort();
        for example in search_examples(&labels, &self.tracks) {
            println!("{:<32} {}", example.value, example.description);
        }
    }
}

/// Prints the error with a marker under the offending input.
fn report_error(source: &str, error: &SyntaxError) {
    println!("✗ {}: {}", INVALID_CRITERIA, error);
    if let Some(span) = error.span() {
        let offset = source[..span.start].chars().count();
        let width = source[span.start..span.end].chars().count().max(1);
        println!("  {}", source);
        println!("  {}{}", " ".repeat(offset), "^".repeat(width));
    }
}

fn repl(session: &Session) -> Result<()> {
    println!("--- Smart labels: criteria compiler ---");
    println!("now: {}", session.now.to_rfc3339());
    println!("Type criteria, :examples for suggestions, :quit to exit.\n");

    let mut editor = DefaultEditor::new()?;
    loop {
        match editor.readline("criteria> ") {
            Ok(line) => {
                let line = line.trim();
                editor.add_history_entry(line)?;
                match line {
                    ":quit" | ":q" => break,
                    ":examples" => session.print_examples(),
                    _ => session.run(line)?,
                }
                println!();
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    setup_logging();
    let args = Args::parse();

    let tracks = match &args.tracks {
        Some(path) => load_tracks(path)?,
        None => Vec::new(),
    };

    let session = Session {
        compiler: create_compiler(args.schema.as_deref()),
        tracks,
        now: args.now.unwrap_or_else(|| Local::now().fixed_offset()),
        user_id: args.user_id,
        json: args.json,
    };

    match &args.criteria {
        Some(criteria) => session.run(criteria),
        None => repl(&session),
    }
}
