use clap::{Args, Parser, Subcommand};
use quill_symbols::cache::ParseCache;
use quill_symbols::{ddox, DocsIndex, SymbolError, SymbolKind, SymbolTable};
use serde::Serialize;
use std::borrow::Cow;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const CACHE_VERSION: &str = "1";

#[derive(Parser)]
#[command(author, version, about = "quill documentation symbol index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print symbols as a JSON array, optionally restricted to one kind
    List(ListArgs),
    /// Print the symbol with the given dotted name as JSON
    Lookup(LookupArgs),
    /// Print the index in DDOX `symbols.js` format
    Emit(SourceArgs),
    /// Index every `symbols.js` under a documentation root
    Index(IndexArgs),
}

#[derive(Args, Debug, Default)]
struct SourceArgs {
    /// Read symbols from this `symbols.js` instead of the built-in quill index
    #[arg(long)]
    source: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ListArgs {
    /// Only list symbols of this kind (e.g. module, classdeclaration)
    #[arg(long)]
    kind: Option<SymbolKind>,
    #[command(flatten)]
    source: SourceArgs,
}

#[derive(Args, Debug)]
struct LookupArgs {
    name: String,
    #[command(flatten)]
    source: SourceArgs,
}

#[derive(Args, Debug)]
struct IndexArgs {
    root: PathBuf,
    /// Reuse parsed indexes from this directory across runs
    #[arg(long)]
    cache_dir: Option<PathBuf>,
}

#[derive(Serialize)]
struct ErrorOut {
    error: String,
}

fn fail(err: SymbolError) -> ! {
    let out = ErrorOut {
        error: err.to_string(),
    };
    println!("{}", serde_json::to_string(&out).unwrap_or_else(|_| "{}".into()));
    std::process::exit(1);
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string(value) {
        Ok(json) => println!("{}", json),
        Err(err) => {
            eprintln!("quill-symbols: failed to serialize output: {}", err);
            std::process::exit(2);
        }
    }
}

fn load_table(args: &SourceArgs) -> Cow<'static, SymbolTable> {
    match &args.source {
        Some(path) => Cow::Owned(ddox::load_file(path).unwrap_or_else(|err| fail(err))),
        None => Cow::Borrowed(SymbolTable::builtin()),
    }
}

/// Writes the DDOX text as-is; the generated file has no trailing newline.
fn emit(table: &SymbolTable, out: &mut impl Write) -> io::Result<()> {
    out.write_all(ddox::render(table.iter()).as_bytes())?;
    out.flush()
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::List(args) => {
            let table = load_table(&args.source);
            let entries = match args.kind {
                Some(kind) => table.filter_by_kind(kind),
                None => table.iter().collect(),
            };
            print_json(&entries);
        }
        Commands::Lookup(args) => {
            let table = load_table(&args.source);
            match table.require(&args.name) {
                Ok(entry) => print_json(entry),
                Err(err) => fail(err),
            }
        }
        Commands::Emit(args) => {
            let table = load_table(&args);
            if let Err(err) = emit(&table, &mut io::stdout().lock()) {
                eprintln!("quill-symbols emit: failed to write output: {}", err);
                std::process::exit(2);
            }
        }
        Commands::Index(args) => {
            let cache = args
                .cache_dir
                .as_ref()
                .map(|dir| ParseCache::new(dir, CACHE_VERSION));
            let index = DocsIndex::index_root(&args.root, cache.as_ref());
            println!("{}", index.to_json());
        }
    }
}
