//! sealnote CLI - password-protected notes
//!
//! Notes live in a local JSON store. Titles and tags are kept in the clear;
//! note bodies are encrypted with a key derived from your password.

use clap::{Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use sealnote::commands::Context;
use sealnote::error::{Result, SealnoteError};
use sealnote::file_ops;
use sealnote::password::{PasswordReader, StreamPasswordReader, TerminalPasswordReader};
use sealnote::store::JsonFileStore;
use sealnote::vault::SessionPolicy;

#[derive(Parser)]
#[command(name = "sealnote")]
#[command(version)]
#[command(about = "Password-protected notes with client-side encryption.", long_about = None)]
struct Cli {
    /// Read password from stdin instead of from terminal
    #[arg(long, global = true)]
    password_stdin: bool,

    /// Path to the note store
    #[arg(
        long,
        global = true,
        env = "SEALNOTE_STORE",
        value_name = "FILE",
        default_value = "sealnote.json"
    )]
    store: PathBuf,

    /// User whose notes to operate on
    #[arg(long, global = true, env = "SEALNOTE_USER", default_value = "default")]
    user: String,

    /// Forget the derived key after this many idle seconds (0 never expires)
    #[arg(long, global = true, env = "SEALNOTE_IDLE_SECS", default_value_t = 900)]
    idle_secs: u64,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Set up encryption for the user (generates the salt once)
    Init,

    /// Add a note
    #[command(alias = "a")]
    Add {
        /// Note title
        #[arg(short, long, default_value = "")]
        title: String,

        /// Tag to attach (repeatable)
        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,

        /// Note body
        #[arg(long, conflicts_with = "input")]
        text: Option<String>,

        /// Read the note body from a file
        #[arg(short, long, value_name = "FILE")]
        input: Option<PathBuf>,
    },

    /// List notes (no password needed)
    #[command(alias = "ls")]
    List {
        /// Only notes whose title contains this text (case-insensitive)
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Decrypt and print a note
    Show { id: String },

    /// Change a note's title, tags or body
    Edit {
        id: String,

        #[arg(short, long)]
        title: Option<String>,

        /// Replace all tags (repeatable)
        #[arg(long = "tag", value_name = "TAG")]
        tags: Option<Vec<String>>,

        #[arg(long, conflicts_with = "input")]
        text: Option<String>,

        #[arg(short, long, value_name = "FILE")]
        input: Option<PathBuf>,
    },

    /// Delete a note
    #[command(alias = "rm")]
    Delete { id: String },

    /// Write every readable note, decrypted, to a JSON file
    Export {
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Re-encrypt notes from an exported JSON file into the store
    Import {
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let policy = if cli.idle_secs == 0 {
        SessionPolicy::never_expire()
    } else {
        SessionPolicy::idle_after(Duration::from_secs(cli.idle_secs))
    };
    let mut ctx = Context {
        store: JsonFileStore::open(cli.store),
        user_id: cli.user,
        policy,
        reader: password_reader(cli.password_stdin),
    };
    let mut out = io::stdout().lock();

    let result = match cli.command {
        Commands::Init => ctx.init(&mut out),
        Commands::Add {
            title,
            tags,
            text,
            input,
        } => match body(text, input) {
            Ok(Some(content)) => ctx.add(&title, tags, content, &mut out),
            Ok(None) => Err(SealnoteError::invalid_input(
                "note content is required: pass --text or --input",
            )),
            Err(e) => Err(e),
        },
        Commands::List { search } => ctx.list(search.as_deref(), &mut out),
        Commands::Show { id } => ctx.show(&id, &mut out),
        Commands::Edit {
            id,
            title,
            tags,
            text,
            input,
        } => body(text, input).and_then(|content| ctx.edit(&id, title, tags, content)),
        Commands::Delete { id } => ctx.delete(&id),
        Commands::Export { output } => ctx.export(&output, &mut out),
        Commands::Import { input } => ctx.import(&input, &mut out),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "sealnote=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn body(text: Option<String>, input: Option<PathBuf>) -> Result<Option<String>> {
    match (text, input) {
        (Some(text), _) => Ok(Some(text)),
        (None, Some(path)) => file_ops::read_text(&path).map(Some),
        (None, None) => Ok(None),
    }
}

fn password_reader(use_stdin: bool) -> Box<dyn PasswordReader> {
    if use_stdin {
        Box::new(StreamPasswordReader::new(Box::new(io::stdin())))
    } else {
        Box::new(TerminalPasswordReader)
    }
}
