//! Wenshu CLI
//!
//! Command-line interface for the Wenshu document archive.

use std::fs::OpenOptions;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use wenshu_core::storage::schema::get_schema_version;
use wenshu_core::{Config, Store, StoreError, User};

mod auth;
mod commands;
mod editor;
mod output;

use commands::res::ResourceFields;
use commands::user::Registration;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "wenshu")]
#[command(about = "Wenshu - archive of historical local-government documents")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Act as this user (username or email)
    #[arg(short, long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database if it does not exist
    Init,
    /// Manage user accounts
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// Manage documents
    Doc {
        #[command(subcommand)]
        command: DocCommands,
    },
    /// Manage resources within documents
    Res {
        #[command(subcommand)]
        command: ResCommands,
    },
    /// Search resource texts
    Search {
        /// Keyword to look for
        keyword: String,
        /// Only search simplified text and translations
        #[arg(short, long)]
        transcription: bool,
    },
    /// Manage notes on resources
    Note {
        #[command(subcommand)]
        command: NoteCommands,
    },
    /// Manage favorites
    Fav {
        #[command(subcommand)]
        command: FavCommands,
    },
    /// Track reading progress
    Progress {
        #[command(subcommand)]
        command: ProgressCommands,
    },
    /// Show archive statistics
    Stats,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Register a new account
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Repeat the password
        #[arg(long)]
        confirm: String,
        /// Password recovery question
        #[arg(long)]
        question: Option<String>,
        /// Answer to the recovery question
        #[arg(long)]
        answer: Option<String>,
    },
    /// Show an account (defaults to --user)
    Show {
        /// Username or email
        login: Option<String>,
    },
    /// Check a username/email and password
    Verify {
        login: String,
        #[arg(long)]
        password: String,
    },
    /// Change the password of --user
    Passwd {
        #[arg(long)]
        current: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm: String,
    },
    /// Change the recovery question of --user
    Recovery {
        #[arg(long)]
        question: Option<String>,
        #[arg(long)]
        answer: Option<String>,
    },
}

#[derive(Subcommand)]
enum DocCommands {
    /// Create a document
    #[command(alias = "create")]
    Add {
        name: String,
        #[arg(short, long)]
        region: Option<String>,
        #[arg(short, long)]
        intro: Option<String>,
    },
    /// List all documents
    #[command(alias = "ls")]
    List,
    /// Show a document and its resources
    Show { id: i64 },
    /// Edit a document
    Edit {
        id: i64,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        region: Option<String>,
        #[arg(short, long)]
        intro: Option<String>,
    },
    /// Delete a document and all its resources
    #[command(alias = "delete")]
    Rm {
        id: i64,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Show counts for a document
    Stats {
        id: i64,
        /// Also count resources of this type
        #[arg(short = 't', long = "type")]
        resource_type: Option<String>,
    },
    /// Set, clear or export the cover image
    Cover {
        id: i64,
        /// Image file to store as the cover
        #[arg(long, conflicts_with_all = ["clear", "out"])]
        set: Option<PathBuf>,
        /// Remove the cover
        #[arg(long, conflicts_with = "out")]
        clear: bool,
        /// Write the cover to this file
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Documents containing a text by this author
    ByAuthor { author: String },
}

#[derive(Args)]
struct ResourceArgs {
    /// Resource name (unique across the archive)
    #[arg(short, long)]
    name: Option<String>,
    /// Resource type, e.g. text or image
    #[arg(short = 't', long = "type")]
    resource_type: Option<String>,
    /// Original transcription
    #[arg(long)]
    original: Option<String>,
    /// Simplified-character text
    #[arg(long)]
    simplified: Option<String>,
    /// Vernacular translation
    #[arg(long)]
    translation: Option<String>,
}

impl From<ResourceArgs> for ResourceFields {
    fn from(args: ResourceArgs) -> Self {
        ResourceFields {
            name: args.name,
            resource_type: args.resource_type,
            original: args.original,
            simplified: args.simplified,
            translation: args.translation,
        }
    }
}

#[derive(Subcommand)]
enum ResCommands {
    /// Add a resource to a document
    #[command(alias = "create")]
    Add {
        document_id: i64,
        #[command(flatten)]
        fields: ResourceArgs,
    },
    /// List the resources of a document
    #[command(alias = "ls")]
    List { document_id: i64 },
    /// Show a resource with its texts and notes
    Show {
        id: i64,
        /// Record reading progress (percent) for --user
        #[arg(short, long)]
        progress: Option<i64>,
    },
    /// Edit a resource
    Edit {
        id: i64,
        /// Move to another document
        #[arg(short, long)]
        document: Option<i64>,
        #[command(flatten)]
        fields: ResourceArgs,
    },
    /// Delete a resource
    #[command(alias = "delete")]
    Rm {
        id: i64,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Show or set author and dynasty
    Info {
        id: i64,
        #[arg(short, long)]
        author: Option<String>,
        #[arg(short, long)]
        dynasty: Option<String>,
    },
}

#[derive(Subcommand)]
enum NoteCommands {
    /// Add a note to a resource
    #[command(alias = "create")]
    Add {
        resource_id: i64,
        /// Note content (opens editor if not provided)
        #[arg(short, long)]
        content: Option<String>,
        #[arg(short, long)]
        tags: Option<String>,
    },
    /// List notes on a resource
    #[command(alias = "ls")]
    List { resource_id: i64 },
    /// List notes written by --user
    Mine,
    /// Edit a note written by --user
    Edit {
        id: i64,
        #[arg(short, long)]
        content: Option<String>,
        /// New tags (an empty value clears them)
        #[arg(short, long)]
        tags: Option<String>,
    },
    /// Delete a note written by --user
    #[command(alias = "delete")]
    Rm {
        id: i64,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum FavCommands {
    /// Favorite a resource, or unfavorite it
    Toggle {
        resource_id: i64,
        #[arg(short, long)]
        tags: Option<String>,
    },
    /// List favorites of --user
    #[command(alias = "ls")]
    List,
    /// Documents --user has favorited something in
    Docs,
    /// Replace the tags on a favorite
    Tags {
        favorite_id: i64,
        /// New tags (omit to clear)
        tags: Option<String>,
    },
    /// Remove a favorite by its ID
    #[command(alias = "delete")]
    Rm { favorite_id: i64 },
}

#[derive(Subcommand)]
enum ProgressCommands {
    /// Record how far --user has read a resource
    Record {
        resource_id: i64,
        /// Percent read; values outside 0-100 are clamped
        #[arg(allow_negative_numbers = true)]
        percent: i64,
    },
    /// Show reading history of --user
    History {
        /// Only this resource
        resource_id: Option<i64>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, pool_size, busy_timeout_ms, log_file, log_level)
        key: String,
        /// Configuration value
        value: String,
    },
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    if let Err(e) = run(cli, &output) {
        report_error(&e, &output);
        std::process::exit(1);
    }
}

fn run(cli: Cli, output: &Output) -> Result<()> {
    // Config commands don't need the store
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), cli.config.as_ref(), output);
    }

    let config = Config::load_with_cli_override(cli.config.as_ref())
        .context("Failed to load configuration")?;
    init_logging(&config);

    let store = Store::open_with_config(&config)?;
    let actor = resolve_user(&store, cli.user.as_deref())?;
    let actor = actor.as_ref();

    match cli.command {
        Commands::Config { .. } => unreachable!(), // Handled above
        Commands::Init => handle_init(&store, &config, output),
        Commands::User { command } => handle_user_command(command, &store, actor, output),
        Commands::Doc { command } => handle_doc_command(command, &store, actor, output),
        Commands::Res { command } => handle_res_command(command, &store, actor, output),
        Commands::Search {
            keyword,
            transcription,
        } => commands::search::search(&store, actor, keyword, transcription, output),
        Commands::Note { command } => handle_note_command(command, &store, actor, output),
        Commands::Fav { command } => handle_fav_command(command, &store, actor, output),
        Commands::Progress { command } => match command {
            ProgressCommands::Record {
                resource_id,
                percent,
            } => commands::progress::record(&store, actor, resource_id, percent, output),
            ProgressCommands::History { resource_id } => {
                commands::progress::history(&store, actor, resource_id, output)
            }
        },
        Commands::Stats => commands::stats::show(&store, output),
    }
}

/// Look up the user named by `--user`
fn resolve_user(store: &Store, login: Option<&str>) -> Result<Option<User>> {
    let Some(login) = login else {
        return Ok(None);
    };
    let user = store
        .find_user_by_login(login)?
        .ok_or_else(|| anyhow::anyhow!("Unknown user: {}", login))?;
    debug!("Acting as user {} ({})", user.username, user.id);
    Ok(Some(user))
}

fn handle_init(store: &Store, config: &Config, output: &Output) -> Result<()> {
    let session = store.database().session()?;
    let version = get_schema_version(&session)?.unwrap_or_default();
    drop(session);

    let db_path = config.database_path();
    match output.format {
        OutputFormat::Json => output.json(&serde_json::json!({
            "database": db_path,
            "schema_version": version,
        })),
        OutputFormat::Quiet => println!("{}", db_path.display()),
        OutputFormat::Human => {
            println!("Database ready: {}", db_path.display());
            println!("Schema version: {}", version);
        }
    }
    Ok(())
}

fn handle_user_command(
    command: UserCommands,
    store: &Store,
    actor: Option<&User>,
    output: &Output,
) -> Result<()> {
    match command {
        UserCommands::Register {
            username,
            email,
            password,
            confirm,
            question,
            answer,
        } => commands::user::register(
            store,
            Registration {
                username,
                email,
                password,
                confirm,
                question,
                answer,
            },
            output,
        ),
        UserCommands::Show { login } => commands::user::show(store, login, actor, output),
        UserCommands::Verify { login, password } => {
            commands::user::verify(store, login, password, output)
        }
        UserCommands::Passwd {
            current,
            password,
            confirm,
        } => commands::user::passwd(store, actor, current, password, confirm, output),
        UserCommands::Recovery { question, answer } => {
            commands::user::recovery(store, actor, question, answer, output)
        }
    }
}

fn handle_doc_command(
    command: DocCommands,
    store: &Store,
    actor: Option<&User>,
    output: &Output,
) -> Result<()> {
    match command {
        DocCommands::Add {
            name,
            region,
            intro,
        } => commands::doc::add(store, name, region, intro, output),
        DocCommands::List => commands::doc::list(store, output),
        DocCommands::Show { id } => commands::doc::show(store, id, actor, output),
        DocCommands::Edit {
            id,
            name,
            region,
            intro,
        } => commands::doc::edit(store, id, name, region, intro, output),
        DocCommands::Rm { id, yes } => commands::doc::delete(store, id, yes, output),
        DocCommands::Stats { id, resource_type } => {
            commands::doc::stats(store, id, resource_type, output)
        }
        DocCommands::Cover {
            id,
            set,
            clear,
            out,
        } => commands::doc::cover(store, id, set, clear, out, output),
        DocCommands::ByAuthor { author } => commands::doc::by_author(store, author, output),
    }
}

fn handle_res_command(
    command: ResCommands,
    store: &Store,
    actor: Option<&User>,
    output: &Output,
) -> Result<()> {
    match command {
        ResCommands::Add {
            document_id,
            fields,
        } => commands::res::add(store, document_id, fields.into(), output),
        ResCommands::List { document_id } => commands::res::list(store, document_id, output),
        ResCommands::Show { id, progress } => {
            commands::res::show(store, id, actor, progress, output)
        }
        ResCommands::Edit {
            id,
            document,
            fields,
        } => commands::res::edit(store, id, document, fields.into(), output),
        ResCommands::Rm { id, yes } => commands::res::delete(store, id, yes, output),
        ResCommands::Info {
            id,
            author,
            dynasty,
        } => commands::res::info(store, id, author, dynasty, output),
    }
}

fn handle_note_command(
    command: NoteCommands,
    store: &Store,
    actor: Option<&User>,
    output: &Output,
) -> Result<()> {
    match command {
        NoteCommands::Add {
            resource_id,
            content,
            tags,
        } => commands::note::create(store, actor, resource_id, content, tags, output),
        NoteCommands::List { resource_id } => commands::note::list(store, resource_id, output),
        NoteCommands::Mine => commands::note::mine(store, actor, output),
        NoteCommands::Edit { id, content, tags } => {
            commands::note::edit(store, actor, id, content, tags, output)
        }
        NoteCommands::Rm { id, yes } => commands::note::delete(store, actor, id, yes, output),
    }
}

fn handle_fav_command(
    command: FavCommands,
    store: &Store,
    actor: Option<&User>,
    output: &Output,
) -> Result<()> {
    match command {
        FavCommands::Toggle { resource_id, tags } => {
            commands::fav::toggle(store, actor, resource_id, tags, output)
        }
        FavCommands::List => commands::fav::list(store, actor, output),
        FavCommands::Docs => commands::fav::documents(store, actor, output),
        FavCommands::Tags { favorite_id, tags } => {
            commands::fav::tags(store, actor, favorite_id, tags, output)
        }
        FavCommands::Rm { favorite_id } => commands::fav::delete(store, actor, favorite_id, output),
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Print an error, hiding whether a record is missing or belongs to someone else
fn report_error(err: &anyhow::Error, output: &Output) {
    let message = match err.downcast_ref::<StoreError>() {
        Some(e) if e.is_denied() => "Not found or not permitted".to_string(),
        _ => format!("{:#}", err),
    };
    if output.is_json() {
        println!(
            "{}",
            serde_json::json!({"status": "error", "message": message})
        );
    } else {
        eprintln!("Error: {}", message);
    }
}

/// Initialize tracing from the configured level
///
/// `RUST_LOG` overrides `log_level`. Logs go to `log_file` when set,
/// otherwise to stderr.
fn init_logging(config: &Config) {
    let level = &config.log_level;
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("wenshu_core={},wenshu={}", level, level)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false);

    match config.log_file {
        Some(ref path) => {
            let file = match OpenOptions::new().create(true).append(true).open(path) {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("Warning: Could not open log file {:?}: {}", path, e);
                    return;
                }
            };
            let _ = builder.with_ansi(false).with_writer(file).try_init();
        }
        None => {
            let _ = builder.with_writer(std::io::stderr).try_init();
        }
    }

    info!("Logging initialized");
}
