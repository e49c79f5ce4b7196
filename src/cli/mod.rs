//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod context;
pub mod generate;
pub mod library;
pub mod now_reading;
pub mod settings;


use std::error::Error;

use clap::{ArgAction, Parser, Subcommand};

use crate::auth::ui::{interactive_auth, interactive_deauth};
use crate::auth::AuthManager;
use crate::cli::context::CliContext;
use crate::cli::generate::run_generate;
use crate::cli::library::{run_create, run_library, run_setup, run_show, run_suggest, CreateArgs};
use crate::cli::now_reading::{run_now_reading, NowReadingCommand};
use crate::cli::settings::helpers::update_config_file;
use crate::cli::settings::SettingRegistry;
use crate::core::config::data::Config;
use crate::core::profile::ProfileCache;
use crate::utils::logging::init_tracing;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\ncommit: ",
    env!("VERGEN_GIT_DESCRIBE"),
    " (",
    env!("VERGEN_GIT_COMMIT_TIMESTAMP"),
    ")\nbuilt: ",
    env!("VERGEN_BUILD_TIMESTAMP"),
    "\nrustc: ",
    env!("VERGEN_RUSTC_SEMVER"),
);

#[derive(Parser)]
#[command(name = "storyteller")]
#[command(version, long_version = LONG_VERSION)]
#[command(about = "Write, generate and listen to chaptered stories")]
#[command(
    long_about = "Storyteller is a terminal client for a story backend and a hosted AI \
assistant. Ask for story ideas, create a story, lay out its chapters and have the \
assistant write each chapter while you watch; finished chapters are narrated by the \
backend and queued in Now Reading.\n\n\
Authentication:\n\
  Use 'storyteller auth' to store the assistant API key in your system keyring.\n\
  Record the signed-in account with 'storyteller set auth-id <id>'.\n\n\
Environment Variables:\n\
  OPENAI_API_KEY            Assistant API key (fallback if no key is stored)\n\
  OPENAI_BASE_URL           Assistant API base URL\n\
  STORYTELLER_SERVER_HOST   Story backend base URL\n\
  RUST_LOG                  Log filter (overrides -v)\n\n\
While generating:\n\
  Ctrl+C            Cancel the chapter; nothing is saved"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ask for story ideas
    Suggest {
        /// Use the backend's suggestion route instead of the assistant
        #[arg(long)]
        backend: bool,
        /// What the stories should be about
        #[arg(trailing_var_arg = true)]
        prompt: Vec<String>,
    },
    /// Create a new story
    Create {
        #[arg(long)]
        title: String,
        /// Source passage the story adapts
        #[arg(long)]
        passage: String,
        #[arg(long, default_value = "")]
        summary: String,
        #[arg(long)]
        category: Option<String>,
        /// fantasy, sci-fi, mystery, horror or romance
        #[arg(long)]
        genre: Option<String>,
        /// short, medium or long
        #[arg(long)]
        length: Option<String>,
        /// modern, historical, space-age or magical
        #[arg(long = "time-period")]
        time_period: Option<String>,
        /// original or generated
        #[arg(long)]
        mode: Option<String>,
    },
    /// Lay out the chapters of a story
    Setup {
        story_id: String,
        /// Also ask the setup assistant for characters, plot, world and themes
        #[arg(long)]
        analysis: bool,
    },
    /// List your stories
    Library,
    /// Show a story and its chapters
    Show { story_id: String },
    /// Write a chapter with the assistant
    Generate {
        story_id: String,
        chapter: u32,
        /// Times to retry saving the chapter if the backend fails
        #[arg(long, default_value_t = 0)]
        retries: u32,
    },
    /// Show or control the Now Reading player
    NowReading {
        #[command(subcommand)]
        command: Option<NowReadingCommand>,
    },
    /// Show your profile, creating it on first use
    Profile {
        /// Forget the cached profile
        #[arg(long)]
        sign_out: bool,
    },
    /// Store the assistant API key in the system keyring
    Auth,
    /// Remove the stored assistant API key
    Deauth,
    /// Print the effective configuration
    Config,
    /// Set configuration values
    Set {
        /// Configuration key to set
        key: Option<String>,
        /// Value to set for the key (can be multiple words)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Unset configuration values
    Unset {
        /// Configuration key to unset
        key: String,
    },
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing(args.verbose);
    tokio::runtime::Runtime::new()?.block_on(async_main(args))
}

fn print_settings(registry: &SettingRegistry) -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;
    println!("Available settings:");
    for line in registry.describe(&config) {
        println!("{line}");
    }
    Ok(())
}

fn apply_setting(key: &str, value: Option<&[String]>) -> Result<(), Box<dyn Error>> {
    let registry = SettingRegistry::new();
    match update_config_file(&registry, &Config::config_path()?, key, value) {
        Ok(message) => {
            println!("{message}");
            Ok(())
        }
        Err(err) => {
            err.print();
            std::process::exit(err.exit_code());
        }
    }
}

async fn async_main(args: Args) -> Result<(), Box<dyn Error>> {
    match args.command {
        Commands::Suggest { backend, prompt } => {
            let ctx = CliContext::load()?;
            run_suggest(&ctx, prompt, backend).await
        }
        Commands::Create {
            title,
            passage,
            summary,
            category,
            genre,
            length,
            time_period,
            mode,
        } => {
            let mut ctx = CliContext::load()?;
            run_create(
                &mut ctx,
                CreateArgs {
                    title,
                    passage,
                    summary,
                    category,
                    genre,
                    length,
                    time_period,
                    mode,
                },
            )
            .await
        }
        Commands::Setup { story_id, analysis } => {
            let ctx = CliContext::load()?;
            run_setup(&ctx, &story_id, analysis).await
        }
        Commands::Library => {
            let mut ctx = CliContext::load()?;
            run_library(&mut ctx).await
        }
        Commands::Show { story_id } => {
            let ctx = CliContext::load()?;
            run_show(&ctx, &story_id).await
        }
        Commands::Generate {
            story_id,
            chapter,
            retries,
        } => {
            let mut ctx = CliContext::load()?;
            run_generate(&mut ctx, &story_id, chapter, retries).await
        }
        Commands::NowReading { command } => run_now_reading(command),
        Commands::Profile { sign_out } => {
            if sign_out {
                let mut cache = ProfileCache::load()?;
                cache.sign_out_at(&ProfileCache::cache_path()?)?;
                println!("✅ Signed out");
                return Ok(());
            }
            let mut ctx = CliContext::load()?;
            let profile = ctx.profile().await?;
            println!("{} ({})", profile.display_name(), profile.id);
            if !profile.email.is_empty() {
                println!("  email: {}", profile.email);
            }
            Ok(())
        }
        Commands::Auth => {
            let auth_manager = AuthManager::new();
            if let Err(e) = interactive_auth(&auth_manager) {
                eprintln!("❌ Authentication failed: {e}");
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Deauth => {
            let auth_manager = AuthManager::new();
            if let Err(e) = interactive_deauth(&auth_manager) {
                eprintln!("❌ Deauthentication failed: {e}");
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Config => {
            Config::load()?.print_all();
            Ok(())
        }
        Commands::Set { key, value } => match key {
            None => print_settings(&SettingRegistry::new()),
            Some(key) if value.is_empty() => {
                let registry = SettingRegistry::new();
                match registry.get(&key) {
                    Some(handler) => {
                        println!("{}", handler.format(&Config::load()?));
                        Ok(())
                    }
                    None => apply_setting(&key, Some(&value)),
                }
            }
            Some(key) => apply_setting(&key, Some(&value)),
        },
        Commands::Unset { key } => apply_setting(&key, None),
    }
}
