use std::path::PathBuf;

use clap::{
    CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};

use gramfollow::{cli, config, error};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  author=env!("CARGO_PKG_AUTHORS"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Log in and cache the session
    Login(LoginOptions),

    /// Show the cached session and probe its liveness
    Status,

    /// Follow a list of accounts
    Follow(FollowOptions),

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct LoginOptions {
    /// Account username (falls back to INSTAGRAM_USERNAME)
    #[clap(long)]
    username: Option<String>,

    /// Account password (falls back to INSTAGRAM_PASSWORD)
    #[clap(long)]
    password: Option<String>,

    /// Existing session id to adopt instead of a password login
    #[clap(long)]
    session_id: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct FollowOptions {
    /// Handles or profile URLs to follow
    targets: Vec<String>,

    /// File with one handle or profile URL per line
    #[clap(long)]
    file: Option<PathBuf>,

    /// Minimum delay between follows, seconds
    #[clap(long, default_value_t = 30)]
    delay_min: u64,

    /// Maximum delay between follows, seconds
    #[clap(long, default_value_t = 90)]
    delay_max: u64,

    /// Cap on how many targets one run processes
    #[clap(long, default_value_t = 20)]
    max_targets: usize,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

#[tokio::main]
async fn main() {
    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }

    let cli = Cli::parse();

    match cli.command {
        Command::Login(opt) => cli::login(opt.username, opt.password, opt.session_id).await,
        Command::Status => cli::status().await,
        Command::Follow(opt) => {
            cli::follow_targets(
                opt.targets,
                opt.file,
                opt.delay_min,
                opt.delay_max,
                opt.max_targets,
            )
            .await
        }
        Command::Completions(opt) => {
            let mut cmd = Cli::command_for_update();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout())
        }
    }
}
