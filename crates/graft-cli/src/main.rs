use anyhow::Result;
use clap::{Parser, Subcommand};

mod app;

#[derive(Parser)]
#[command(name = "graft")]
#[command(about = "Graft - chat with an LLM and graft its proposed edits onto your files")]
#[command(version)]
struct Cli {
    /// LLM service (hosted, openai, custom_open_ai, anthropic, google, ollama, llama_cpp)
    #[arg(long, global = true)]
    service: Option<String>,

    /// Model to use, overriding the configured one
    #[arg(short, long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send a chat prompt and stream the response; proposed edits are
    /// shown as diffs against the referenced files
    Chat {
        /// The prompt to send
        prompt: String,

        /// Project files to attach as context
        #[arg(short, long)]
        file: Vec<String>,

        /// PNG or JPEG screenshot to attach
        #[arg(long)]
        image: Option<String>,

        /// Apply every proposed edit instead of only previewing it
        #[arg(long)]
        apply: bool,
    },

    /// Merge a snippet into a destination file via model-proposed edits
    Apply {
        /// File holding the snippet to merge ("-" reads stdin)
        source: String,

        /// The file to merge into
        destination: String,

        /// Preview the diff without touching the destination
        #[arg(long)]
        dry_run: bool,
    },

    /// Generate a commit message for a diff read from stdin
    CommitMessage,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let mut settings = graft_core::Settings::load();

    if let Some(ref service) = cli.service {
        settings.service = match service.as_str() {
            "hosted" => graft_core::ServiceKind::Hosted,
            "openai" => graft_core::ServiceKind::OpenAi,
            "custom_open_ai" | "custom-openai" => graft_core::ServiceKind::CustomOpenAi,
            "anthropic" => graft_core::ServiceKind::Anthropic,
            "google" => graft_core::ServiceKind::Google,
            "llama_cpp" | "llama-cpp" => graft_core::ServiceKind::LlamaCpp,
            _ => graft_core::ServiceKind::Ollama,
        };
    }
    if let Some(ref model) = cli.model {
        let active = settings.service;
        let mut config = settings.active_service_config();
        config.model = model.clone();
        settings.services.retain(|s| s.kind != active);
        settings.services.push(config);
    }

    match cli.command {
        Command::Chat {
            prompt,
            file,
            image,
            apply,
        } => app::run_chat(&settings, &prompt, &file, image.as_deref(), apply).await,
        Command::Apply {
            source,
            destination,
            dry_run,
        } => app::run_auto_apply(&settings, &source, &destination, dry_run).await,
        Command::CommitMessage => app::run_commit_message(&settings).await,
    }
}
