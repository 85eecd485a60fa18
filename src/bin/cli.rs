//! CLI binary for mailpilot.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use mailpilot::actions::{ToolInvocation, render_value};
use mailpilot::approval::Decision;
use mailpilot::llm::OpenAiCompatClient;
use mailpilot::mailbox::{GraphMailbox, InMemoryMailbox, MailboxClient, StaticTokenProvider};
use mailpilot::{AssistantConfig, MailAgent, StopReason, builtin_registry};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Mailpilot: an email and calendar assistant driven by a language model.
#[derive(Parser)]
#[command(name = "mailpilot", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Use a seeded in-memory mailbox instead of the configured provider.
    #[arg(long)]
    offline: bool,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Option<Command>,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Chat with the assistant (default).
    Chat,

    /// Print the action catalog shown to the model.
    Actions,

    /// Write a default configuration file.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(AssistantConfig::default_config_path);

    if let Some(Command::InitConfig { force }) = cli.command {
        return init_config(&config_path, force);
    }

    let config = if cli.config.is_some() || config_path.exists() {
        AssistantConfig::from_file(&config_path)?
    } else {
        AssistantConfig::default()
    };
    config.validate()?;

    // RUST_LOG wins over the config file.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mailbox = build_mailbox(&config, cli.offline);
    let registry = builtin_registry(mailbox, config.mailbox.max_search_results)?;

    match cli.command.unwrap_or(Command::Chat) {
        Command::Actions => {
            print!("{}", registry.render_catalog());
            Ok(())
        }
        Command::Chat | Command::InitConfig { .. } => run_chat(config, registry).await,
    }
}

fn init_config(path: &std::path::Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    AssistantConfig::default().save_to_file(path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn build_mailbox(config: &AssistantConfig, offline: bool) -> Arc<dyn MailboxClient> {
    if offline {
        info!("using in-memory sample mailbox");
        return Arc::new(InMemoryMailbox::sample());
    }
    let tokens = StaticTokenProvider::new(config.resolve_mailbox_token());
    Arc::new(
        GraphMailbox::new(config.mailbox.base_url.clone(), Box::new(tokens))
            .with_task_list(config.mailbox.task_list.clone()),
    )
}

async fn run_chat(
    config: AssistantConfig,
    registry: mailpilot::ActionRegistry,
) -> anyhow::Result<()> {
    let model = OpenAiCompatClient::new(config.model_client_config())?;
    info!(model = %config.model.model, base_url = %config.model.base_url, "model client ready");
    let agent = MailAgent::new(config.agent.clone(), Arc::new(model), Arc::new(registry));

    println!("Mailpilot v{}", env!("CARGO_PKG_VERSION"));
    println!("Commands: /pending, /approve ID, /reject ID [comment], /reset, /quit\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        eprint!("> ");
        let Some(line) = lines.next_line().await.context("failed to read stdin")? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let reply = match parse_command(line) {
            Some(ChatCommand::Quit) => break,
            Some(ChatCommand::Reset) => {
                agent.reset()?;
                println!("Session cleared.");
                continue;
            }
            Some(ChatCommand::Pending) => {
                let pending = agent.pending_approvals()?;
                if pending.is_empty() {
                    println!("Nothing is waiting for approval.");
                }
                for p in pending {
                    println!("  {}  {}", p.id, p.description);
                    for line in pending_details(&p.invocation) {
                        println!("      {line}");
                    }
                }
                continue;
            }
            Some(ChatCommand::Approve(id)) => agent.resolve_approval(&id, Decision::Approve).await,
            Some(ChatCommand::Reject(id, comment)) => {
                agent
                    .resolve_approval(&id, Decision::reject(comment))
                    .await
            }
            Some(ChatCommand::Usage(usage)) => {
                println!("usage: {usage}");
                continue;
            }
            None => agent.handle_message(line).await,
        };

        match reply {
            Ok(reply) => {
                println!("{}", reply.text);
                if reply.stop == StopReason::ApprovalRequired {
                    println!("(/approve ID or /reject ID [comment])");
                }
                println!();
            }
            Err(e) => eprintln!("error: {e}"),
        }
    }

    Ok(())
}

/// Full parameters of a parked action, one `key: value` per line with
/// multi-line values indented beneath their key.
fn pending_details(invocation: &ToolInvocation) -> Vec<String> {
    let mut lines = Vec::new();
    for (key, value) in &invocation.params {
        let rendered = render_value(value);
        let mut value_lines = rendered.lines();
        lines.push(format!("{key}: {}", value_lines.next().unwrap_or_default()));
        lines.extend(value_lines.map(|l| format!("  {l}")));
    }
    lines
}

/// Slash commands understood by the chat loop.
#[derive(Debug, PartialEq, Eq)]
enum ChatCommand {
    Pending,
    Approve(String),
    Reject(String, String),
    Reset,
    Quit,
    Usage(&'static str),
}

fn parse_command(line: &str) -> Option<ChatCommand> {
    let rest = line.strip_prefix('/')?;
    let (cmd, args) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    let args = args.trim();
    let command = match cmd.to_ascii_lowercase().as_str() {
        "pending" => ChatCommand::Pending,
        "reset" => ChatCommand::Reset,
        "quit" | "exit" => ChatCommand::Quit,
        "approve" if !args.is_empty() => ChatCommand::Approve(args.to_owned()),
        "approve" => ChatCommand::Usage("/approve ID"),
        "reject" if !args.is_empty() => {
            let (id, comment) = args.split_once(char::is_whitespace).unwrap_or((args, ""));
            ChatCommand::Reject(id.to_owned(), comment.trim().to_owned())
        }
        "reject" => ChatCommand::Usage("/reject ID [comment]"),
        _ => return None,
    };
    Some(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slash_commands_parse() {
        assert_eq!(parse_command("/pending"), Some(ChatCommand::Pending));
        assert_eq!(parse_command("/QUIT"), Some(ChatCommand::Quit));
        assert_eq!(
            parse_command("/approve abc-123"),
            Some(ChatCommand::Approve("abc-123".into()))
        );
        assert_eq!(
            parse_command("/reject abc-123 keep it please"),
            Some(ChatCommand::Reject("abc-123".into(), "keep it please".into()))
        );
        assert_eq!(
            parse_command("/reject abc-123"),
            Some(ChatCommand::Reject("abc-123".into(), String::new()))
        );
        assert_eq!(
            parse_command("/approve"),
            Some(ChatCommand::Usage("/approve ID"))
        );
    }

    #[test]
    fn pending_details_show_the_whole_body() {
        let mut params = mailpilot::actions::ActionParams::new();
        params.insert("to".into(), serde_json::json!(["jane@x.com"]));
        params.insert("body".into(), serde_json::json!("Hi Jane,\nSee you at 10.\nBob"));
        let details = pending_details(&ToolInvocation::new("send_email", params));
        assert!(details.contains(&"to: jane@x.com".to_owned()));
        assert!(details.contains(&"body: Hi Jane,".to_owned()));
        assert!(details.contains(&"  See you at 10.".to_owned()));
        assert!(details.contains(&"  Bob".to_owned()));
    }

    #[test]
    fn plain_text_and_unknown_commands_go_to_the_agent() {
        assert_eq!(parse_command("what's unread?"), None);
        assert_eq!(parse_command("/summarize everything"), None);
    }
}
