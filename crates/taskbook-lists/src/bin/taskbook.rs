//! taskbook: command-line front end for the taskbook list exchange.
//!
//! Every command runs as the user given with `--user`. The result is
//! printed, followed by every notification the command emitted.

use std::process::ExitCode;
use std::sync::Arc;

use chrono::{Offset, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::broadcast::Receiver;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use taskbook_core::events::NotificationEnvelope;
use taskbook_core::{Error, ListKind};
use taskbook_lists::{
    items_summary, AddOutcome, AddRequest, IdentityDirectory, ReminderRequest, Settings,
    TaskService, TaskbookConfig,
};

#[derive(Parser)]
#[command(name = "taskbook")]
#[command(author, version, about = "Shared task lists with send/accept between users")]
#[command(propagate_version = true)]
struct Cli {
    /// User to act as
    #[arg(short, long, global = true, default_value = "")]
    user: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add an item to your list
    Add {
        title: String,

        #[arg(short, long, default_value = "")]
        description: String,

        /// Chat message the item is attached to
        #[arg(long, default_value = "")]
        post_id: String,
    },

    /// Send an item to another user
    Send {
        receiver: String,

        title: String,

        #[arg(short, long, default_value = "")]
        description: String,

        #[arg(long, default_value = "")]
        post_id: String,
    },

    /// Show one of your lists
    List {
        /// my, in or out
        #[arg(default_value = "my")]
        list: String,

        /// Post the daily reminder if one is due
        #[arg(long)]
        reminder: bool,

        /// Minutes west of UTC used for reminder days
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        tz_offset: i32,
    },

    /// Accept an item you received
    Accept { id: String },

    /// Complete an item
    Complete { id: String },

    /// Remove or decline an item
    Remove { id: String },

    /// Move an item you sent to the top of the receiver's list
    Bump { id: String },

    /// Change an item's title and description
    Edit {
        id: String,

        title: String,

        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// Give an item you own or sent to someone else
    Reassign { id: String, new_owner: String },

    /// Remove the top item of your list
    Pop,

    /// Show or change settings
    Settings {
        setting: Option<SettingName>,

        value: Option<Toggle>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SettingName {
    Summary,
    AllowIncoming,
}

#[derive(Clone, Copy, ValueEnum)]
enum Toggle {
    On,
    Off,
}

impl From<Toggle> for bool {
    fn from(toggle: Toggle) -> Self {
        matches!(toggle, Toggle::On)
    }
}

fn init_logging() {
    // LOG_FORMAT - "json" or "text" (default: "text")
    // RUST_LOG   - standard env filter (default: "taskbook=info")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "taskbook=info,taskbook_lists=info,taskbook_store=info".into());

    let registry = tracing_subscriber::registry().with(env_filter);
    if log_format == "json" {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_logging();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<Error>() {
                Some(err) if err.is_user_fault() => eprintln!("{}", err.user_message()),
                Some(err) => {
                    error!(error = %err, "Command failed");
                    eprintln!("{}", err.user_message());
                }
                None => eprintln!("Error: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if cli.user.is_empty() {
        anyhow::bail!("--user is required");
    }

    let config = TaskbookConfig::from_env()?;
    config.require_persistent_backend()?;
    info!(backend = %config.backend, user_id = %cli.user, "Starting taskbook");

    let service = config.build_service(Arc::new(IdentityDirectory)).await?;
    let mut events = service.events().subscribe();

    let result = execute(&service, &cli.user, cli.command).await;
    print_notifications(&mut events);
    result
}

async fn execute(service: &TaskService, user: &str, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Add {
            title,
            description,
            post_id,
        } => {
            let request = AddRequest {
                message: title,
                description,
                send_to: None,
                post_id,
            };
            print_add(service.add(user, request).await?);
        }
        Commands::Send {
            receiver,
            title,
            description,
            post_id,
        } => {
            let request = AddRequest {
                message: title,
                description,
                send_to: Some(receiver),
                post_id,
            };
            print_add(service.add(user, request).await?);
        }
        Commands::List {
            list,
            reminder,
            tz_offset,
        } => {
            let kind: ListKind = list.parse()?;
            let reminder = if reminder {
                Some(ReminderRequest::from_minutes_west(tz_offset)?)
            } else {
                None
            };
            let items = service.list(user, kind, reminder).await?;
            let header = match kind {
                ListKind::Own => "Book List:",
                ListKind::Incoming => "Received Book list:",
                ListKind::Outgoing => "Sent Book list:",
            };
            let offset = reminder.map(|r| r.offset).unwrap_or_else(|| Utc.fix());
            println!("{}\n{}", header, items_summary(&items, &offset));
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
        Commands::Accept { id } => {
            let accepted = service.accept(user, &id).await?;
            println!("Accepted Book: {}", accepted.title);
        }
        Commands::Complete { id } => {
            let completed = service.complete(user, &id).await?;
            let title = completed.item.map(|i| i.title).unwrap_or_default();
            println!("Completed Book: {}", title);
            print_warnings(&completed.warnings);
        }
        Commands::Remove { id } => {
            let removed = service.remove(user, &id).await?;
            let title = removed.item.map(|i| i.title).unwrap_or_default();
            println!("Removed Book: {}", title);
            print_warnings(&removed.warnings);
        }
        Commands::Bump { id } => {
            let bumped = service.bump(user, &id).await?;
            println!("Bumped Book: {}", bumped.title);
        }
        Commands::Edit {
            id,
            title,
            description,
        } => {
            let edited = service.edit(user, &id, &title, &description).await?;
            println!("Edited Book from:\n{}\nTo:\n{}", edited.old_title, title);
            print_warnings(&edited.warnings);
        }
        Commands::Reassign { id, new_owner } => {
            let reassigned = service.reassign(user, &id, &new_owner).await?;
            println!("Reassigned Book: {}", reassigned.title);
            print_warnings(&reassigned.warnings);
        }
        Commands::Pop => match service.pop(user).await {
            Ok(popped) => {
                println!("Removed top Book.");
                print_warnings(&popped.warnings);
            }
            Err(Error::EmptyList(_)) => println!("There are no Books to pop."),
            Err(e) => return Err(e.into()),
        },
        Commands::Settings { setting, value } => {
            settings(service, user, setting, value).await?;
        }
    }
    Ok(())
}

async fn settings(
    service: &TaskService,
    user: &str,
    setting: Option<SettingName>,
    value: Option<Toggle>,
) -> anyhow::Result<()> {
    let current = service.settings(user).await;
    match (setting, value) {
        (None, _) => println!("{}", current),
        (Some(SettingName::Summary), None) => {
            println!("{}", Settings::reminder_text(current.reminder))
        }
        (Some(SettingName::AllowIncoming), None) => {
            println!("{}", Settings::allow_incoming_text(current.allow_incoming))
        }
        (Some(SettingName::Summary), Some(toggle)) => {
            service.set_reminder(user, toggle.into()).await?;
            match toggle {
                Toggle::On => println!("You will start receiving daily summaries."),
                Toggle::Off => println!("You will stop receiving daily summaries."),
            }
        }
        (Some(SettingName::AllowIncoming), Some(toggle)) => {
            service.set_allow_incoming(user, toggle.into()).await?;
            match toggle {
                Toggle::On => println!("Other users can send task for you to accept/decline"),
                Toggle::Off => println!(
                    "Other users cannot send you task request. They will see a message saying you have blocked incoming task requests"
                ),
            }
        }
    }
    Ok(())
}

fn print_add(outcome: AddOutcome) {
    match outcome {
        AddOutcome::Added(item) => println!("Added Book. ({})", item.id),
        AddOutcome::Sent { receiver, item_id } => {
            println!("Book sent to @{}. ({})", receiver, item_id)
        }
        AddOutcome::Blocked { receiver } => println!("@{} has blocked Book requests", receiver),
    }
}

fn print_warnings(warnings: &[taskbook_core::CleanupWarning]) {
    for warning in warnings {
        eprintln!("warning: {}", warning);
    }
}

fn print_notifications(events: &mut Receiver<NotificationEnvelope>) {
    while let Ok(envelope) = events.try_recv() {
        match serde_json::to_string(&envelope) {
            Ok(json) => println!("{}", json),
            Err(e) => error!(error = %e, "Unable to serialize notification"),
        }
    }
}
