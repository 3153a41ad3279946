use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;

mod client;

use client::{Guest, RsvpClient};

/// rsvp: manage events and guests on an RSVP server
#[derive(Parser, Debug)]
#[command(name = "rsvp")]
#[command(about = "Manage events and guests on an RSVP server", long_about = None)]
struct Cli {
    /// Base URL of the RSVP server
    #[arg(long, env = "RSVP_SERVER", default_value = "http://localhost:3000", global = true)]
    server: String,

    /// Organizer API token (printed by `rsvp register`)
    #[arg(long, env = "RSVP_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Register as an organizer and print the API token
    Register(RegisterArgs),
    /// Create an event
    CreateEvent(CreateEventArgs),
    /// List your events
    ListEvents,
    /// Invite a guest to an event by email
    Invite(InviteArgs),
    /// List the guests of an event
    Guests(EventArg),
    /// Show analytics for one event, or for all of your events
    Analytics(AnalyticsArgs),
    /// Email a reminder to every guest who has not responded
    Remind(EventArg),
    /// Download an event's guest list as CSV
    Export(ExportArgs),
}

#[derive(Parser, Debug)]
struct RegisterArgs {
    #[arg(long)]
    name: String,

    #[arg(long)]
    email: String,
}

#[derive(Parser, Debug)]
struct CreateEventArgs {
    #[arg(long)]
    title: String,

    /// Event start, RFC 3339 or YYYY-MM-DDTHH:MM (UTC)
    #[arg(long)]
    date: String,

    #[arg(long)]
    description: Option<String>,

    #[arg(long)]
    location: Option<String>,

    /// Meal choices offered to guests (repeatable)
    #[arg(long = "meal-option")]
    meal_options: Vec<String>,

    #[arg(long)]
    dress_code: Option<String>,

    #[arg(long)]
    additional_info: Option<String>,
}

#[derive(Parser, Debug)]
struct EventArg {
    /// Event id
    event_id: i64,
}

#[derive(Parser, Debug)]
struct InviteArgs {
    /// Event id
    event_id: i64,

    #[arg(long)]
    name: String,

    #[arg(long)]
    email: String,

    #[arg(long)]
    phone: Option<String>,
}

#[derive(Parser, Debug)]
struct AnalyticsArgs {
    /// Event id; omit for totals across all events
    event_id: Option<i64>,
}

#[derive(Parser, Debug)]
struct ExportArgs {
    /// Event id
    event_id: i64,

    /// Output file (defaults to the name suggested by the server)
    #[arg(long, short)]
    output: Option<PathBuf>,
}

impl CreateEventArgs {
    fn into_body(self) -> Value {
        json!({
            "title": self.title,
            "date": self.date,
            "description": self.description,
            "location": self.location,
            "custom_fields": {
                "meal_options": self.meal_options,
                "dress_code": self.dress_code,
                "additional_info": self.additional_info,
            }
        })
    }
}

fn format_guest(guest: &Guest) -> String {
    let plus_ones = if guest.plus_one_count > 0 {
        format!(" +{}", guest.plus_one_count)
    } else {
        String::new()
    };
    format!(
        "{}\t{}\t<{}>\t{}{}",
        guest.id, guest.name, guest.email, guest.status, plus_ones
    )
}

async fn run_register(client: &RsvpClient, args: RegisterArgs) -> Result<()> {
    let registration = client.register(&args.name, &args.email).await?;
    eprintln!(
        "Registered {}. Keep this token; it cannot be shown again.",
        registration.organizer["email"].as_str().unwrap_or(&args.email)
    );
    println!("{}", registration.api_token);
    Ok(())
}

async fn run_create_event(client: &RsvpClient, args: CreateEventArgs) -> Result<()> {
    let event = client.create_event(args.into_body()).await?;
    eprintln!("Created event '{}' on {}", event.title, event.date);
    println!("{}", event.id);
    Ok(())
}

async fn run_list_events(client: &RsvpClient) -> Result<()> {
    let events = client.list_events().await?;
    if events.is_empty() {
        eprintln!("No events.");
    }
    for event in events {
        println!(
            "{}\t{}\t{}\t{}",
            event.id,
            event.date,
            event.title,
            event.location.unwrap_or_default()
        );
    }
    Ok(())
}

async fn run_invite(client: &RsvpClient, args: InviteArgs) -> Result<()> {
    let body = json!({ "name": args.name, "email": args.email, "phone": args.phone });
    let invitation = client.invite(args.event_id, body).await?;
    if !invitation.email_sent {
        eprintln!(
            "Warning: invitation email to {} could not be sent; share the link manually.",
            invitation.guest.email
        );
    }
    println!("{}", invitation.rsvp_link);
    Ok(())
}

async fn run_guests(client: &RsvpClient, args: EventArg) -> Result<()> {
    for guest in client.list_guests(args.event_id).await? {
        println!("{}", format_guest(&guest));
    }
    Ok(())
}

async fn run_analytics(client: &RsvpClient, args: AnalyticsArgs) -> Result<()> {
    let analytics = client.analytics(args.event_id).await?;
    let pretty =
        serde_json::to_string_pretty(&analytics).context("Failed to format analytics")?;
    println!("{}", pretty);
    Ok(())
}

async fn run_remind(client: &RsvpClient, args: EventArg) -> Result<()> {
    let report = client.remind(args.event_id).await?;
    eprintln!("Reminders sent: {}, failed: {}", report.sent, report.failed);
    Ok(())
}

async fn run_export(client: &RsvpClient, args: ExportArgs) -> Result<()> {
    let (csv, suggested) = client.export(args.event_id).await?;
    let path = args
        .output
        .or_else(|| suggested.map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("guests.csv"));
    fs::write(&path, csv).with_context(|| format!("Failed to write {}", path.display()))?;
    eprintln!("Wrote {}", path.display());
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let http = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .context("Failed to create HTTP client")?;
    let client = RsvpClient::new(http, &cli.server, cli.token);

    match cli.command {
        Commands::Register(args) => run_register(&client, args).await,
        Commands::CreateEvent(args) => run_create_event(&client, args).await,
        Commands::ListEvents => run_list_events(&client).await,
        Commands::Invite(args) => run_invite(&client, args).await,
        Commands::Guests(args) => run_guests(&client, args).await,
        Commands::Analytics(args) => run_analytics(&client, args).await,
        Commands::Remind(args) => run_remind(&client, args).await,
        Commands::Export(args) => run_export(&client, args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_event_args() {
        let cli = Cli::try_parse_from([
            "rsvp",
            "--server",
            "http://rsvp.test",
            "--token",
            "abc",
            "create-event",
            "--title",
            "Picnic",
            "--date",
            "2026-06-01T12:00",
            "--meal-option",
            "Fish",
            "--meal-option",
            "Veg",
        ])
        .unwrap();
        assert_eq!(cli.server, "http://rsvp.test");
        assert_eq!(cli.token.as_deref(), Some("abc"));

        let Commands::CreateEvent(args) = cli.command else {
            panic!("expected create-event");
        };
        let body = args.into_body();
        assert_eq!(body["title"], "Picnic");
        assert_eq!(body["custom_fields"]["meal_options"], json!(["Fish", "Veg"]));
        assert_eq!(body["location"], Value::Null);
    }

    #[test]
    fn test_analytics_event_is_optional() {
        let cli = Cli::try_parse_from(["rsvp", "analytics"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Analytics(AnalyticsArgs { event_id: None })
        ));
    }

    #[test]
    fn test_format_guest() {
        let guest = Guest {
            id: 4,
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            status: "confirmed".to_string(),
            plus_one_count: 2,
        };
        assert_eq!(format_guest(&guest), "4\tAda\t<ada@example.com>\tconfirmed +2");
    }
}
