use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{FormEvent, FormField, SelectionForm, SlotClient, SlotController};
use shared::protocol::BookingRequest;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Args {
    #[arg(long, default_value = "http://127.0.0.1:5000")]
    server_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fill the form and print the time selector it ends up with.
    Slots {
        #[arg(long, default_value = "")]
        mentor: String,
        #[arg(long, default_value = "")]
        date: String,
        /// Also pick a round, which re-queries through the round endpoint.
        #[arg(long)]
        round: Option<String>,
        /// Field ids (mentor, date, time, round) whose change events are
        /// fired, in order. Defaults to date, then round when one is given.
        #[arg(long = "fire", value_parser = parse_field)]
        fire: Vec<FormField>,
    },
    Schedule,
    Book {
        #[arg(long)]
        user_name: String,
        #[arg(long)]
        technology: String,
        #[arg(long)]
        company_name: String,
        #[arg(long)]
        round: String,
        #[arg(long)]
        mentor: String,
        #[arg(long)]
        date: String,
        #[arg(long)]
        time: String,
        #[arg(long)]
        invite_link: String,
    },
    Cancel {
        unique_code: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();
    let client = SlotClient::new(&args.server_url)
        .with_context(|| format!("bad server url '{}'", args.server_url))?;

    match args.command {
        Command::Slots {
            mentor,
            date,
            round,
            fire,
        } => fill_form(client, mentor, date, round, fire).await?,
        Command::Schedule => {
            let overview = client.schedule().await?;
            println!("dates: {}", overview.dates.join(", "));
            for schedule in &overview.mentor_time_slots {
                println!("{}: {}", schedule.mentor, schedule.slots.join(", "));
            }
            for booking in &overview.bookings {
                println!(
                    "{} {} {} -> {} ({}, {})",
                    booking.mentor,
                    booking.date,
                    booking.time_slot,
                    booking.user_name,
                    booking.round,
                    booking.status.as_str()
                );
            }
        }
        Command::Book {
            user_name,
            technology,
            company_name,
            round,
            mentor,
            date,
            time,
            invite_link,
        } => {
            let response = client
                .book(&BookingRequest {
                    user_name,
                    technology,
                    company_name,
                    round_name: round,
                    mentor,
                    date,
                    time,
                    invite_link,
                })
                .await?;
            println!("{}", response.message);
        }
        Command::Cancel { unique_code } => {
            let response = client.cancel(&unique_code).await?;
            println!("{}", response.message);
        }
    }

    Ok(())
}

fn parse_field(id: &str) -> Result<FormField, String> {
    FormField::from_id(id).ok_or_else(|| format!("unknown form field '{id}'"))
}

async fn fill_form(
    client: SlotClient,
    mentor: String,
    date: String,
    round: Option<String>,
    mut fire: Vec<FormField>,
) -> Result<()> {
    let form = Arc::new(SelectionForm::new());
    let controller = SlotController::bind(client, Arc::clone(&form))?;

    if fire.is_empty() {
        fire.push(FormField::Date);
        if round.is_some() {
            fire.push(FormField::Round);
        }
    }
    form.set(FormField::Mentor, mentor);
    form.set(FormField::Date, date);
    if let Some(round) = round {
        form.set(FormField::Round, round);
    }

    for field in fire {
        if let Some(refresh) = controller.dispatch(FormEvent::Changed(field)) {
            refresh.settled().await;
        }
    }

    let options = form.time_options();
    info!(count = options.len(), "time selector refreshed");
    for option in options {
        println!("{}", option.label);
    }
    Ok(())
}
