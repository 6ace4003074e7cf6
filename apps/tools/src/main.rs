use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use shared::domain::{BookingId, BookingStatus};
use storage::Storage;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "sqlite://./data/bookings.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    ListBookings,
    /// Mark a booking as open again without deleting it.
    Release {
        booking_id: i64,
    },
    Cancel {
        unique_code: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;

    match cli.command {
        Command::ListBookings => {
            for booking in storage.list_bookings().await? {
                println!(
                    "#{} {} {} {} user={} round={} status={} code={}",
                    booking.booking_id.0,
                    booking.mentor,
                    booking.date,
                    booking.time_slot,
                    booking.user_name,
                    booking.round,
                    booking.status.as_str(),
                    booking.unique_code.as_deref().unwrap_or("-")
                );
            }
        }
        Command::Release { booking_id } => {
            if !storage
                .set_booking_status(BookingId(booking_id), BookingStatus::Available)
                .await?
            {
                bail!("booking {booking_id} not found");
            }
            println!("released booking_id={booking_id}");
        }
        Command::Cancel { unique_code } => match storage.delete_booking_by_code(&unique_code).await? {
            Some(booking_id) => println!("canceled booking_id={}", booking_id.0),
            None => bail!("no booking with code {unique_code}"),
        },
    }

    Ok(())
}
