use clap::{Parser, Subcommand};
use tracing::{error, info};

use crate::api::AppState;
use crate::queue::NewJob;
use crate::scrape::Segment;

/// Leaderboard scrape service
#[derive(Parser, Debug)]
#[command(name = "leaderboard-scraper", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Start the HTTP server and polling workers (default)
    Serve,
    /// Apply database migrations and exit
    Migrate,
    /// Queue a scrape job for a profile
    Enqueue {
        #[arg(long)]
        profile: String,
        /// Segment as leaderboard:stage; repeat for several. Omit to use DEFAULT_SEGMENTS
        #[arg(long = "segment")]
        segments: Vec<Segment>,
    },
    /// Consume one job from the queue and exit
    RunOnce,
}

/// Execute a one-shot command; `Serve` is handled by the caller
pub async fn run(command: Command, state: &AppState) -> std::io::Result<()> {
    match command {
        Command::Serve => Ok(()),
        Command::Migrate => {
            info!("Migrations are up to date");
            Ok(())
        }
        Command::Enqueue { profile, segments } => {
            let job = state
                .queue
                .enqueue(NewJob { profile, segments })
                .await
                .map_err(std::io::Error::other)?;
            info!("Queued job {} for {}", job.id, job.profile);
            println!("{}", serde_json::to_string_pretty(&job)?);
            Ok(())
        }
        Command::RunOnce => match state.consumer.run_cycle().await {
            Ok(Some(summary)) => {
                println!("{}", serde_json::to_string_pretty(&summary)?);
                Ok(())
            }
            Ok(None) => {
                info!("No job available");
                Ok(())
            }
            Err(e) => {
                error!("Consumer cycle failed: {}", e);
                Err(std::io::Error::other(e))
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["leaderboard-scraper"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn enqueue_accepts_repeated_segments() {
        let cli = Cli::try_parse_from([
            "leaderboard-scraper",
            "enqueue",
            "--profile",
            "Jonathan",
            "--segment",
            "daily:1",
            "--segment",
            "weekly:3",
        ])
        .unwrap();

        assert_eq!(
            cli.command,
            Some(Command::Enqueue {
                profile: "Jonathan".into(),
                segments: vec![Segment::new("daily", "1"), Segment::new("weekly", "3")],
            })
        );
    }

    #[test]
    fn malformed_segment_is_rejected() {
        let result = Cli::try_parse_from(["leaderboard-scraper", "enqueue", "--profile", "Ana", "--segment", "daily"]);
        assert!(result.is_err());
    }
}
