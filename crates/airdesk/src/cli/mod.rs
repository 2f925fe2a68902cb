//! Command-line interface for airdesk.
//!
//! This module provides the argument model for the `airdesk` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    AddFlightCommand, BookingCommand, ConfigCommand, Credentials, FlightsCommand, OutputFormat,
    PassengerCommand, PassengersCommand, ReservationsCommand, RoleArg, SearchCommand,
    SignupCommand, StatsCommand,
};

use crate::logging::Verbosity;

/// airdesk - Book seats on scheduled flights
///
/// Passengers sign up, search flights and reserve seats; administrators
/// schedule flights and manage passengers. All data lives in three CSV
/// tables in the data directory.
#[derive(Debug, Parser)]
#[command(name = "airdesk")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for info, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create an account (passenger unless --role admin)
    Signup(SignupCommand),

    /// Check credentials and show the account's role
    Login(Credentials),

    /// List, add, delete and search flights
    #[command(subcommand)]
    Flights(FlightsCommand),

    /// Reserve a seat on a flight
    Reserve(BookingCommand),

    /// Cancel your reservation on a flight
    Cancel(BookingCommand),

    /// List reservations
    Reservations(ReservationsCommand),

    /// List passengers booked on a flight (admin)
    Passengers(PassengersCommand),

    /// Book or cancel on behalf of a passenger (admin)
    #[command(subcommand)]
    Passenger(PassengerCommand),

    /// Show record counts
    Stats(StatsCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_name() {
        let cli = Cli::command();
        assert_eq!(cli.get_name(), "airdesk");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_flags() {
        assert_eq!(parse(&["airdesk", "stats"]).verbosity(), Verbosity::Normal);
        assert_eq!(
            parse(&["airdesk", "-v", "stats"]).verbosity(),
            Verbosity::Verbose
        );
        assert_eq!(
            parse(&["airdesk", "-vv", "stats"]).verbosity(),
            Verbosity::Trace
        );
        assert_eq!(
            parse(&["airdesk", "-q", "stats"]).verbosity(),
            Verbosity::Quiet
        );
    }

    #[test]
    fn test_parse_with_config() {
        let cli = parse(&["airdesk", "-c", "/custom/config.toml", "stats"]);
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }

    #[test]
    fn test_parse_signup() {
        let cli = parse(&["airdesk", "signup", "alice", "--password", "pw"]);
        match cli.command {
            Command::Signup(cmd) => {
                assert_eq!(cmd.username, "alice");
                assert_eq!(cmd.password, "pw");
                assert_eq!(cmd.role, RoleArg::Passenger);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_signup_admin() {
        let cli = parse(&["airdesk", "signup", "boss", "-p", "pw", "--role", "admin"]);
        assert!(matches!(
            cli.command,
            Command::Signup(SignupCommand {
                role: RoleArg::Admin,
                ..
            })
        ));
        let bad = Cli::try_parse_from(["airdesk", "signup", "x", "-p", "pw", "--role", "pilot"]);
        assert!(bad.is_err());
    }

    #[test]
    fn test_parse_flights_add() {
        let cli = parse(&[
            "airdesk", "flights", "add", "-u", "root", "-p", "secret", "F1", "--from", "Tehran",
            "--to", "Mashhad", "--date", "2025-01-01", "--time", "10:00", "--capacity", "2",
        ]);
        match cli.command {
            Command::Flights(FlightsCommand::Add(cmd)) => {
                assert_eq!(cmd.auth.user, "root");
                assert_eq!(cmd.id, "F1");
                assert_eq!(cmd.origin, "Tehran");
                assert_eq!(cmd.destination, "Mashhad");
                assert_eq!(cmd.capacity, "2");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_flights_search() {
        let cli = parse(&[
            "airdesk", "flights", "search", "--from", "tehran", "--format", "json",
        ]);
        match cli.command {
            Command::Flights(FlightsCommand::Search(cmd)) => {
                assert_eq!(cmd.origin.as_deref(), Some("tehran"));
                assert!(cmd.destination.is_none());
                assert_eq!(cmd.format, OutputFormat::Json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_reserve() {
        let cli = parse(&["airdesk", "reserve", "-u", "alice", "-p", "pw", "F1"]);
        match cli.command {
            Command::Reserve(cmd) => {
                assert_eq!(cmd.auth.user, "alice");
                assert_eq!(cmd.flight_id, "F1");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_passenger_remove() {
        let cli = parse(&[
            "airdesk", "passenger", "remove", "-u", "root", "-p", "secret", "alice", "F1",
        ]);
        assert!(matches!(
            cli.command,
            Command::Passenger(PassengerCommand::Remove { ref username, .. }) if username == "alice"
        ));
    }

    #[test]
    fn test_parse_config_validate() {
        let cli = parse(&["airdesk", "config", "validate", "/tmp/config.toml"]);
        assert!(matches!(
            cli.command,
            Command::Config(ConfigCommand::Validate { file: Some(_) })
        ));
    }

    #[test]
    fn test_parse_rejects_unknown_format() {
        let result = Cli::try_parse_from(["airdesk", "flights", "list", "--format", "xml"]);
        assert!(result.is_err());
    }
}
