//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::model::Role;

/// Login credentials for commands that act on behalf of a user.
#[derive(Debug, Clone, Args)]
pub struct Credentials {
    /// Username to log in as
    #[arg(short, long, env = "AIRDESK_USER")]
    pub user: String,

    /// Password for the user
    #[arg(short, long, env = "AIRDESK_PASSWORD", hide_env_values = true)]
    pub password: String,
}

/// Sign-up arguments.
#[derive(Debug, Args)]
pub struct SignupCommand {
    /// New username
    pub username: String,

    /// Password for the new account
    #[arg(short, long, env = "AIRDESK_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Account role
    #[arg(short, long, value_enum, default_value = "passenger")]
    pub role: RoleArg,
}

/// Account role argument.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum RoleArg {
    /// Books and cancels own reservations
    #[default]
    Passenger,
    /// Manages flights and passenger lists
    Admin,
}

impl From<RoleArg> for Role {
    fn from(arg: RoleArg) -> Self {
        match arg {
            RoleArg::Passenger => Self::Passenger,
            RoleArg::Admin => Self::Admin,
        }
    }
}

/// Flight management commands.
#[derive(Debug, Subcommand)]
pub enum FlightsCommand {
    /// List all flights with remaining seats
    List {
        /// Mark flights already booked by this user
        #[arg(long, value_name = "USER")]
        reserved_by: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Schedule a new flight (admin)
    Add(AddFlightCommand),

    /// Delete a flight (admin); its reservations are kept
    Delete {
        /// Administrator credentials
        #[command(flatten)]
        auth: Credentials,

        /// Flight identifier
        id: String,
    },

    /// Search flights by origin, destination and date
    Search(SearchCommand),

    /// Show seats taken and left on one flight
    Availability {
        /// Flight identifier
        id: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },
}

/// Add-flight arguments.
#[derive(Debug, Args)]
pub struct AddFlightCommand {
    /// Administrator credentials
    #[command(flatten)]
    pub auth: Credentials,

    /// Flight identifier
    pub id: String,

    /// Departure city
    #[arg(long = "from", value_name = "CITY")]
    pub origin: String,

    /// Arrival city
    #[arg(long = "to", value_name = "CITY")]
    pub destination: String,

    /// Departure date (YYYY-MM-DD)
    #[arg(long)]
    pub date: String,

    /// Departure time (HH:MM)
    #[arg(long)]
    pub time: String,

    /// Number of seats
    #[arg(long)]
    pub capacity: String,
}

/// Search command arguments. At least one filter is required.
#[derive(Debug, Args)]
pub struct SearchCommand {
    /// Departure city (case-insensitive)
    #[arg(long = "from", value_name = "CITY")]
    pub origin: Option<String>,

    /// Arrival city (case-insensitive)
    #[arg(long = "to", value_name = "CITY")]
    pub destination: Option<String>,

    /// Departure date (YYYY-MM-DD, exact)
    #[arg(long)]
    pub date: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Arguments for commands that name one flight on behalf of the logged-in user.
#[derive(Debug, Args)]
pub struct BookingCommand {
    /// Credentials of the acting user
    #[command(flatten)]
    pub auth: Credentials,

    /// Flight identifier
    pub flight_id: String,
}

/// List reservations.
#[derive(Debug, Args)]
pub struct ReservationsCommand {
    /// Credentials of the acting user
    #[command(flatten)]
    pub auth: Credentials,

    /// Whose reservations to list (admin only for other users)
    #[arg(long, value_name = "USER")]
    pub of: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// List passengers of a flight (admin).
#[derive(Debug, Args)]
pub struct PassengersCommand {
    /// Administrator credentials
    #[command(flatten)]
    pub auth: Credentials,

    /// Flight identifier
    pub flight_id: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Manage bookings on behalf of passengers (admin).
#[derive(Debug, Subcommand)]
pub enum PassengerCommand {
    /// Book a seat for a registered user
    Add {
        /// Administrator credentials
        #[command(flatten)]
        auth: Credentials,

        /// Passenger username
        username: String,

        /// Flight identifier
        flight_id: String,
    },

    /// Cancel a registered user's booking
    Remove {
        /// Administrator credentials
        #[command(flatten)]
        auth: Credentials,

        /// Passenger username
        username: String,

        /// Flight identifier
        flight_id: String,
    },
}

/// Stats command arguments.
#[derive(Debug, Args)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },
}

/// Output format for listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned plain text
    #[default]
    Plain,
    /// JSON
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Plain);
    }

    #[test]
    fn test_role_arg_maps_to_role() {
        assert_eq!(Role::from(RoleArg::default()), Role::Passenger);
        assert_eq!(Role::from(RoleArg::Admin), Role::Admin);
    }

    #[test]
    fn test_output_format_value_names() {
        let names: Vec<_> = OutputFormat::value_variants()
            .iter()
            .filter_map(|v| v.to_possible_value())
            .map(|v| v.get_name().to_string())
            .collect();
        assert_eq!(names, ["plain", "json"]);
    }
}
