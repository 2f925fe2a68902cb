//! `airdesk` - command-line shell for the flight booking store.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;

use airdesk::cli::{
    Cli, Command, ConfigCommand, Credentials, FlightsCommand, OutputFormat, PassengerCommand,
};
use airdesk::model::{Flight, FlightDraft, Reservation, TIMESTAMP_FORMAT};
use airdesk::query::{FlightQuery, FlightStatus};
use airdesk::{init_logging, Airline, Config, Session};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbosity());

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    match cli.command {
        Command::Config(cmd) => handle_config(&config, cmd),
        command => handle_store(&config, command),
    }
}

fn handle_store(config: &Config, command: Command) -> anyhow::Result<()> {
    let airline = Airline::open(config)
        .with_context(|| format!("opening data directory {}", config.data_dir().display()))?;

    match command {
        Command::Signup(cmd) => {
            let user = airline.signup(&cmd.username, &cmd.password, cmd.role.into())?;
            println!("Created {} account '{}'.", user.role, user.username);
        }
        Command::Login(auth) => {
            let session = login(&airline, &auth)?;
            println!("Logged in as '{}' ({}).", session.username, session.role);
        }
        Command::Flights(cmd) => handle_flights(&airline, cmd)?,
        Command::Reserve(cmd) => {
            let session = login(&airline, &cmd.auth)?;
            let reservation = airline.reserve(&session, &cmd.flight_id)?;
            println!(
                "Reserved flight '{}' for '{}'.",
                reservation.flight_id, reservation.username
            );
        }
        Command::Cancel(cmd) => {
            let session = login(&airline, &cmd.auth)?;
            airline.cancel_reservation(&session, &cmd.flight_id)?;
            println!("Cancelled reservation on flight '{}'.", cmd.flight_id);
        }
        Command::Reservations(cmd) => {
            let session = login(&airline, &cmd.auth)?;
            let username = cmd.of.as_deref().unwrap_or(&session.username);
            let reservations = airline.reservations_of(&session, username)?;
            print_reservations(&reservations, cmd.format)?;
        }
        Command::Passengers(cmd) => {
            let session = login(&airline, &cmd.auth)?;
            let reservations = airline.passengers_of(&session, &cmd.flight_id)?;
            print_reservations(&reservations, cmd.format)?;
        }
        Command::Passenger(cmd) => handle_passenger(&airline, cmd)?,
        Command::Stats(cmd) => {
            let stats = airline.stats()?;
            if cmd.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("Users:                 {}", stats.users);
                println!("Flights:               {}", stats.flights);
                println!("Reservations:          {}", stats.reservations);
                println!("Orphaned reservations: {}", stats.orphaned_reservations);
            }
        }
        Command::Config(cmd) => handle_config(config, cmd)?,
    }
    Ok(())
}

fn login(airline: &Airline, auth: &Credentials) -> airdesk::Result<Session> {
    airline.login(&auth.user, &auth.password)
}

fn handle_flights(airline: &Airline, cmd: FlightsCommand) -> anyhow::Result<()> {
    match cmd {
        FlightsCommand::List {
            reserved_by,
            format,
        } => {
            let statuses = airline.list_flights_with_availability()?;
            if format == OutputFormat::Json {
                return print_json(&statuses);
            }
            for status in &statuses {
                let marker = match &reserved_by {
                    Some(user) if airline.has_reservation(user, &status.flight.id)? => " *",
                    _ => "",
                };
                println!("{}{marker}", status_line(status));
            }
        }
        FlightsCommand::Add(cmd) => {
            let session = login(airline, &cmd.auth)?;
            let draft = FlightDraft::new(
                cmd.id,
                cmd.origin,
                cmd.destination,
                cmd.date,
                cmd.time,
                cmd.capacity,
            );
            let flight = airline.add_flight(&session, &draft)?;
            println!("Added flight '{}'.", flight.id);
        }
        FlightsCommand::Delete { auth, id } => {
            let session = login(airline, &auth)?;
            airline.delete_flight(&session, &id)?;
            println!("Deleted flight '{id}'.");
        }
        FlightsCommand::Search(cmd) => {
            let mut query = FlightQuery::new();
            if let Some(origin) = &cmd.origin {
                query = query.origin(origin);
            }
            if let Some(destination) = &cmd.destination {
                query = query.destination(destination);
            }
            if let Some(date) = &cmd.date {
                query = query.date(date);
            }
            let flights = airline.search_flights(&query)?;
            print_flights(&flights, cmd.format)?;
        }
        FlightsCommand::Availability { id, format } => {
            let status = airline.availability(&id)?;
            if format == OutputFormat::Json {
                return print_json(&status);
            }
            println!("{}", status_line(&status));
        }
    }
    Ok(())
}

fn handle_passenger(airline: &Airline, cmd: PassengerCommand) -> anyhow::Result<()> {
    match cmd {
        PassengerCommand::Add {
            auth,
            username,
            flight_id,
        } => {
            let session = login(airline, &auth)?;
            airline.admin_add_passenger(&session, &username, &flight_id)?;
            println!("Added '{username}' to flight '{flight_id}'.");
        }
        PassengerCommand::Remove {
            auth,
            username,
            flight_id,
        } => {
            let session = login(airline, &auth)?;
            airline.admin_remove_passenger(&session, &username, &flight_id)?;
            println!("Removed '{username}' from flight '{flight_id}'.");
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Data directory:     {}", config.data_dir().display());
                println!("  Users table:        {}", config.users_path().display());
                println!("  Flights table:      {}", config.flights_path().display());
                println!(
                    "  Reservations table: {}",
                    config.reservations_path().display()
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            Config::load_from(Some(path))?;
            println!("Configuration is valid.");
        }
    }
    Ok(())
}

fn flight_line(flight: &Flight) -> String {
    format!(
        "{:<8} {:<16} {:<16} {} {}",
        flight.id, flight.origin, flight.destination, flight.date, flight.time
    )
}

fn status_line(status: &FlightStatus) -> String {
    let seats = match status.remaining {
        Some(remaining) => format!("{remaining} of {} seats left", status.flight.capacity),
        None => format!("invalid capacity '{}'", status.flight.capacity),
    };
    format!("{}  {seats}", flight_line(&status.flight))
}

fn print_flights(flights: &[Flight], format: OutputFormat) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        return print_json(flights);
    }
    if flights.is_empty() {
        println!("No flights found.");
    }
    for flight in flights {
        println!("{}", flight_line(flight));
    }
    Ok(())
}

fn print_reservations(reservations: &[Reservation], format: OutputFormat) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        return print_json(reservations);
    }
    if reservations.is_empty() {
        println!("No reservations.");
    }
    for r in reservations {
        let at = r
            .timestamp
            .map(|t| t.format(TIMESTAMP_FORMAT).to_string())
            .unwrap_or_default();
        println!("{:<16} {:<8} {at}", r.username, r.flight_id);
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
