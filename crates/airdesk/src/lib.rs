//! `airdesk` - A flight booking record store
//!
//! Users, flights and reservations live in three comma-separated tables.
//! The library enforces the booking rules (no duplicate reservation, no
//! reservation beyond a flight's capacity) under concurrent use within one
//! process, and exposes a session-based call surface for the shell.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod model;
pub mod query;
pub mod repository;
pub mod service;
pub mod table;

pub use config::Config;
pub use engine::ReservationEngine;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use model::{Flight, FlightDraft, Reservation, ReservationKey, Role, Session, User};
pub use query::{FlightQuery, FlightStatus, Queries, StoreStats};
pub use repository::{Flights, Insertable, Record, Repository, Reservations, Users};
pub use service::Airline;
