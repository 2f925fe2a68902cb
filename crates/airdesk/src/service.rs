//! Session-based call surface used by the shell.
//!
//! [`Airline`] owns the three repositories and exposes every user-facing
//! operation. Passenger operations act on the session's own username;
//! administrator operations check the session's role first.

use std::path::Path;

use tracing::{info, warn};

use crate::config::Config;
use crate::engine::ReservationEngine;
use crate::error::{Error, Result};
use crate::model::{Flight, FlightDraft, Reservation, Role, Session, User};
use crate::query::{FlightQuery, FlightStatus, Queries, StoreStats};
use crate::repository::{Flights, Reservations, Users};

/// File names used by [`Airline::open_dir`].
const USERS_FILE: &str = "users.csv";
const FLIGHTS_FILE: &str = "flights.csv";
const RESERVATIONS_FILE: &str = "reservations.csv";

/// The booking store: users, flights and reservations.
#[derive(Debug)]
pub struct Airline {
    users: Users,
    flights: Flights,
    reservations: Reservations,
}

impl Airline {
    /// Open the store at the paths named by `config`, creating the data
    /// directory and any missing table.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DirectoryCreate`] if the data directory cannot be
    /// created, or a storage error if a table cannot be opened.
    pub fn open(config: &Config) -> Result<Self> {
        let data_dir = config.data_dir();
        create_dir(&data_dir)?;
        Self::open_paths(
            &config.users_path(),
            &config.flights_path(),
            &config.reservations_path(),
        )
    }

    /// Open the store in `dir` with the default file names.
    ///
    /// # Errors
    ///
    /// Same as [`open`](Self::open).
    pub fn open_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        create_dir(dir)?;
        Self::open_paths(
            &dir.join(USERS_FILE),
            &dir.join(FLIGHTS_FILE),
            &dir.join(RESERVATIONS_FILE),
        )
    }

    fn open_paths(users: &Path, flights: &Path, reservations: &Path) -> Result<Self> {
        let airline = Self {
            users: Users::open(users)?,
            flights: Flights::open(flights)?,
            reservations: Reservations::open(reservations)?,
        };
        info!(
            "Opened store ({}, {}, {})",
            users.display(),
            flights.display(),
            reservations.display()
        );
        Ok(airline)
    }

    /// The reservation engine over this store.
    #[must_use]
    pub fn engine(&self) -> ReservationEngine<'_> {
        ReservationEngine::new(&self.users, &self.flights, &self.reservations)
    }

    /// Read-only queries over this store.
    #[must_use]
    pub fn queries(&self) -> Queries<'_> {
        Queries::new(&self.flights, &self.reservations)
    }

    /// Check credentials and start a session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCredentials`] on an unknown user or wrong
    /// password.
    pub fn login(&self, username: &str, password: &str) -> Result<Session> {
        let user = self.users.verify(username.trim(), password)?;
        info!("'{}' logged in as {}", user.username, user.role);
        Ok(Session::from(&user))
    }

    /// Register a new account with the chosen role.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if a field is blank, or
    /// [`Error::AlreadyExists`] if the username is taken.
    pub fn signup(&self, username: &str, password: &str, role: Role) -> Result<User> {
        let user = User::new(username, password, role)?;
        self.users.insert(&user)?;
        Ok(user)
    }

    /// Every flight in stored order.
    ///
    /// # Errors
    ///
    /// Returns an error if the flights table cannot be read.
    pub fn list_flights(&self) -> Result<Vec<Flight>> {
        self.flights.list_all()
    }

    /// Every flight with its occupancy and remaining seats.
    ///
    /// # Errors
    ///
    /// Returns an error if a table cannot be read.
    pub fn list_flights_with_availability(&self) -> Result<Vec<FlightStatus>> {
        self.queries().flights_with_availability()
    }

    /// Schedule a new flight.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotPermitted`] for passenger sessions,
    /// [`Error::InvalidInput`] if the draft does not validate, or
    /// [`Error::AlreadyExists`] if the id is taken.
    pub fn add_flight(&self, session: &Session, draft: &FlightDraft) -> Result<Flight> {
        session.require_admin("add flight")?;
        let flight = draft.validate()?;
        self.flights.insert(&flight)?;
        Ok(flight)
    }

    /// Remove a flight.
    ///
    /// Reservations on it are kept and become orphaned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotPermitted`] for passenger sessions, or
    /// [`Error::NotFound`] if no flight has the id.
    pub fn delete_flight(&self, session: &Session, flight_id: &str) -> Result<()> {
        session.require_admin("delete flight")?;
        self.flights.delete(flight_id)?;
        let orphaned = self.queries().passengers_of(flight_id)?.len();
        if orphaned > 0 {
            warn!(
                "Flight '{}' deleted with {} reservations still on it",
                flight_id, orphaned
            );
        }
        Ok(())
    }

    /// Search flights by origin, destination and date.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoCriteria`] if the query is empty.
    pub fn search_flights(&self, query: &FlightQuery) -> Result<Vec<Flight>> {
        self.queries().search_flights(query)
    }

    /// Book a seat for the session's user.
    ///
    /// # Errors
    ///
    /// See [`ReservationEngine::reserve`].
    pub fn reserve(&self, session: &Session, flight_id: &str) -> Result<Reservation> {
        self.engine().reserve(&session.username, flight_id)
    }

    /// Cancel the session user's booking on a flight.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the user holds no booking on it.
    pub fn cancel_reservation(&self, session: &Session, flight_id: &str) -> Result<()> {
        self.engine().cancel(&session.username, flight_id)
    }

    /// Bookings held by `username`.
    ///
    /// Passengers may only list their own.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotPermitted`] if a passenger asks for another
    /// user's bookings.
    pub fn reservations_of(&self, session: &Session, username: &str) -> Result<Vec<Reservation>> {
        if username != session.username {
            session.require_admin("list another user's reservations")?;
        }
        self.queries().reservations_of(username)
    }

    /// Bookings on `flight_id`, including orphaned ones.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotPermitted`] for passenger sessions.
    pub fn passengers_of(&self, session: &Session, flight_id: &str) -> Result<Vec<Reservation>> {
        session.require_admin("list passengers")?;
        self.queries().passengers_of(flight_id)
    }

    /// Book a seat on behalf of a registered user.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotPermitted`] for passenger sessions, otherwise see
    /// [`ReservationEngine::admin_add_passenger`].
    pub fn admin_add_passenger(
        &self,
        session: &Session,
        username: &str,
        flight_id: &str,
    ) -> Result<Reservation> {
        session.require_admin("add passenger")?;
        self.engine().admin_add_passenger(username, flight_id)
    }

    /// Cancel a booking on behalf of a registered user.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotPermitted`] for passenger sessions, otherwise see
    /// [`ReservationEngine::admin_remove_passenger`].
    pub fn admin_remove_passenger(
        &self,
        session: &Session,
        username: &str,
        flight_id: &str,
    ) -> Result<()> {
        session.require_admin("remove passenger")?;
        self.engine().admin_remove_passenger(username, flight_id)
    }

    /// Whether `username` holds a booking on `flight_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the reservations table cannot be read.
    pub fn has_reservation(&self, username: &str, flight_id: &str) -> Result<bool> {
        self.queries().has_reservation(username, flight_id)
    }

    /// Occupancy and remaining seats of one flight.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FlightNotFound`] if the flight does not exist.
    pub fn availability(&self, flight_id: &str) -> Result<FlightStatus> {
        self.queries().availability(flight_id)
    }

    /// Record counts across the store.
    ///
    /// # Errors
    ///
    /// Returns an error if a table cannot be read.
    pub fn stats(&self) -> Result<StoreStats> {
        let users = self.users.read();
        let users = users.records()?.len();
        Ok(StoreStats {
            users,
            ..self.queries().partial_stats()?
        })
    }
}

fn create_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| Error::DirectoryCreate {
        path: dir.to_path_buf(),
        source: e,
    })
}
