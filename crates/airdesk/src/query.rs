//! Read-only queries used by the presentation layer.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{Flight, Reservation};
use crate::repository::{Flights, Reservations};

/// Criteria for a flight search.
///
/// Blank criteria are ignored. Origin and destination match case-insensitively;
/// the date matches exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlightQuery {
    origin: Option<String>,
    destination: Option<String>,
    date: Option<String>,
}

impl FlightQuery {
    /// An empty query. Searching with it fails with [`Error::NoCriteria`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to flights departing from `origin`.
    #[must_use]
    pub fn origin(mut self, origin: impl AsRef<str>) -> Self {
        self.origin = criterion(origin.as_ref()).map(str::to_lowercase);
        self
    }

    /// Restrict to flights arriving at `destination`.
    #[must_use]
    pub fn destination(mut self, destination: impl AsRef<str>) -> Self {
        self.destination = criterion(destination.as_ref()).map(str::to_lowercase);
        self
    }

    /// Restrict to flights departing on `date` (`YYYY-MM-DD`).
    #[must_use]
    pub fn date(mut self, date: impl AsRef<str>) -> Self {
        self.date = criterion(date.as_ref()).map(str::to_string);
        self
    }

    /// Whether no criterion is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.origin.is_none() && self.destination.is_none() && self.date.is_none()
    }

    /// Whether `flight` satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, flight: &Flight) -> bool {
        let field_is = |want: &Option<String>, have: &str, fold: bool| match want {
            None => true,
            Some(want) if fold => *want == have.trim().to_lowercase(),
            Some(want) => want == have.trim(),
        };
        field_is(&self.origin, &flight.origin, true)
            && field_is(&self.destination, &flight.destination, true)
            && field_is(&self.date, &flight.date, false)
    }
}

fn criterion(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

/// Seats taken and left on a flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlightStatus {
    /// The flight.
    pub flight: Flight,
    /// Reservations currently held on it.
    pub occupancy: usize,
    /// Seats left, or `None` if the stored capacity is invalid.
    pub remaining: Option<u32>,
}

impl FlightStatus {
    fn new(flight: Flight, reservations: &[Reservation]) -> Self {
        let occupancy = reservations
            .iter()
            .filter(|r| r.flight_id == flight.id)
            .count();
        let remaining = flight.seats().ok().map(|capacity| {
            capacity.saturating_sub(u32::try_from(occupancy).unwrap_or(u32::MAX))
        });
        Self {
            flight,
            occupancy,
            remaining,
        }
    }
}

/// Record counts across the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Registered users.
    pub users: usize,
    /// Scheduled flights.
    pub flights: usize,
    /// Reservations, including orphaned ones.
    pub reservations: usize,
    /// Reservations whose flight no longer exists.
    pub orphaned_reservations: usize,
}

/// Borrowed read-only view over flights and reservations.
#[derive(Debug, Clone, Copy)]
pub struct Queries<'a> {
    flights: &'a Flights,
    reservations: &'a Reservations,
}

impl<'a> Queries<'a> {
    /// Create a query view over the given repositories.
    #[must_use]
    pub fn new(flights: &'a Flights, reservations: &'a Reservations) -> Self {
        Self {
            flights,
            reservations,
        }
    }

    /// Flights satisfying `query`, in stored order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoCriteria`] if the query is empty, or a storage
    /// error if the flights table cannot be read.
    pub fn search_flights(&self, query: &FlightQuery) -> Result<Vec<Flight>> {
        if query.is_empty() {
            return Err(Error::NoCriteria);
        }
        Ok(self
            .flights
            .list_all()?
            .into_iter()
            .filter(|f| query.matches(f))
            .collect())
    }

    /// Reservations held by `username`, in stored order.
    ///
    /// # Errors
    ///
    /// Returns an error if the reservations table cannot be read.
    pub fn reservations_of(&self, username: &str) -> Result<Vec<Reservation>> {
        Ok(self
            .reservations
            .list_all()?
            .into_iter()
            .filter(|r| r.username == username)
            .collect())
    }

    /// Reservations on `flight_id`, in stored order.
    ///
    /// Works for deleted flights too, returning their orphaned reservations.
    ///
    /// # Errors
    ///
    /// Returns an error if the reservations table cannot be read.
    pub fn passengers_of(&self, flight_id: &str) -> Result<Vec<Reservation>> {
        Ok(self
            .reservations
            .list_all()?
            .into_iter()
            .filter(|r| r.flight_id == flight_id)
            .collect())
    }

    /// Whether `username` holds a reservation on `flight_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the reservations table cannot be read.
    pub fn has_reservation(&self, username: &str, flight_id: &str) -> Result<bool> {
        Ok(self
            .reservations
            .list_all()?
            .iter()
            .any(|r| r.username == username && r.flight_id == flight_id))
    }

    /// Occupancy and remaining seats of one flight.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FlightNotFound`] if the flight does not exist, or a
    /// storage error if a table cannot be read.
    pub fn availability(&self, flight_id: &str) -> Result<FlightStatus> {
        let flights = self.flights.read();
        let reservations = self.reservations.read();
        let flight = flights
            .find(flight_id)?
            .ok_or_else(|| Error::FlightNotFound(flight_id.to_string()))?;
        Ok(FlightStatus::new(flight, &reservations.records()?))
    }

    /// Every flight with its occupancy, in stored order.
    ///
    /// # Errors
    ///
    /// Returns an error if a table cannot be read.
    pub fn flights_with_availability(&self) -> Result<Vec<FlightStatus>> {
        let flights = self.flights.read();
        let reservations = self.reservations.read();
        let reservations = reservations.records()?;
        Ok(flights
            .records()?
            .into_iter()
            .map(|f| FlightStatus::new(f, &reservations))
            .collect())
    }

    /// Counts of flights, reservations and orphaned reservations.
    ///
    /// `users` is left at zero; the caller fills it in.
    pub(crate) fn partial_stats(&self) -> Result<StoreStats> {
        let flights = self.flights.read();
        let reservations = self.reservations.read();
        let flights = flights.records()?;
        let reservations = reservations.records()?;
        let orphaned_reservations = reservations
            .iter()
            .filter(|r| !flights.iter().any(|f| f.id == r.flight_id))
            .count();
        Ok(StoreStats {
            users: 0,
            flights: flights.len(),
            reservations: reservations.len(),
            orphaned_reservations,
        })
    }
}
