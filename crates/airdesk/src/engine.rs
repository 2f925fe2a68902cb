//! Reservation engine.
//!
//! The only place where invariants spanning tables are enforced: a booking
//! must name an existing flight with a valid capacity, must not duplicate an
//! existing `(username, flight_id)` pair, and must not push the flight's
//! occupancy past its capacity.
//!
//! Checks and append run while holding the flights read lock and the
//! reservations write lock, so two concurrent bookings cannot both observe
//! the last free seat. Locks are always taken in the order users, flights,
//! reservations.

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::{Flight, Reservation, ReservationKey};
use crate::repository::{Flights, ReadGuard, Reservations, Users, WriteGuard};

/// Borrowed view over the repositories a booking touches.
#[derive(Debug, Clone, Copy)]
pub struct ReservationEngine<'a> {
    users: &'a Users,
    flights: &'a Flights,
    reservations: &'a Reservations,
}

impl<'a> ReservationEngine<'a> {
    /// Create an engine over the given repositories.
    #[must_use]
    pub fn new(users: &'a Users, flights: &'a Flights, reservations: &'a Reservations) -> Self {
        Self {
            users,
            flights,
            reservations,
        }
    }

    /// Book a seat on `flight_id` for `username`.
    ///
    /// Conditions are checked in a fixed order, and the first one that holds
    /// is reported: missing flight, invalid capacity, duplicate booking, full
    /// flight. A duplicate on a full flight is therefore `AlreadyReserved`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FlightNotFound`], [`Error::InvalidCapacity`],
    /// [`Error::AlreadyReserved`] or [`Error::FlightFull`] without touching
    /// storage, or a storage error if a table cannot be read or appended.
    pub fn reserve(&self, username: &str, flight_id: &str) -> Result<Reservation> {
        let flights = self.flights.read();
        let mut reservations = self.reservations.write();
        book(&flights, &mut reservations, username, flight_id)
    }

    /// Remove the booking for exactly this `(username, flight_id)` pair.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no such booking exists, or a storage
    /// error if the table cannot be rewritten.
    pub fn cancel(&self, username: &str, flight_id: &str) -> Result<()> {
        self.reservations
            .delete(&ReservationKey::new(username, flight_id))?;
        Ok(())
    }

    /// Book a seat on behalf of a registered user.
    ///
    /// Same contract as [`reserve`](Self::reserve), checked after confirming
    /// the user exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownUser`] if `username` is not registered, then
    /// any error of [`reserve`](Self::reserve).
    pub fn admin_add_passenger(&self, username: &str, flight_id: &str) -> Result<Reservation> {
        let users = self.users.read();
        if users.find(username)?.is_none() {
            return Err(Error::UnknownUser(username.to_string()));
        }
        let flights = self.flights.read();
        let mut reservations = self.reservations.write();
        book(&flights, &mut reservations, username, flight_id)
    }

    /// Cancel a booking on behalf of a registered user.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownUser`] if `username` is not registered, then
    /// any error of [`cancel`](Self::cancel).
    pub fn admin_remove_passenger(&self, username: &str, flight_id: &str) -> Result<()> {
        let users = self.users.read();
        if users.find(username)?.is_none() {
            return Err(Error::UnknownUser(username.to_string()));
        }
        self.cancel(username, flight_id)
    }
}

fn book(
    flights: &ReadGuard<'_, Flight>,
    reservations: &mut WriteGuard<'_, Reservation>,
    username: &str,
    flight_id: &str,
) -> Result<Reservation> {
    let flight = flights
        .find(flight_id)?
        .ok_or_else(|| Error::FlightNotFound(flight_id.to_string()))?;
    let capacity = flight.seats()?;

    let existing = reservations.records()?;
    let key = ReservationKey::new(username, flight_id);
    if existing.iter().any(|r| r.key() == key) {
        return Err(Error::AlreadyReserved {
            username: username.to_string(),
            flight_id: flight_id.to_string(),
        });
    }

    let occupancy = existing.iter().filter(|r| r.flight_id == flight_id).count();
    debug!(
        "Flight '{}' occupancy {} of {}",
        flight_id, occupancy, capacity
    );
    if occupancy >= usize::try_from(capacity).unwrap_or(usize::MAX) {
        return Err(Error::FlightFull {
            flight_id: flight_id.to_string(),
            capacity,
        });
    }

    let reservation = Reservation::new(username, flight_id);
    reservations.append(&reservation)?;
    info!("Reserved flight '{}' for '{}'", flight_id, username);
    Ok(reservation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Role, User};
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        users: Users,
        flights: Flights,
        reservations: Reservations,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let users = Users::open(dir.path().join("users.csv")).unwrap();
            let flights = Flights::open(dir.path().join("flights.csv")).unwrap();
            let reservations = Reservations::open(dir.path().join("reservations.csv")).unwrap();
            Self {
                _dir: dir,
                users,
                flights,
                reservations,
            }
        }

        fn engine(&self) -> ReservationEngine<'_> {
            ReservationEngine::new(&self.users, &self.flights, &self.reservations)
        }

        fn add_flight(&self, id: &str, capacity: &str) {
            self.flights
                .insert(&Flight {
                    id: id.to_string(),
                    origin: "NYC".to_string(),
                    destination: "LON".to_string(),
                    date: "2025-01-01".to_string(),
                    time: "10:00".to_string(),
                    capacity: capacity.to_string(),
                })
                .unwrap();
        }

        fn add_user(&self, name: &str) {
            self.users
                .insert(&User::new(name, "pw", Role::Passenger).unwrap())
                .unwrap();
        }

        fn occupancy(&self, flight_id: &str) -> usize {
            self.reservations
                .list_all()
                .unwrap()
                .iter()
                .filter(|r| r.flight_id == flight_id)
                .count()
        }
    }

    #[test]
    fn test_reserve_records_timestamp() {
        let fx = Fixture::new();
        fx.add_flight("F1", "2");

        let reservation = fx.engine().reserve("alice", "F1").unwrap();
        assert_eq!(reservation.username, "alice");
        assert_eq!(reservation.flight_id, "F1");
        assert!(reservation.timestamp.is_some());
        assert_eq!(fx.reservations.list_all().unwrap(), vec![reservation]);
    }

    #[test]
    fn test_reserve_twice_is_already_reserved() {
        let fx = Fixture::new();
        fx.add_flight("F1", "5");
        let engine = fx.engine();

        engine.reserve("alice", "F1").unwrap();
        assert!(matches!(
            engine.reserve("alice", "F1"),
            Err(Error::AlreadyReserved { .. })
        ));
        assert_eq!(fx.occupancy("F1"), 1);
    }

    #[test]
    fn test_capacity_scenario() {
        let fx = Fixture::new();
        fx.add_flight("F1", "2");
        let engine = fx.engine();

        engine.reserve("alice", "F1").unwrap();
        engine.reserve("bob", "F1").unwrap();
        assert!(matches!(
            engine.reserve("carol", "F1"),
            Err(Error::FlightFull { capacity: 2, .. })
        ));
        // Duplicate detection wins over capacity on a full flight.
        assert!(matches!(
            engine.reserve("alice", "F1"),
            Err(Error::AlreadyReserved { .. })
        ));
        assert_eq!(fx.occupancy("F1"), 2);
    }

    #[test]
    fn test_zero_capacity_is_full() {
        let fx = Fixture::new();
        fx.add_flight("F9", "0");

        assert!(matches!(
            fx.engine().reserve("dave", "F9"),
            Err(Error::FlightFull { capacity: 0, .. })
        ));
        assert_eq!(fx.occupancy("F9"), 0);
    }

    #[test]
    fn test_reserve_missing_flight() {
        let fx = Fixture::new();
        assert!(matches!(
            fx.engine().reserve("alice", "NOPE"),
            Err(Error::FlightNotFound(id)) if id == "NOPE"
        ));
    }

    #[test]
    fn test_invalid_capacity_precedes_duplicate_check() {
        let fx = Fixture::new();
        fx.add_flight("F1", "many");
        fx.reservations
            .insert_unique(&Reservation::new("alice", "F1"))
            .unwrap();

        assert!(matches!(
            fx.engine().reserve("alice", "F1"),
            Err(Error::InvalidCapacity { .. })
        ));
    }

    #[test]
    fn test_cancel_frees_seat() {
        let fx = Fixture::new();
        fx.add_flight("F1", "1");
        let engine = fx.engine();

        engine.reserve("alice", "F1").unwrap();
        engine.cancel("alice", "F1").unwrap();
        engine.reserve("bob", "F1").unwrap();
        assert_eq!(fx.occupancy("F1"), 1);
    }

    #[test]
    fn test_cancel_only_exact_pair() {
        let fx = Fixture::new();
        fx.add_flight("F1", "3");
        fx.add_flight("F2", "3");
        let engine = fx.engine();

        engine.reserve("alice", "F1").unwrap();
        engine.reserve("alice", "F2").unwrap();
        engine.reserve("bob", "F1").unwrap();

        engine.cancel("alice", "F1").unwrap();
        let left: Vec<String> = fx
            .reservations
            .list_all()
            .unwrap()
            .iter()
            .map(|r| r.key().to_string())
            .collect();
        assert_eq!(left, ["alice/F2", "bob/F1"]);

        assert!(matches!(
            engine.cancel("alice", "F1"),
            Err(Error::NotFound { entity: "reservation", .. })
        ));
    }

    #[test]
    fn test_admin_add_requires_registered_user() {
        let fx = Fixture::new();
        fx.add_flight("F1", "2");
        fx.add_user("alice");
        let engine = fx.engine();

        assert!(matches!(
            engine.admin_add_passenger("ghost", "F1"),
            Err(Error::UnknownUser(name)) if name == "ghost"
        ));
        engine.admin_add_passenger("alice", "F1").unwrap();
        assert!(matches!(
            engine.admin_add_passenger("alice", "F1"),
            Err(Error::AlreadyReserved { .. })
        ));
    }

    #[test]
    fn test_admin_remove_requires_registered_user() {
        let fx = Fixture::new();
        fx.add_flight("F1", "2");
        fx.add_user("alice");
        let engine = fx.engine();
        engine.admin_add_passenger("alice", "F1").unwrap();

        assert!(matches!(
            engine.admin_remove_passenger("ghost", "F1"),
            Err(Error::UnknownUser(_))
        ));
        engine.admin_remove_passenger("alice", "F1").unwrap();
        assert_eq!(fx.occupancy("F1"), 0);
    }

    #[test]
    fn test_concurrent_reservations_respect_capacity() {
        let fx = Fixture::new();
        fx.add_flight("F1", "3");
        let engine = fx.engine();

        let outcomes: Vec<Result<Reservation>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..12)
                .map(|i| scope.spawn(move || engine.reserve(&format!("user{i}"), "F1")))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let booked = outcomes.iter().filter(|o| o.is_ok()).count();
        let full = outcomes
            .iter()
            .filter(|o| matches!(o, Err(Error::FlightFull { .. })))
            .count();
        assert_eq!(booked, 3);
        assert_eq!(full, 9);
        assert_eq!(fx.occupancy("F1"), 3);
    }
}
