//! Typed repositories over booking tables.
//!
//! A [`Repository`] owns one [`Table`] behind a read/write lock. Lookups and
//! scans share the read lock; inserts and deletes take the write lock, so a
//! uniqueness check and its append, or a read and its rewrite, never
//! interleave with another writer on the same table.

use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use csv::StringRecord;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::{Flight, Reservation, User};
use crate::table::{Table, TableSchema};

/// Registered accounts, keyed by username.
pub type Users = Repository<User>;

/// Scheduled flights, keyed by flight id.
pub type Flights = Repository<Flight>;

/// Bookings, keyed by `(username, flight_id)`.
pub type Reservations = Repository<Reservation>;

/// A record type stored as one row of a table.
pub trait Record: Sized {
    /// Primary key type.
    type Key: ?Sized + ToOwned + PartialEq + fmt::Display;

    /// Entity name used in error messages.
    const ENTITY: &'static str;

    /// Table layout.
    const SCHEMA: &'static TableSchema;

    /// This record's primary key.
    fn key(&self) -> Cow<'_, Self::Key>;

    /// Whether this record has the given primary key.
    fn matches(&self, key: &Self::Key) -> bool {
        *self.key() == *key
    }

    /// Encode as a row in schema column order.
    fn to_row(&self) -> StringRecord;

    /// Decode from a row that has at least `SCHEMA.min_fields` fields.
    fn from_row(row: &StringRecord) -> Self;
}

/// A record callers may insert on its own.
///
/// Reservations are not: they are only created by
/// [`ReservationEngine`](crate::engine::ReservationEngine), which checks the
/// flight and its remaining seats in the same critical section.
///
/// ```compile_fail
/// use airdesk::{Reservation, Reservations};
///
/// fn book(reservations: &Reservations) {
///     let _ = reservations.insert(&Reservation::new("alice", "F1"));
/// }
/// ```
pub trait Insertable: Record {}

/// Typed access to one table.
pub struct Repository<R> {
    table: RwLock<Table>,
    path: PathBuf,
    _record: PhantomData<fn() -> R>,
}

impl<R> fmt::Debug for Repository<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl<R: Record> Repository<R> {
    /// Open the repository's table, creating it with a header if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the table file cannot be created or read.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let table = Table::open(path, R::SCHEMA)?;
        Ok(Self {
            path: table.path().to_path_buf(),
            table: RwLock::new(table),
            _record: PhantomData,
        })
    }

    /// Get the path to the table file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up a record by primary key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no record has the key, or a storage
    /// error if the table cannot be read.
    pub fn find_by_key(&self, key: &R::Key) -> Result<R> {
        self.get(key)?.ok_or_else(|| Error::NotFound {
            entity: R::ENTITY,
            key: key.to_string(),
        })
    }

    /// Look up a record by primary key, returning `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read.
    pub fn get(&self, key: &R::Key) -> Result<Option<R>> {
        self.read().find(key)
    }

    /// Append a record after checking its key is not taken.
    ///
    /// No other table is consulted; callers outside the crate go through
    /// [`insert`](Self::insert) or the reservation engine.
    pub(crate) fn insert_unique(&self, record: &R) -> Result<()> {
        let mut guard = self.write();
        let key = record.key();
        let key: &R::Key = &key;
        if guard.find(key)?.is_some() {
            return Err(Error::AlreadyExists {
                entity: R::ENTITY,
                key: key.to_string(),
            });
        }
        guard.append(record)?;
        info!("Inserted {} '{}'", R::ENTITY, key);
        Ok(())
    }

    /// Remove every record with the given key, keeping the others in order.
    ///
    /// Returns the number of rows removed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no record has the key, or a storage
    /// error if the table cannot be read or rewritten.
    pub fn delete(&self, key: &R::Key) -> Result<usize> {
        let mut guard = self.write();
        let records = guard.records()?;
        let before = records.len();
        let kept: Vec<R> = records.into_iter().filter(|r| !r.matches(key)).collect();
        let removed = before - kept.len();

        if removed == 0 {
            return Err(Error::NotFound {
                entity: R::ENTITY,
                key: key.to_string(),
            });
        }

        guard.rewrite(&kept)?;
        info!("Deleted {} '{}' ({} rows)", R::ENTITY, key, removed);
        Ok(removed)
    }

    /// Every record in file order.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read or decoded.
    pub fn list_all(&self) -> Result<Vec<R>> {
        self.read().records()
    }

    /// Number of records in the table.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read or decoded.
    pub fn count(&self) -> Result<usize> {
        Ok(self.list_all()?.len())
    }

    /// Take the table's shared lock.
    pub(crate) fn read(&self) -> ReadGuard<'_, R> {
        ReadGuard {
            table: self.table.read(),
            _record: PhantomData,
        }
    }

    /// Take the table's exclusive lock.
    pub(crate) fn write(&self) -> WriteGuard<'_, R> {
        WriteGuard {
            table: self.table.write(),
            _record: PhantomData,
        }
    }
}

impl<R: Insertable> Repository<R> {
    /// Append a record after checking its key is not taken.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyExists`] on a duplicate key, or a storage
    /// error if the table cannot be read or written.
    pub fn insert(&self, record: &R) -> Result<()> {
        self.insert_unique(record)
    }
}

impl Repository<User> {
    /// Check a username and password pair.
    ///
    /// Both must match a stored user exactly.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCredentials`] on an unknown user or wrong
    /// password, or a storage error if the table cannot be read.
    pub fn verify(&self, username: &str, password: &str) -> Result<User> {
        match self.get(username)? {
            Some(user) if user.password == password => Ok(user),
            _ => {
                debug!("Rejected credentials for '{}'", username);
                Err(Error::InvalidCredentials)
            }
        }
    }
}

/// Shared access to a table for the lifetime of the guard.
pub(crate) struct ReadGuard<'a, R> {
    table: RwLockReadGuard<'a, Table>,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> ReadGuard<'_, R> {
    pub(crate) fn records(&self) -> Result<Vec<R>> {
        decode(&self.table)
    }

    pub(crate) fn find(&self, key: &R::Key) -> Result<Option<R>> {
        Ok(self.records()?.into_iter().find(|r| r.matches(key)))
    }
}

/// Exclusive access to a table for the lifetime of the guard.
pub(crate) struct WriteGuard<'a, R> {
    table: RwLockWriteGuard<'a, Table>,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> WriteGuard<'_, R> {
    pub(crate) fn records(&self) -> Result<Vec<R>> {
        decode(&self.table)
    }

    pub(crate) fn find(&self, key: &R::Key) -> Result<Option<R>> {
        Ok(self.records()?.into_iter().find(|r| r.matches(key)))
    }

    /// Append without any key check.
    pub(crate) fn append(&mut self, record: &R) -> Result<()> {
        self.table.append_row(&record.to_row())
    }

    /// Replace all data rows, keeping the header.
    pub(crate) fn rewrite(&mut self, records: &[R]) -> Result<()> {
        let mut rows = Vec::with_capacity(records.len() + 1);
        rows.push(self.table.header());
        rows.extend(records.iter().map(R::to_row));
        self.table.write_all(&rows)
    }
}

/// Decode every data row of `table`, skipping the header.
fn decode<R: Record>(table: &Table) -> Result<Vec<R>> {
    let rows = table.read_all()?;
    rows.iter()
        .skip(1)
        .map(|row| {
            if row.len() < R::SCHEMA.min_fields {
                return Err(Error::MalformedTable {
                    path: table.path().to_path_buf(),
                    line: row.position().map(csv::Position::line),
                    message: format!(
                        "expected at least {} fields, found {}",
                        R::SCHEMA.min_fields,
                        row.len()
                    ),
                });
            }
            Ok(R::from_row(row))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ReservationKey, Role};
    use tempfile::TempDir;

    fn flight(id: &str, capacity: &str) -> Flight {
        Flight {
            id: id.to_string(),
            origin: "NYC".to_string(),
            destination: "LON".to_string(),
            date: "2025-01-01".to_string(),
            time: "10:00".to_string(),
            capacity: capacity.to_string(),
        }
    }

    fn create_test_flights(dir: &TempDir) -> Flights {
        Flights::open(dir.path().join("flights.csv")).expect("failed to open flights")
    }

    #[test]
    fn test_insert_and_find() {
        let dir = TempDir::new().unwrap();
        let flights = create_test_flights(&dir);

        flights.insert(&flight("F1", "2")).unwrap();
        assert_eq!(flights.find_by_key("F1").unwrap(), flight("F1", "2"));
    }

    #[test]
    fn test_find_missing() {
        let dir = TempDir::new().unwrap();
        let flights = create_test_flights(&dir);

        assert!(flights.get("F1").unwrap().is_none());
        assert!(matches!(
            flights.find_by_key("F1"),
            Err(Error::NotFound { entity: "flight", .. })
        ));
    }

    #[test]
    fn test_insert_duplicate_key() {
        let dir = TempDir::new().unwrap();
        let flights = create_test_flights(&dir);

        flights.insert(&flight("F1", "2")).unwrap();
        let err = flights.insert(&flight("F1", "9")).unwrap_err();
        assert!(matches!(err, Error::AlreadyExists { entity: "flight", .. }));

        assert_eq!(flights.count().unwrap(), 1);
        assert_eq!(flights.find_by_key("F1").unwrap().capacity, "2");
    }

    #[test]
    fn test_usernames_are_case_sensitive() {
        let dir = TempDir::new().unwrap();
        let users = Users::open(dir.path().join("users.csv")).unwrap();

        users
            .insert(&User::new("alice", "pw", Role::Passenger).unwrap())
            .unwrap();
        users
            .insert(&User::new("Alice", "pw", Role::Passenger).unwrap())
            .unwrap();
        assert_eq!(users.count().unwrap(), 2);
    }

    #[test]
    fn test_delete_keeps_other_rows_in_order() {
        let dir = TempDir::new().unwrap();
        let flights = create_test_flights(&dir);
        for id in ["F1", "F2", "F3", "F4"] {
            flights.insert(&flight(id, "1")).unwrap();
        }

        assert_eq!(flights.delete("F2").unwrap(), 1);

        let ids: Vec<String> = flights.list_all().unwrap().into_iter().map(|f| f.id).collect();
        assert_eq!(ids, ["F1", "F3", "F4"]);
    }

    #[test]
    fn test_delete_removes_all_matching_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("flights.csv");
        std::fs::write(
            &path,
            "id,origin,destination,date,time,capacity\n\
             F1,NYC,LON,2025-01-01,10:00,2\n\
             F2,PAR,ROM,2025-01-02,11:00,3\n\
             F1,NYC,LON,2025-01-01,10:00,2\n",
        )
        .unwrap();
        let flights = Flights::open(&path).unwrap();

        assert_eq!(flights.delete("F1").unwrap(), 2);
        assert_eq!(flights.list_all().unwrap(), vec![flight_row_f2()]);
    }

    fn flight_row_f2() -> Flight {
        Flight {
            id: "F2".to_string(),
            origin: "PAR".to_string(),
            destination: "ROM".to_string(),
            date: "2025-01-02".to_string(),
            time: "11:00".to_string(),
            capacity: "3".to_string(),
        }
    }

    #[test]
    fn test_delete_missing() {
        let dir = TempDir::new().unwrap();
        let flights = create_test_flights(&dir);
        flights.insert(&flight("F1", "1")).unwrap();

        assert!(matches!(flights.delete("F9"), Err(Error::NotFound { .. })));
        assert_eq!(flights.count().unwrap(), 1);
    }

    #[test]
    fn test_list_all_is_stable() {
        let dir = TempDir::new().unwrap();
        let flights = create_test_flights(&dir);
        for id in ["F3", "F1", "F2"] {
            flights.insert(&flight(id, "1")).unwrap();
        }

        let first = flights.list_all().unwrap();
        let second = flights.list_all().unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0].id, "F3");
    }

    #[test]
    fn test_reservation_composite_key() {
        let dir = TempDir::new().unwrap();
        let reservations = Reservations::open(dir.path().join("reservations.csv")).unwrap();

        reservations.insert_unique(&Reservation::new("alice", "F1")).unwrap();
        reservations.insert_unique(&Reservation::new("alice", "F2")).unwrap();
        reservations.insert_unique(&Reservation::new("bob", "F1")).unwrap();
        assert!(matches!(
            reservations.insert_unique(&Reservation::new("alice", "F1")),
            Err(Error::AlreadyExists { entity: "reservation", .. })
        ));

        reservations
            .delete(&ReservationKey::new("alice", "F1"))
            .unwrap();
        let left: Vec<String> = reservations
            .list_all()
            .unwrap()
            .into_iter()
            .map(|r| r.key().to_string())
            .collect();
        assert_eq!(left, ["alice/F2", "bob/F1"]);
    }

    #[test]
    fn test_short_row_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("flights.csv");
        std::fs::write(
            &path,
            "id,origin,destination,date,time,capacity\nF1,NYC,LON\n",
        )
        .unwrap();
        let flights = Flights::open(&path).unwrap();

        let err = flights.list_all().unwrap_err();
        assert!(matches!(err, Error::MalformedTable { line: Some(2), .. }));
        assert!(err.is_storage());
    }

    #[test]
    fn test_legacy_reservation_rows_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reservation.csv");
        std::fs::write(&path, "username,flight_id\nalice,F1\n").unwrap();
        let reservations = Reservations::open(&path).unwrap();

        let all = reservations.list_all().unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].timestamp.is_none());
    }

    #[test]
    fn test_verify() {
        let dir = TempDir::new().unwrap();
        let users = Users::open(dir.path().join("users.csv")).unwrap();
        users
            .insert(&User::new("alice", "secret", Role::Passenger).unwrap())
            .unwrap();

        assert_eq!(users.verify("alice", "secret").unwrap().username, "alice");
        assert!(matches!(
            users.verify("alice", "wrong"),
            Err(Error::InvalidCredentials)
        ));
        assert!(matches!(
            users.verify("nobody", "secret"),
            Err(Error::InvalidCredentials)
        ));
        assert!(matches!(
            users.verify("Alice", "secret"),
            Err(Error::InvalidCredentials)
        ));
    }

    #[test]
    fn test_repository_debug() {
        let dir = TempDir::new().unwrap();
        let flights = create_test_flights(&dir);
        let debug_str = format!("{flights:?}");
        assert!(debug_str.contains("flights.csv"));
    }
}
