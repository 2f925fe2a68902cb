//! Record types for airdesk.
//!
//! This module defines the three stored entities (users, flights and
//! reservations), their row encodings, and the session value that callers
//! pass into every booking operation.

use std::borrow::Cow;
use std::fmt;

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, SubsecRound};
use csv::StringRecord;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::repository::{Insertable, Record};
use crate::table::schema::{self, TableSchema};

/// On-disk format of flight dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// On-disk format of flight departure times.
pub const TIME_FORMAT: &str = "%H:%M";

/// On-disk format of reservation timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// What an account is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Browses and reserves flights.
    #[default]
    Passenger,
    /// Manages flight inventory and passenger lists.
    Admin,
}

impl Role {
    /// Decode a stored role. Anything other than `admin` is a passenger.
    #[must_use]
    pub fn from_stored(value: &str) -> Self {
        match value {
            "admin" => Self::Admin,
            "passenger" => Self::Passenger,
            other => {
                warn!("Unknown role '{}', treating as passenger", other);
                Self::Passenger
            }
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passenger => write!(f, "passenger"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique, case-sensitive login name.
    pub username: String,
    /// Compared verbatim on login.
    #[serde(skip_serializing)]
    pub password: String,
    /// Account role.
    pub role: Role,
}

impl User {
    /// Create a user, rejecting an empty username or password.
    ///
    /// Surrounding whitespace is trimmed from both fields.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if either field is blank.
    pub fn new(username: &str, password: &str, role: Role) -> Result<Self> {
        Ok(Self {
            username: required("username", username)?,
            password: required("password", password)?,
            role,
        })
    }
}

/// A scheduled flight.
///
/// Fields hold their stored text. `capacity` is parsed on demand so a
/// hand-edited file with a bad value still loads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flight {
    /// Unique flight identifier.
    pub id: String,
    /// Departure city.
    pub origin: String,
    /// Arrival city.
    pub destination: String,
    /// Departure date, `YYYY-MM-DD`.
    pub date: String,
    /// Departure time, `HH:MM`.
    pub time: String,
    /// Seat count as stored.
    pub capacity: String,
}

impl Flight {
    /// Parse the stored capacity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCapacity`] if the stored value is not a
    /// non-negative integer.
    pub fn seats(&self) -> Result<u32> {
        self.capacity
            .trim()
            .parse()
            .map_err(|_| Error::InvalidCapacity {
                flight_id: self.id.clone(),
                value: self.capacity.clone(),
            })
    }
}

/// Unvalidated input for a new flight, as typed by an administrator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightDraft {
    /// Flight identifier.
    pub id: String,
    /// Departure city.
    pub origin: String,
    /// Arrival city.
    pub destination: String,
    /// Departure date.
    pub date: String,
    /// Departure time.
    pub time: String,
    /// Seat count.
    pub capacity: String,
}

impl FlightDraft {
    /// Build a draft from its six fields.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        origin: impl Into<String>,
        destination: impl Into<String>,
        date: impl Into<String>,
        time: impl Into<String>,
        capacity: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            origin: origin.into(),
            destination: destination.into(),
            date: date.into(),
            time: time.into(),
            capacity: capacity.into(),
        }
    }

    /// Validate the draft into a [`Flight`].
    ///
    /// Every field must be non-blank, `date` must be `YYYY-MM-DD`, `time`
    /// must be `HH:MM`, and `capacity` a non-negative integer. Date, time
    /// and capacity are stored in canonical form (`2025-1-1` becomes
    /// `2025-01-01`, `9:5` becomes `09:05`, `+3` becomes `3`) so exact
    /// date search and seat counts see the same text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] naming the first offending field.
    pub fn validate(&self) -> Result<Flight> {
        let id = required("id", &self.id)?;
        let origin = required("origin", &self.origin)?;
        let destination = required("destination", &self.destination)?;
        let date = required("date", &self.date)?;
        let time = required("time", &self.time)?;
        let capacity = required("capacity", &self.capacity)?;

        let date = NaiveDate::parse_from_str(&date, DATE_FORMAT)
            .map_err(|_| Error::invalid_input("date", format!("'{date}' is not YYYY-MM-DD")))?;
        let time = NaiveTime::parse_from_str(&time, TIME_FORMAT)
            .map_err(|_| Error::invalid_input("time", format!("'{time}' is not HH:MM")))?;
        let capacity = capacity.parse::<u32>().map_err(|_| {
            Error::invalid_input(
                "capacity",
                format!("'{capacity}' is not a non-negative integer"),
            )
        })?;

        Ok(Flight {
            id,
            origin,
            destination,
            date: date.format(DATE_FORMAT).to_string(),
            time: time.format(TIME_FORMAT).to_string(),
            capacity: capacity.to_string(),
        })
    }
}

/// One passenger's booking on one flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    /// The passenger.
    pub username: String,
    /// The booked flight. May refer to a deleted flight.
    pub flight_id: String,
    /// When the booking was made. Absent on rows from the two-column layout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<NaiveDateTime>,
}

impl Reservation {
    /// Create a reservation stamped with the current local time, to the second.
    #[must_use]
    pub fn new(username: impl Into<String>, flight_id: impl Into<String>) -> Self {
        Self::at(username, flight_id, Local::now().naive_local().trunc_subsecs(0))
    }

    /// Create a reservation stamped with the given instant.
    #[must_use]
    pub fn at(
        username: impl Into<String>,
        flight_id: impl Into<String>,
        timestamp: NaiveDateTime,
    ) -> Self {
        Self {
            username: username.into(),
            flight_id: flight_id.into(),
            timestamp: Some(timestamp),
        }
    }

    /// The `(username, flight_id)` pair identifying this reservation.
    #[must_use]
    pub fn key(&self) -> ReservationKey {
        ReservationKey::new(&self.username, &self.flight_id)
    }
}

/// Identifies a reservation: at most one exists per pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReservationKey {
    /// The passenger.
    pub username: String,
    /// The flight.
    pub flight_id: String,
}

impl ReservationKey {
    /// Build a key from its parts.
    #[must_use]
    pub fn new(username: impl Into<String>, flight_id: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            flight_id: flight_id.into(),
        }
    }
}

impl fmt::Display for ReservationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.username, self.flight_id)
    }
}

/// The logged-in account on whose behalf an operation runs.
///
/// Obtained from `login` and passed explicitly into every booking call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Logged-in username.
    pub username: String,
    /// Role at login time.
    pub role: Role,
}

impl Session {
    /// Whether this session belongs to an administrator.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Fail unless this session belongs to an administrator.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotPermitted`] for passenger sessions.
    pub fn require_admin(&self, action: &'static str) -> Result<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(Error::NotPermitted { action })
        }
    }
}

impl From<&User> for Session {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            role: user.role,
        }
    }
}

fn required(field: &'static str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::invalid_input(field, "must not be empty"));
    }
    Ok(value.to_string())
}

fn field(row: &StringRecord, index: usize) -> String {
    row.get(index).unwrap_or_default().to_string()
}

impl Record for User {
    type Key = str;

    const ENTITY: &'static str = "user";
    const SCHEMA: &'static TableSchema = &schema::USERS;

    fn key(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.username)
    }

    fn to_row(&self) -> StringRecord {
        StringRecord::from(vec![
            self.username.as_str(),
            self.password.as_str(),
            self.role.to_string().as_str(),
        ])
    }

    fn from_row(row: &StringRecord) -> Self {
        Self {
            username: field(row, 0),
            password: field(row, 1),
            role: Role::from_stored(row.get(2).unwrap_or_default()),
        }
    }
}

impl Insertable for User {}

impl Record for Flight {
    type Key = str;

    const ENTITY: &'static str = "flight";
    const SCHEMA: &'static TableSchema = &schema::FLIGHTS;

    fn key(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.id)
    }

    fn to_row(&self) -> StringRecord {
        StringRecord::from(vec![
            self.id.as_str(),
            self.origin.as_str(),
            self.destination.as_str(),
            self.date.as_str(),
            self.time.as_str(),
            self.capacity.as_str(),
        ])
    }

    fn from_row(row: &StringRecord) -> Self {
        Self {
            id: field(row, 0),
            origin: field(row, 1),
            destination: field(row, 2),
            date: field(row, 3),
            time: field(row, 4),
            capacity: field(row, 5),
        }
    }
}

impl Insertable for Flight {}

impl Record for Reservation {
    type Key = ReservationKey;

    const ENTITY: &'static str = "reservation";
    const SCHEMA: &'static TableSchema = &schema::RESERVATIONS;

    fn key(&self) -> Cow<'_, ReservationKey> {
        Cow::Owned(Reservation::key(self))
    }

    fn matches(&self, key: &ReservationKey) -> bool {
        self.username == key.username && self.flight_id == key.flight_id
    }

    fn to_row(&self) -> StringRecord {
        let timestamp = self
            .timestamp
            .map(|ts| ts.format(TIMESTAMP_FORMAT).to_string())
            .unwrap_or_default();
        StringRecord::from(vec![
            self.username.as_str(),
            self.flight_id.as_str(),
            timestamp.as_str(),
        ])
    }

    fn from_row(row: &StringRecord) -> Self {
        let timestamp = match row.get(2).map(str::trim) {
            None | Some("") => None,
            Some(raw) => match NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT) {
                Ok(ts) => Some(ts),
                Err(_) => {
                    warn!("Unparseable reservation timestamp '{}', ignoring", raw);
                    None
                }
            },
        };

        Self {
            username: field(row, 0),
            flight_id: field(row, 1),
            timestamp,
        }
    }
}
