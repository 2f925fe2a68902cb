//! Header rows and arities of the three booking tables.
//!
//! Column order on disk is fixed for compatibility with files written by
//! earlier versions of the application.

/// Shape of one table file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSchema {
    /// Short table name used in logs and error messages.
    pub name: &'static str,
    /// Header row, in on-disk column order.
    pub columns: &'static [&'static str],
    /// Fewest fields a data row may carry and still be decoded.
    pub min_fields: usize,
}

impl TableSchema {
    /// Number of columns in the header row.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.columns.len()
    }
}

/// `users` table: one row per registered account.
pub const USERS: TableSchema = TableSchema {
    name: "users",
    columns: &["username", "password", "role"],
    min_fields: 3,
};

/// `flights` table: one row per scheduled flight.
pub const FLIGHTS: TableSchema = TableSchema {
    name: "flights",
    columns: &["id", "origin", "destination", "date", "time", "capacity"],
    min_fields: 6,
};

/// `reservations` table.
///
/// Two-field rows (`username,flight_id`) from the older layout are still
/// accepted; they decode with no timestamp.
pub const RESERVATIONS: TableSchema = TableSchema {
    name: "reservations",
    columns: &["username", "flight_id", "timestamp"],
    min_fields: 2,
};

/// All table schemas, in lock order.
pub const ALL: &[&TableSchema] = &[&USERS, &FLIGHTS, &RESERVATIONS];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schemas_not_empty() {
        for schema in ALL {
            assert!(!schema.columns.is_empty());
            assert!(schema.min_fields <= schema.arity());
        }
    }

    #[test]
    fn test_flights_capacity_is_last_column() {
        assert_eq!(FLIGHTS.arity(), 6);
        assert_eq!(FLIGHTS.columns[5], "capacity");
    }

    #[test]
    fn test_reservations_accepts_legacy_rows() {
        assert_eq!(RESERVATIONS.arity(), 3);
        assert_eq!(RESERVATIONS.min_fields, 2);
    }

    #[test]
    fn test_table_names_unique() {
        let names: std::collections::HashSet<_> = ALL.iter().map(|s| s.name).collect();
        assert_eq!(names.len(), ALL.len());
    }
}
