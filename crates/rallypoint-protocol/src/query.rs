//! Query specification for lobby discovery.
//!
//! A [`QuerySpec`] is an ordered list of filters plus an ordered list of
//! sort keys. We only build and carry it; the lobby service evaluates it.
//! Filters may only reference built-in fields or indexed custom slots
//! (see [`DataIndex`]).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{DataIndex, ProtocolError, VERSION_INDEX};

/// Hard cap on the number of lobbies a single query returns.
pub const MAX_QUERY_RESULTS: usize = 20;

/// A field a filter or ordering can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryField {
    AvailableSlots,
    MaxPlayers,
    Name,
    Created,
    /// An indexed custom data slot.
    Custom(DataIndex),
}

impl fmt::Display for QueryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AvailableSlots => f.write_str("AvailableSlots"),
            Self::MaxPlayers => f.write_str("MaxPlayers"),
            Self::Name => f.write_str("Name"),
            Self::Created => f.write_str("Created"),
            Self::Custom(index) => write!(f, "{index:?}"),
        }
    }
}

impl FromStr for QueryField {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let field = match s {
            "AvailableSlots" => Self::AvailableSlots,
            "MaxPlayers" => Self::MaxPlayers,
            "Name" => Self::Name,
            "Created" => Self::Created,
            "S1" => Self::Custom(DataIndex::S1),
            "S2" => Self::Custom(DataIndex::S2),
            "S3" => Self::Custom(DataIndex::S3),
            "S4" => Self::Custom(DataIndex::S4),
            "S5" => Self::Custom(DataIndex::S5),
            "N1" => Self::Custom(DataIndex::N1),
            "N2" => Self::Custom(DataIndex::N2),
            "N3" => Self::Custom(DataIndex::N3),
            "N4" => Self::Custom(DataIndex::N4),
            "N5" => Self::Custom(DataIndex::N5),
            other => {
                return Err(ProtocolError::Unknown {
                    kind: "query field",
                    value: other.to_owned(),
                });
            }
        };
        Ok(field)
    }
}

/// Comparison operator of a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// Substring match (string fields only).
    Contains,
}

/// One filter predicate: `field op value`.
///
/// The value is always carried as a string, the way the hosted service
/// takes it; numeric fields are parsed on the service side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFilter {
    pub field: QueryField,
    pub op: FilterOp,
    pub value: String,
}

impl QueryFilter {
    pub fn new(field: QueryField, op: FilterOp, value: impl Into<String>) -> Self {
        Self {
            field,
            op,
            value: value.into(),
        }
    }
}

/// One sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOrder {
    pub field: QueryField,
    pub ascending: bool,
}

impl QueryOrder {
    pub fn asc(field: QueryField) -> Self {
        Self {
            field,
            ascending: true,
        }
    }

    pub fn desc(field: QueryField) -> Self {
        Self {
            field,
            ascending: false,
        }
    }
}

/// A complete lobby search: filters, sort keys, and result count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySpec {
    pub filters: Vec<QueryFilter>,
    pub order: Vec<QueryOrder>,
    count: usize,
}

impl Default for QuerySpec {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            order: Vec::new(),
            count: MAX_QUERY_RESULTS,
        }
    }
}

impl QuerySpec {
    /// An empty query returning up to [`MAX_QUERY_RESULTS`] lobbies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a filter.
    pub fn filter(mut self, field: QueryField, op: FilterOp, value: impl Into<String>) -> Self {
        self.filters.push(QueryFilter::new(field, op, value));
        self
    }

    /// Appends a sort key. Earlier keys take precedence.
    pub fn order_by(mut self, order: QueryOrder) -> Self {
        self.order.push(order);
        self
    }

    /// Sets the result count, clamped to `1..=MAX_QUERY_RESULTS`.
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count.clamp(1, MAX_QUERY_RESULTS);
        self
    }

    /// Maximum number of lobbies the service should return.
    pub fn count(&self) -> usize {
        self.count
    }

    /// The search used to find a game to join: lobbies with a free slot
    /// running exactly the given version tag, fullest first,
    /// then newest, then by name.
    pub fn open_lobbies(version: &str) -> Self {
        Self::new()
            .filter(QueryField::AvailableSlots, FilterOp::Gt, "0")
            .filter(QueryField::Custom(VERSION_INDEX), FilterOp::Eq, version)
            .order_by(QueryOrder::asc(QueryField::AvailableSlots))
            .order_by(QueryOrder::desc(QueryField::Created))
            .order_by(QueryOrder::desc(QueryField::Name))
    }
}
