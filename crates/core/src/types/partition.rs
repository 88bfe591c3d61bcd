//! Table partitions, one per entity kind.

use core::fmt;

use serde::{Deserialize, Serialize};

/// The partition an entity row lives in.
///
/// The string forms are the partition keys persisted in the table store and
/// must not change once data exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Partition {
    /// Registered users, keyed by email.
    #[serde(rename = "CustomerProfile")]
    Users,
    /// Registered products, keyed by generated product id.
    #[serde(rename = "Products")]
    Products,
    /// Placed orders, keyed by generated order id.
    #[serde(rename = "Orders")]
    Orders,
}

impl Partition {
    /// All partitions, in a stable order.
    pub const ALL: [Self; 3] = [Self::Users, Self::Products, Self::Orders];

    /// The persisted partition key.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Users => "CustomerProfile",
            Self::Products => "Products",
            Self::Orders => "Orders",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not a known partition key.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown partition: {0}")]
pub struct UnknownPartition(pub String);

impl std::str::FromStr for Partition {
    type Err = UnknownPartition;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownPartition(s.to_owned()))
    }
}
