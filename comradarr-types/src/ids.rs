//! Store-assigned integer identifiers, wrapped so call sites can't transpose them.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl $name {
            #[must_use]
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

id_newtype!(ConnectorId);
id_newtype!(ThrottleProfileId);
id_newtype!(RegistryId);
id_newtype!(RequestQueueId);
id_newtype!(SearchHistoryId);
id_newtype!(EpisodeId);
id_newtype!(SeasonId);
id_newtype!(MovieId);
id_newtype!(SeriesId);
