//! Identifier newtypes used across the scheduling, execution and sampling
//! layers. Kept as thin wrappers over integers so they can't be mixed up at
//! call sites (a `ClientId` passed where a `WorkerId` is expected is now a
//! type error, not a silent bug).

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_type {
    ($name:ident) => {
        #[derive(
                Debug,
                Clone,
                Copy,
                PartialEq,
                Eq,
                PartialOrd,
                Ord,
                Hash,
                Serialize,
                Deserialize)]
        pub struct $name(pub usize);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<usize> for $name {
            fn from(value: usize) -> Self {
                $name(value)
            }
        }
    };
}

id_type!(ClientId);
id_type!(WorkerId);
id_type!(TaskId);
id_type!(JoinPointId);
