use std::fmt;

use serde::{Deserialize, Serialize};

use crate::net::arena::Key;

macro_rules! define_key {
    ($name:ident) => {
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[repr(transparent)]
        pub struct $name(pub u32);

        impl $name {
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            pub const fn raw(self) -> u32 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, stringify!($name))?;
                f.debug_tuple("").field(&self.0).finish()
            }
        }

        impl Key for $name {
            fn index(self) -> usize {
                self.0 as usize
            }

            fn from_index(idx: usize) -> Self {
                Self(idx as u32)
            }
        }
    };
}

define_key!(PlaceId);
define_key!(TransitionId);
define_key!(ArcId);

/// Identity of a single token. Unique for the lifetime of the process,
/// never reused, so two tokens with equal colors stay distinguishable.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct TokenId(pub u64);

impl TokenId {
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenId")?;
        f.debug_tuple("").field(&self.0).finish()
    }
}
