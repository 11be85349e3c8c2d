//! Quest stages.
//!
//! A quest's stage is an ordinary enum owned by the quest author. The runtime only needs
//! to know which progress class each variant belongs to and when two values count as
//! the same stage.

use std::fmt::Debug;
use std::mem;

use questgiver_data::Progress;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// A quest lifecycle position tagged with a progress class.
///
/// Two stages are the same when they are the same variant. Payloads are ignored, so
/// rewriting `Deliver { to: "a" }` as `Deliver { to: "b" }` is not a transition.
pub trait Stage: Clone + Debug + Serialize + DeserializeOwned + 'static {
    fn progress(&self) -> Progress;

    fn same_stage(&self, other: &Self) -> bool {
        mem::discriminant(self) == mem::discriminant(other)
    }
}
