//! Everything application code typically needs in one import.

pub use crate::batch::{batch, in_batch};
pub use crate::collections::{RxDict, RxList, rx_dict, rx_list};
pub use crate::computed::{Computed, computed};
pub use crate::decorators::{
    ConditionalEffect, DebouncedEffect, MemoizedComputation, ThrottledEffect,
};
pub use crate::error::RxError;
pub use crate::observer::Observer;
pub use crate::reactive::{Rx, RxBool, RxDyn, RxFloat, RxInt, RxStr, rx};
pub use crate::scope::Scope;
pub use crate::tracker::untracked;
