// pagedraft-common: document model, patch engine and wire types shared by
// every pagedraft crate.

pub mod diff;
pub mod patch;
pub mod pointer;
pub mod protocol;
pub mod record;
pub mod section;
pub mod types;
