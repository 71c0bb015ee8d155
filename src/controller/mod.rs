/// Asset lifecycle controllers
///
/// One controller per field shape. Both parse a submission into a plan first,
/// then run the plan's remote operations and mutate the record last.

pub mod multi;
pub mod single;

pub use multi::{ListOutcome, MultiAssetController};
pub use single::{SingleAssetController, SingleOutcome};
