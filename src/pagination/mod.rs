pub mod paginator;

pub use paginator::{AccumulatedDataset, FailurePolicy, IdentityKey, PageRequest, Paginator, Termination};
