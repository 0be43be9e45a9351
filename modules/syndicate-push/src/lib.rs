//! Reconciliation: diff the canonical history against each external target's
//! mapping table and converge the remote side in bounded batches.

pub mod csv_export;
pub mod mapper;
pub mod noco;
pub mod partition;
pub mod reconciler;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

pub use csv_export::CsvExporter;
pub use noco::NocoTarget;
pub use reconciler::{PushReport, Reconciler};
pub use traits::{
    LocalSnapshot, MappingStore, OutgoingRecord, RemoteCreated, TargetAdapter,
};
