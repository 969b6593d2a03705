mod dataset;
mod persistence;
mod records;

pub use dataset::load_records;
pub use persistence::{JsonResultStore, ResultSetLoader, ResultSetWriter, ResultStore};
pub use records::{RecordSet, ResultSetProgress};
