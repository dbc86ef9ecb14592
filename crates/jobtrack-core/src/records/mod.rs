pub mod model;
pub mod store;

pub use model::{
    ApplicationPayload, ApplicationRecord, FilterCriteria, StatisticsSnapshot, Status,
    UnknownStatus,
};
pub use store::{RecordStore, Refresh};
