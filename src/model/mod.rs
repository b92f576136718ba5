pub use self::{
    medal::{Medal, RawMedal},
    report::{RecordFailure, SyncReport, SyncSummary},
};

mod medal;
mod report;
