pub mod job;
pub mod scanner;

pub use job::{FailureStage, ScanFailure, ScanJob};
pub use scanner::{ScanReport, Scanner};
