pub mod alert;
pub mod report;
