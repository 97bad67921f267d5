//! Phone-to-printer relay: accepts image uploads, forwards them to an
//! external printer service and tracks each job until it completes.

pub mod config;
pub mod print_job;
pub mod printer_client;
pub mod storage;
pub mod web;

pub use print_job::{Job, JobId, JobState, PrintJobController, PrintJobError, PrintResult};
pub use printer_client::{HttpPrinterClient, PrinterClient};
pub use storage::ImageStore;
