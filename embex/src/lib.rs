#![deny(
    rust_2018_idioms,
    unreachable_pub,
    unsafe_code,
    unused_imports,
    unused_mut,
    missing_debug_implementations
)]

pub mod container;
pub mod driver;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod scan;
pub mod scheme;
pub mod table;
pub mod writer;

pub use container::{CandidateRange, Container};
pub use driver::Driver;
pub use pipeline::{
    CancelToken, Event, EventSink, ExtractionJob, JobReport, JobState,
};
pub use scheme::Scheme;
