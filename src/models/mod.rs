pub mod request;

pub use request::{Identifier, NormalizedRequest, RawLogLine, TIMESTAMP_FORMAT};
