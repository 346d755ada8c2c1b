//! Gateway implementations shipped with the runtime.

mod stdio;

pub use stdio::StdioGateway;
