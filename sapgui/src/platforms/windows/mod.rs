//! SAP GUI scripting over COM automation

mod applications;
mod dispatch;
mod provider;
mod types;

pub use provider::ComProvider;
