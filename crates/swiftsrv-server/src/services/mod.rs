//! Built-in operation services and the process-backed demangler.

pub mod command;
pub mod demangle;
pub mod nop;

pub use command::CommandDemangler;
pub use demangle::DemangleService;
pub use nop::NopService;
