pub mod aws_profile;
pub mod config;
pub mod directive;
pub mod domain;
pub mod errors;
pub mod flows;

pub use directive::SystemDirective;
pub use domain::message::{Message, ToolErrorKind, ToolPayload, ToolRequest, ToolRequestId};
pub use domain::session::SessionId;
pub use domain::tool::{ParamKind, ParamSpec, Record, ToolDefinition};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use flows::{LoopContext, LoopEngine, LoopEvent, LoopState, LoopTransitionError, ToolCallingLoop};
