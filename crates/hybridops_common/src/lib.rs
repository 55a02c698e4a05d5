//! HybridOps Common - shared protocol, intent parsing and confirm-token ledger
//!
//! Used by the supervisor (hybridopsd), the tool gate (toolgated) and the CLI.

pub mod config;
pub mod error;
pub mod i18n;
pub mod intent;
pub mod lang;
pub mod ledger;
pub mod logging;
pub mod normalize;
pub mod protocol;
pub mod secret;
pub mod tools;

pub use error::OpsError;
pub use lang::Language;
pub use ledger::{ConfirmError, TokenLedger};
pub use protocol::*;
pub use tools::{ToolDescriptor, ToolKind};
