//! Wire protocol for the judgewire event socket.
//!
//! This crate defines the named-event surface shared by the client and the
//! judging server:
//! - `ClientEvent` / `ServerEvent` - tagged request, reply, and broadcast kinds
//! - `RequestToken` - opaque correlation between a request and its reply
//! - Domain record shapes for the judging deployment (hacks, judges, ratings,
//!   superlatives)

pub mod event;
pub mod records;
pub mod token;

pub use event::{ClientEvent, ProtocolFault, Reply, ReplyOutcome, Routed, ServerEvent};
pub use records::{
    AdminSnapshot, Hack, HackAssignment, HackDraft, Judge, JudgeDraft, Rating, SharedSnapshot,
    Superlative, SuperlativeDraft, SuperlativePlacement, TableKind,
};
pub use token::RequestToken;
