//! Named events exchanged with the judging server.
//!
//! Events are adjacently tagged (`event` + `data`) so the wire matches the
//! socket library's named-event surface. Every request kind carries a
//! correlation token and is paired with exactly one `<kind>_response` reply
//! kind; broadcast and fault kinds carry no token.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::records::{
    AdminSnapshot, HackDraft, JudgeDraft, Rating, SharedSnapshot, SuperlativeDraft,
    SuperlativePlacement, TableKind,
};
use crate::token::RequestToken;

/// Event emitted by the client. Every kind carries a correlation token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Create a hack record.
    AddHack { seq: RequestToken, hack: HackDraft },
    /// Create a judge record.
    AddJudge { seq: RequestToken, judge: JudgeDraft },
    /// Create a superlative category.
    AddSuperlative {
        seq: RequestToken,
        superlative: SuperlativeDraft,
    },
    /// Create a row in an arbitrary table.
    AddRow {
        seq: RequestToken,
        table: TableKind,
        row: Value,
    },
    /// Modify a row in an arbitrary table.
    ModifyRow {
        seq: RequestToken,
        table: TableKind,
        row_id: i64,
        changes: Value,
    },
    /// Submit a judge's score for a hack.
    RateHack { seq: RequestToken, rating: Rating },
    /// Submit a judge's first/second choice for a superlative.
    RankSuperlative {
        seq: RequestToken,
        placement: SuperlativePlacement,
    },
    /// Reorder a judge's assigned hacks.
    SetJudgeHackPriority {
        seq: RequestToken,
        judge_id: i64,
        hack_ids: Vec<i64>,
    },
    /// Toggle delivery of judge-facing state broadcasts.
    SetSynchronizeShared { seq: RequestToken, enabled: bool },
    /// Toggle delivery of admin-console state broadcasts.
    SetSynchronizeAdmin { seq: RequestToken, enabled: bool },
    /// Present the admin-console secret.
    Authenticate { seq: RequestToken, secret: String },
    /// Present a judge's personal secret.
    Login { seq: RequestToken, secret: String },
}

impl ClientEvent {
    /// Wire name of this event kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AddHack { .. } => "add_hack",
            Self::AddJudge { .. } => "add_judge",
            Self::AddSuperlative { .. } => "add_superlative",
            Self::AddRow { .. } => "add_row",
            Self::ModifyRow { .. } => "modify_row",
            Self::RateHack { .. } => "rate_hack",
            Self::RankSuperlative { .. } => "rank_superlative",
            Self::SetJudgeHackPriority { .. } => "set_judge_hack_priority",
            Self::SetSynchronizeShared { .. } => "set_synchronize_shared",
            Self::SetSynchronizeAdmin { .. } => "set_synchronize_admin",
            Self::Authenticate { .. } => "authenticate",
            Self::Login { .. } => "login",
        }
    }

    /// Correlation token injected at send time.
    #[must_use]
    pub fn seq(&self) -> RequestToken {
        match self {
            Self::AddHack { seq, .. }
            | Self::AddJudge { seq, .. }
            | Self::AddSuperlative { seq, .. }
            | Self::AddRow { seq, .. }
            | Self::ModifyRow { seq, .. }
            | Self::RateHack { seq, .. }
            | Self::RankSuperlative { seq, .. }
            | Self::SetJudgeHackPriority { seq, .. }
            | Self::SetSynchronizeShared { seq, .. }
            | Self::SetSynchronizeAdmin { seq, .. }
            | Self::Authenticate { seq, .. }
            | Self::Login { seq, .. } => *seq,
        }
    }
}

/// Correlated reply envelope: the echoed token plus the outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply {
    pub seq: RequestToken,
    #[serde(flatten)]
    pub outcome: ReplyOutcome,
}

/// Result half of a reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReplyOutcome {
    /// The request was applied; `data` holds the result record.
    Success { data: Value },
    /// The request was rejected.
    Failure { message: String },
}

/// Out-of-band report of a malformed or rejected request.
///
/// Carries the wire name of the originating event, not a correlation token;
/// it therefore settles no pending request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolFault {
    pub origin: String,
    pub message: String,
}

/// Event delivered by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    AddHackResponse(Reply),
    AddJudgeResponse(Reply),
    AddSuperlativeResponse(Reply),
    AddRowResponse(Reply),
    ModifyRowResponse(Reply),
    RateHackResponse(Reply),
    RankSuperlativeResponse(Reply),
    SetJudgeHackPriorityResponse(Reply),
    SetSynchronizeSharedResponse(Reply),
    SetSynchronizeAdminResponse(Reply),
    AuthenticateResponse(Reply),
    LoginResponse(Reply),
    /// Judge-facing state broadcast. Not correlated to any request.
    SynchronizeShared(SharedSnapshot),
    /// Admin-console state broadcast. Not correlated to any request.
    SynchronizeAdmin(AdminSnapshot),
    /// Out-of-band fault report.
    ProtocolError(ProtocolFault),
}

/// A server event sorted by delivery class.
#[derive(Debug)]
pub enum Routed {
    /// Reply that must resolve a pending request; `origin` names the request
    /// kind that produced it.
    Reply { origin: &'static str, reply: Reply },
    /// Judge-facing broadcast.
    Shared(SharedSnapshot),
    /// Admin-console broadcast.
    Admin(AdminSnapshot),
    /// Out-of-band fault report.
    Fault(ProtocolFault),
}

impl ServerEvent {
    /// Wire name of this event kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AddHackResponse(_) => "add_hack_response",
            Self::AddJudgeResponse(_) => "add_judge_response",
            Self::AddSuperlativeResponse(_) => "add_superlative_response",
            Self::AddRowResponse(_) => "add_row_response",
            Self::ModifyRowResponse(_) => "modify_row_response",
            Self::RateHackResponse(_) => "rate_hack_response",
            Self::RankSuperlativeResponse(_) => "rank_superlative_response",
            Self::SetJudgeHackPriorityResponse(_) => "set_judge_hack_priority_response",
            Self::SetSynchronizeSharedResponse(_) => "set_synchronize_shared_response",
            Self::SetSynchronizeAdminResponse(_) => "set_synchronize_admin_response",
            Self::AuthenticateResponse(_) => "authenticate_response",
            Self::LoginResponse(_) => "login_response",
            Self::SynchronizeShared(_) => "synchronize_shared",
            Self::SynchronizeAdmin(_) => "synchronize_admin",
            Self::ProtocolError(_) => "protocol_error",
        }
    }

    /// Route an inbound event by delivery class.
    ///
    /// This is the full reply-pairing table: one arm per response kind.
    /// Adding a request/response pair means adding one variant here and one
    /// arm below.
    #[must_use]
    pub fn route(self) -> Routed {
        match self {
            Self::AddHackResponse(reply) => Routed::Reply {
                origin: "add_hack",
                reply,
            },
            Self::AddJudgeResponse(reply) => Routed::Reply {
                origin: "add_judge",
                reply,
            },
            Self::AddSuperlativeResponse(reply) => Routed::Reply {
                origin: "add_superlative",
                reply,
            },
            Self::AddRowResponse(reply) => Routed::Reply {
                origin: "add_row",
                reply,
            },
            Self::ModifyRowResponse(reply) => Routed::Reply {
                origin: "modify_row",
                reply,
            },
            Self::RateHackResponse(reply) => Routed::Reply {
                origin: "rate_hack",
                reply,
            },
            Self::RankSuperlativeResponse(reply) => Routed::Reply {
                origin: "rank_superlative",
                reply,
            },
            Self::SetJudgeHackPriorityResponse(reply) => Routed::Reply {
                origin: "set_judge_hack_priority",
                reply,
            },
            Self::SetSynchronizeSharedResponse(reply) => Routed::Reply {
                origin: "set_synchronize_shared",
                reply,
            },
            Self::SetSynchronizeAdminResponse(reply) => Routed::Reply {
                origin: "set_synchronize_admin",
                reply,
            },
            Self::AuthenticateResponse(reply) => Routed::Reply {
                origin: "authenticate",
                reply,
            },
            Self::LoginResponse(reply) => Routed::Reply {
                origin: "login",
                reply,
            },
            Self::SynchronizeShared(state) => Routed::Shared(state),
            Self::SynchronizeAdmin(state) => Routed::Admin(state),
            Self::ProtocolError(fault) => Routed::Fault(fault),
        }
    }
}
