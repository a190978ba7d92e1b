//! Two-factor challenge contract between an exchange and the interactive layer.

use async_trait::async_trait;

use crate::host::HostAddress;

/// How the host delivers one-time codes to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum OtpDelivery {
    App,
    Sms,
    Unknown,
}

/// Why the exchange is asking for a one-time code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeReason {
    /// The host requires a code beyond username/secret.
    CodeRequired { delivery: OtpDelivery },
    /// The previously submitted code was rejected.
    CodeRejected,
}

/// Immutable context handed to a [`ChallengeHandler`] for one prompt round.
///
/// `retry_count` is the number of codes the host has already rejected during
/// this login; `retry_count > 0` means the user should be told their last
/// code was wrong.
#[derive(Debug, Clone)]
pub struct ChallengeContext {
    pub host: HostAddress,
    pub reason: ChallengeReason,
    pub retry_count: u32,
}

impl ChallengeContext {
    pub fn is_retry(&self) -> bool {
        self.retry_count > 0
    }
}

/// One-time code produced by the interactive layer, consumed exactly once by
/// the in-flight exchange.
#[derive(Debug, Clone)]
pub struct ChallengeResult {
    pub code: String,
    pub remember_device: bool,
}

impl ChallengeResult {
    pub fn code(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            remember_device: false,
        }
    }
}

/// Marker for a user-cancelled challenge. Not an error: cancellation is a
/// normal termination path of a login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChallengeCancelled;

/// Interactive capability that produces a one-time code or a cancellation.
///
/// Implementations are typically prompts (CLI or UI). A handler must be safe
/// to invoke repeatedly: the exchange calls it once per rejected code plus
/// one final accepted code.
#[async_trait]
pub trait ChallengeHandler: Send + Sync {
    async fn resolve(
        &self,
        context: &ChallengeContext,
    ) -> std::result::Result<ChallengeResult, ChallengeCancelled>;
}

/// Challenge-resolution callback passed into
/// [`RemoteAuthClient::exchange_credentials`](crate::client::RemoteAuthClient::exchange_credentials).
///
/// The orchestrator implements this to keep the remote client decoupled from
/// the interactive layer: the client only reports *why* it needs a code, and
/// the resolver owns state transitions, retry accounting, and the handler
/// wait. An exchange may call it zero or more times.
#[async_trait]
pub trait ChallengeResolver: Send + Sync {
    async fn resolve(
        &self,
        reason: ChallengeReason,
    ) -> std::result::Result<ChallengeResult, ChallengeCancelled>;
}

/// Handler for non-interactive paths (cached-credential login): any challenge
/// immediately cancels instead of prompting.
#[derive(Debug, Default, Clone, Copy)]
pub struct NonInteractiveHandler;

#[async_trait]
impl ChallengeHandler for NonInteractiveHandler {
    async fn resolve(
        &self,
        _context: &ChallengeContext,
    ) -> std::result::Result<ChallengeResult, ChallengeCancelled> {
        Err(ChallengeCancelled)
    }
}
