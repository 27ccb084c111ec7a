//! Issue and redeem tickets.
//!
//! Redemption checks, in order: check-in code (supplied or read from the
//! footer), rate limit, ticket lookup, ticket status, share alignment and
//! decode, payload signature and expiry, code match, and finally the atomic
//! `active → redeemed` transition.

use rand::rngs::OsRng;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::store::TicketStore;
use super::{RateLimiter, Ticket, TicketStatus, generate_check_in_code};
use crate::align::{Alignment, AlignmentEngine};
use crate::config::Config;
use crate::error::{Error, ErrorKind, Result};
use crate::payload::{PayloadSigner, TicketFields};
use crate::share::ShareGenerator;
use crate::share::label::{code_qr, compose_share_a, extract_check_in_code};
use crate::utils::imaging::{encode_png, png_base64};

/// Give up on finding an unused check-in code after this many draws
const MAX_CODE_ATTEMPTS: usize = 32;

/// Artifacts handed to the ticket holder at issuance
#[derive(Debug, Clone, Serialize)]
pub struct IssuedTicket {
    pub ticket_id: u64,
    pub user_uuid: String,
    pub check_in_code: String,
    pub expires_at: i64,
    /// PNG of the check-in code QR
    pub code_qr_base64: String,
    /// PNG of share A with its label footer
    pub share_a_base64: String,
    /// Signed payload, for audit
    pub original_payload: String,
}

/// A successful redemption
#[derive(Debug, Clone, Serialize)]
pub struct Redemption {
    pub ticket_id: u64,
    pub fields: TicketFields,
    /// Alignment strategy that recovered the payload
    pub strategy: &'static str,
    pub stacked_base64: String,
    pub aligned_share_a_base64: String,
}

/// A failed redemption, with whatever debug images were produced
#[derive(Debug, Error)]
#[error("{error}")]
pub struct Rejection {
    #[source]
    pub error: Error,
    pub stacked_base64: Option<String>,
    pub aligned_share_a_base64: Option<String>,
}

impl Rejection {
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    fn with_images(error: Error, alignment: &Alignment) -> Self {
        Self {
            error,
            stacked_base64: png_base64(&alignment.stacked).ok(),
            aligned_share_a_base64: png_base64(&alignment.aligned_share_a).ok(),
        }
    }

    /// JSON report for operators
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "valid": false,
            "error": self.kind(),
            "message": self.error.to_string(),
            "stacked_base64": self.stacked_base64,
            "aligned_share_a_base64": self.aligned_share_a_base64,
        })
    }
}

impl From<Error> for Rejection {
    fn from(error: Error) -> Self {
        Self {
            error,
            stacked_base64: None,
            aligned_share_a_base64: None,
        }
    }
}

pub struct TicketService<S: TicketStore> {
    store: S,
    signer: PayloadSigner,
    generator: ShareGenerator,
    engine: AlignmentEngine,
    rate_limiter: RateLimiter,
    ticket_ttl: i64,
}

impl<S: TicketStore> TicketService<S> {
    pub fn new(config: &Config, store: S) -> Result<Self> {
        let ticket_ttl = i64::try_from(config.ticket_ttl.as_secs())
            .map_err(|_| Error::Config("ticket TTL out of range".into()))?;
        Ok(Self {
            store,
            signer: PayloadSigner::new(&config.signing_secret)?,
            generator: ShareGenerator::default().with_border(config.marker_border),
            engine: AlignmentEngine::new(config.marker_border),
            rate_limiter: RateLimiter::new(config.rate_limit_window),
            ticket_ttl,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn signer(&self) -> &PayloadSigner {
        &self.signer
    }

    pub fn issue(&self, name: &str, email: &str) -> Result<IssuedTicket> {
        self.issue_at(name, email, chrono::Utc::now().timestamp())
    }

    /// Issue a ticket as of `now` (unix seconds)
    pub fn issue_at(&self, name: &str, email: &str, now: i64) -> Result<IssuedTicket> {
        let user_uuid = uuid::Uuid::new_v4().to_string();
        let check_in_code = self.unused_check_in_code()?;
        let expires_at = now + self.ticket_ttl;

        let fields = TicketFields {
            name: name.to_string(),
            email: email.to_string(),
            user_uuid: user_uuid.clone(),
            check_in_code: check_in_code.clone(),
            expires_at,
        };
        let payload = self.signer.build(&fields)?;
        let shares = self.generator.generate(&payload)?;
        let labeled = compose_share_a(&shares.share_a, &check_in_code, &user_uuid)?;

        let ticket_id = self.store.insert(Ticket {
            id: 0,
            user_uuid: user_uuid.clone(),
            check_in_code: check_in_code.clone(),
            share_b: encode_png(&shares.share_b)?,
            created_at: now,
            expires_at,
            status: TicketStatus::Active,
            redeemed_at: None,
        })?;
        info!(ticket_id, check_in_code = %check_in_code, expires_at, "issued ticket");

        Ok(IssuedTicket {
            ticket_id,
            user_uuid,
            check_in_code: check_in_code.clone(),
            expires_at,
            code_qr_base64: png_base64(&code_qr(&check_in_code)?)?,
            share_a_base64: png_base64(&labeled)?,
            original_payload: payload,
        })
    }

    fn unused_check_in_code(&self) -> Result<String> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = generate_check_in_code(&mut OsRng);
            if !self.store.code_exists(&code) {
                return Ok(code);
            }
        }
        Err(Error::DuplicateTicket("no unused check-in code found".into()))
    }

    pub fn redeem(
        &self,
        share_a: &[u8],
        check_in_code: Option<&str>,
    ) -> std::result::Result<Redemption, Rejection> {
        self.redeem_at(share_a, check_in_code, chrono::Utc::now().timestamp())
    }

    /// Redeem as of `now` (unix seconds)
    pub fn redeem_at(
        &self,
        share_a: &[u8],
        check_in_code: Option<&str>,
        now: i64,
    ) -> std::result::Result<Redemption, Rejection> {
        let code = match check_in_code.map(str::trim).filter(|c| !c.is_empty()) {
            Some(code) => code.to_string(),
            None => extract_check_in_code(share_a).ok_or(Error::MissingCheckInCode)?,
        };

        let result = self.redeem_code(share_a, &code, now);
        match &result {
            Ok(r) => info!(
                check_in_code = %code,
                ticket_id = r.ticket_id,
                strategy = r.strategy,
                "ticket redeemed"
            ),
            Err(rejection) => {
                info!(check_in_code = %code, error = ?rejection.kind(), "redemption rejected")
            }
        }
        result
    }

    fn redeem_code(
        &self,
        share_a: &[u8],
        code: &str,
        now: i64,
    ) -> std::result::Result<Redemption, Rejection> {
        self.rate_limiter.check(code)?;
        let ticket = self
            .store
            .find_by_check_in_code(code)
            .ok_or_else(|| Error::TicketNotFound(code.to_string()))?;

        match ticket.status {
            TicketStatus::Redeemed => return Err(Error::AlreadyRedeemed.into()),
            TicketStatus::Expired => return Err(Error::TicketExpired.into()),
            TicketStatus::Active if ticket.is_past_expiry(now) => {
                self.store
                    .update_status(ticket.id, TicketStatus::Expired, TicketStatus::Active, now);
                return Err(Error::TicketExpired.into());
            }
            TicketStatus::Active => {}
        }
        self.rate_limiter.check_and_record(code)?;

        let alignment = self.engine.align(share_a, &ticket.share_b)?;
        let Some(payload) = alignment.decoded.as_deref() else {
            warn!(
                check_in_code = %code,
                strategy = alignment.strategy,
                "no decodable reconstruction"
            );
            return Err(Rejection::with_images(Error::AlignmentExhausted, &alignment));
        };
        debug!(strategy = alignment.strategy, "decoded payload");

        let fields = self
            .signer
            .verify_at(payload, now)
            .map_err(|e| Rejection::with_images(e.into(), &alignment))?;
        if fields.check_in_code != ticket.check_in_code {
            let mismatch = Error::CheckInCodeMismatch {
                expected: ticket.check_in_code.clone(),
                found: fields.check_in_code.clone(),
            };
            return Err(Rejection::with_images(mismatch, &alignment));
        }

        if !self
            .store
            .update_status(ticket.id, TicketStatus::Redeemed, TicketStatus::Active, now)
        {
            let current = self.store.find_by_check_in_code(code).map(|t| t.status);
            let error = match current {
                Some(TicketStatus::Expired) => Error::TicketExpired,
                _ => Error::AlreadyRedeemed,
            };
            return Err(Rejection::with_images(error, &alignment));
        }

        Ok(Redemption {
            ticket_id: ticket.id,
            fields,
            strategy: alignment.strategy,
            stacked_base64: png_base64(&alignment.stacked)?,
            aligned_share_a_base64: png_base64(&alignment.aligned_share_a)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SigningSecret;
    use crate::ticket::MemoryTicketStore;
    use crate::utils::imaging::base64_to_bytes;
    use std::time::Duration;

    const NOW: i64 = 1_700_000_000;

    fn service(window: u64) -> TicketService<MemoryTicketStore> {
        let config = Config::new(SigningSecret::new("test-secret"))
            .with_rate_limit_window(Duration::from_secs(window));
        TicketService::new(&config, MemoryTicketStore::new()).unwrap()
    }

    #[test]
    fn test_issue_stores_active_ticket() {
        let service = service(0);
        let issued = service.issue_at("Ada", "ada@example.com", NOW).unwrap();
        assert_eq!(issued.expires_at, NOW + 86_400);
        assert_eq!(issued.check_in_code.len(), 8);

        let ticket = service.store().find_by_check_in_code(&issued.check_in_code).unwrap();
        assert_eq!(ticket.status, TicketStatus::Active);
        assert_eq!(ticket.user_uuid, issued.user_uuid);

        let fields = service.signer().verify_at(&issued.original_payload, NOW).unwrap();
        assert_eq!(fields.check_in_code, issued.check_in_code);
    }

    #[test]
    fn test_unknown_code() {
        let rejection = service(0).redeem_at(b"", Some("00000000"), NOW).unwrap_err();
        assert_eq!(rejection.kind(), ErrorKind::TicketNotFound);
    }

    #[test]
    fn test_missing_code() {
        let rejection = service(0).redeem_at(b"not an image", None, NOW).unwrap_err();
        assert_eq!(rejection.kind(), ErrorKind::MissingCheckInCode);
    }

    #[test]
    fn test_redeem_then_already_redeemed() {
        let service = service(0);
        let issued = service.issue_at("Ada", "ada@example.com", NOW).unwrap();
        let share_a = base64_to_bytes(&issued.share_a_base64).unwrap();

        let redemption = service.redeem_at(&share_a, None, NOW + 10).unwrap();
        assert_eq!(redemption.fields.check_in_code, issued.check_in_code);
        let ticket = service.store().get(redemption.ticket_id).unwrap();
        assert_eq!(ticket.redeemed_at, Some(NOW + 10));

        let again = service
            .redeem_at(&share_a, Some(&issued.check_in_code), NOW + 20)
            .unwrap_err();
        assert_eq!(again.kind(), ErrorKind::AlreadyRedeemed);
    }

    #[test]
    fn test_expired_ticket_is_marked() {
        let service = service(0);
        let issued = service.issue_at("Ada", "ada@example.com", NOW).unwrap();
        let share_a = base64_to_bytes(&issued.share_a_base64).unwrap();

        let rejection = service
            .redeem_at(&share_a, Some(&issued.check_in_code), NOW + 86_400)
            .unwrap_err();
        assert_eq!(rejection.kind(), ErrorKind::TicketExpired);
        let ticket = service.store().find_by_check_in_code(&issued.check_in_code).unwrap();
        assert_eq!(ticket.status, TicketStatus::Expired);
    }

    #[test]
    fn test_rate_limited_second_attempt() {
        let service = service(60);
        let issued = service.issue_at("Ada", "ada@example.com", NOW).unwrap();
        let first = service.redeem_at(b"garbage", Some(&issued.check_in_code), NOW).unwrap_err();
        assert_eq!(first.kind(), ErrorKind::InvalidImage);
        let second = service.redeem_at(b"garbage", Some(&issued.check_in_code), NOW).unwrap_err();
        assert_eq!(second.kind(), ErrorKind::RateLimited);
    }

    #[test]
    fn test_concurrent_attempts_pass_debounce_once() {
        let service = service(60);
        let issued = service.issue_at("Ada", "ada@example.com", NOW).unwrap();
        let code = issued.check_in_code.as_str();
        let kinds: Vec<ErrorKind> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| service.redeem_at(b"garbage", Some(code), NOW)))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap().unwrap_err().kind())
                .collect()
        });
        let limited = kinds.iter().filter(|k| **k == ErrorKind::RateLimited).count();
        assert_eq!(limited, 3);
    }

    #[test]
    fn test_rejection_json() {
        let rejection = Rejection::from(Error::AlreadyRedeemed);
        let json = rejection.to_json();
        assert_eq!(json["valid"], false);
        assert_eq!(json["error"], "already_redeemed");
        assert!(json["stacked_base64"].is_null());
    }
}
