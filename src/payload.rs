//! Signed ticket payloads.
//!
//! The canonical form is `name|email|user_uuid|check_in_code|expires_at`; the
//! HMAC-SHA256 of that string (hex) is appended as a sixth `|` field. Signing
//! and verification are pure functions of the input and the process secret.

use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::config::SigningSecret;
use crate::error::{Error, PayloadError};

type HmacSha256 = Hmac<Sha256>;

/// Field delimiter of the canonical form.
pub const DELIMITER: char = '|';
const FIELD_COUNT: usize = 6;

/// Ticket fields carried inside the QR payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketFields {
    /// Holder name
    pub name: String,
    /// Holder email
    pub email: String,
    /// Ticket holder UUID
    pub user_uuid: String,
    /// Short numeric lookup code
    pub check_in_code: String,
    /// Expiry, unix seconds
    pub expires_at: i64,
}

impl TicketFields {
    /// Canonical signable string (the first five payload fields)
    pub fn canonical(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}",
            self.name, self.email, self.user_uuid, self.check_in_code, self.expires_at
        )
    }

    fn check_delimiters(&self) -> Result<(), PayloadError> {
        let fields = [
            ("name", &self.name),
            ("email", &self.email),
            ("user_uuid", &self.user_uuid),
            ("check_in_code", &self.check_in_code),
        ];
        for (label, value) in fields {
            if value.contains(DELIMITER) {
                return Err(PayloadError::InvalidField(label));
            }
        }
        Ok(())
    }
}

/// Keyed signer/verifier for ticket payloads.
///
/// Holds the keyed HMAC state rather than the raw secret; every signature
/// starts from a clone of it.
#[derive(Clone)]
pub struct PayloadSigner {
    mac: HmacSha256,
}

impl PayloadSigner {
    pub fn new(secret: &SigningSecret) -> Result<Self, Error> {
        let mac = HmacSha256::new_from_slice(secret.expose())
            .map_err(|e| Error::Config(format!("signing secret rejected: {e}")))?;
        Ok(Self { mac })
    }

    /// Hex HMAC-SHA256 of the UTF-8 bytes of `canonical`
    pub fn sign(&self, canonical: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(canonical.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Build the signed payload string for `fields`
    pub fn build(&self, fields: &TicketFields) -> Result<String, PayloadError> {
        fields.check_delimiters()?;
        let canonical = fields.canonical();
        let signature = self.sign(&canonical);
        Ok(format!("{canonical}{DELIMITER}{signature}"))
    }

    /// Verify a payload against the current wall clock
    pub fn verify(&self, payload: &str) -> Result<TicketFields, PayloadError> {
        self.verify_at(payload, chrono::Utc::now().timestamp())
    }

    /// Verify a payload as of `now` (unix seconds).
    ///
    /// A payload is expired once `now >= expires_at`. Expired payloads with a
    /// valid signature still hand back their parsed fields inside
    /// [`PayloadError::Expired`].
    pub fn verify_at(&self, payload: &str, now: i64) -> Result<TicketFields, PayloadError> {
        let parts: Vec<&str> = payload.split(DELIMITER).collect();
        if parts.len() != FIELD_COUNT {
            return Err(PayloadError::MalformedPayload(parts.len()));
        }

        let expires_at = parts[4]
            .parse::<i64>()
            .map_err(|_| PayloadError::InvalidExpiry(parts[4].to_string()))?;

        let fields = TicketFields {
            name: parts[0].to_string(),
            email: parts[1].to_string(),
            user_uuid: parts[2].to_string(),
            check_in_code: parts[3].to_string(),
            expires_at,
        };

        // Sign the fields exactly as received; "+5" and "05" parse like "5".
        let (signed, signature) = payload
            .rsplit_once(DELIMITER)
            .ok_or(PayloadError::MalformedPayload(parts.len()))?;
        let expected = self.sign(signed);
        if !bool::from(expected.as_bytes().ct_eq(signature.as_bytes())) {
            return Err(PayloadError::SignatureMismatch);
        }

        if expires_at <= now {
            return Err(PayloadError::Expired(Box::new(fields)));
        }
        Ok(fields)
    }
}

impl std::fmt::Debug for PayloadSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadSigner").finish_non_exhaustive()
    }
}
