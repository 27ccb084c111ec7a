//! Error types for ticket issuance and redemption

use thiserror::Error;

use crate::payload::TicketFields;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure to accept a signed payload string
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("Malformed payload: expected 6 '|'-delimited fields, found {0}")]
    MalformedPayload(usize),

    #[error("Invalid expiry: {0:?}")]
    InvalidExpiry(String),

    #[error("Signature mismatch")]
    SignatureMismatch,

    /// Signature is valid but the payload is past its expiry
    #[error("Payload expired at {}", .0.expires_at)]
    Expired(Box<TicketFields>),

    #[error("Field {0} contains the '|' delimiter")]
    InvalidField(&'static str),
}

impl PayloadError {
    /// Parsed fields, available only when the payload was authentic but expired
    pub fn fields(&self) -> Option<&TicketFields> {
        match self {
            PayloadError::Expired(fields) => Some(fields),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error("Invalid image data: {0}")]
    InvalidImage(String),

    #[error("No alignment strategy produced a decodable reconstruction")]
    AlignmentExhausted,

    #[error("Check-in code mismatch: ticket {expected}, payload {found}")]
    CheckInCodeMismatch { expected: String, found: String },

    #[error("Ticket already redeemed")]
    AlreadyRedeemed,

    #[error("Ticket expired")]
    TicketExpired,

    #[error("Ticket not found: {0}")]
    TicketNotFound(String),

    #[error("Too many verification attempts for {0}")]
    RateLimited(String),

    #[error("Missing check-in code (could not read it from the image)")]
    MissingCheckInCode,

    #[error("Duplicate ticket: {0}")]
    DuplicateTicket(String),

    #[error("QR encoding error: {0}")]
    QrEncode(String),

    #[error("Image encoding error: {0}")]
    ImageEncode(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Flat error discriminant for callers that only branch on the failure kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MalformedPayload,
    InvalidExpiry,
    SignatureMismatch,
    Expired,
    InvalidField,
    InvalidImage,
    AlignmentExhausted,
    CheckInCodeMismatch,
    AlreadyRedeemed,
    TicketExpired,
    TicketNotFound,
    RateLimited,
    MissingCheckInCode,
    DuplicateTicket,
    QrEncode,
    ImageEncode,
    Config,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Payload(err) => match err {
                PayloadError::MalformedPayload(_) => ErrorKind::MalformedPayload,
                PayloadError::InvalidExpiry(_) => ErrorKind::InvalidExpiry,
                PayloadError::SignatureMismatch => ErrorKind::SignatureMismatch,
                PayloadError::Expired(_) => ErrorKind::Expired,
                PayloadError::InvalidField(_) => ErrorKind::InvalidField,
            },
            Error::InvalidImage(_) => ErrorKind::InvalidImage,
            Error::AlignmentExhausted => ErrorKind::AlignmentExhausted,
            Error::CheckInCodeMismatch { .. } => ErrorKind::CheckInCodeMismatch,
            Error::AlreadyRedeemed => ErrorKind::AlreadyRedeemed,
            Error::TicketExpired => ErrorKind::TicketExpired,
            Error::TicketNotFound(_) => ErrorKind::TicketNotFound,
            Error::RateLimited(_) => ErrorKind::RateLimited,
            Error::MissingCheckInCode => ErrorKind::MissingCheckInCode,
            Error::DuplicateTicket(_) => ErrorKind::DuplicateTicket,
            Error::QrEncode(_) => ErrorKind::QrEncode,
            Error::ImageEncode(_) => ErrorKind::ImageEncode,
            Error::Config(_) => ErrorKind::Config,
        }
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Decoding(_)
            | image::ImageError::Unsupported(_)
            | image::ImageError::Limits(_) => Error::InvalidImage(err.to_string()),
            other => Error::ImageEncode(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_errors_keep_their_kind() {
        let err: Error = PayloadError::SignatureMismatch.into();
        assert_eq!(err.kind(), ErrorKind::SignatureMismatch);
        assert_eq!(err.to_string(), "Signature mismatch");
    }

    #[test]
    fn test_expired_carries_fields() {
        let fields = TicketFields {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            user_uuid: "u-1".into(),
            check_in_code: "87654321".into(),
            expires_at: 10,
        };
        let err = PayloadError::Expired(Box::new(fields.clone()));
        assert_eq!(err.fields(), Some(&fields));
        assert!(PayloadError::SignatureMismatch.fields().is_none());
    }
}
