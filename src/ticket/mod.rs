//! Ticket records and the issue/redeem workflow around the codec

pub mod rate_limit;
pub mod service;
pub mod store;

use rand::{CryptoRng, Rng};
use serde::Serialize;

pub use rate_limit::RateLimiter;
pub use service::{IssuedTicket, Redemption, Rejection, TicketService};
pub use store::{MemoryTicketStore, TicketStore};

/// Digits in a generated check-in code
pub const CHECK_IN_CODE_LEN: usize = 8;

/// Ticket lifecycle state. `Redeemed` and `Expired` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Active,
    Redeemed,
    Expired,
}

impl TicketStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TicketStatus::Active)
    }
}

/// Stored ticket record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    /// Assigned by the store on insert
    pub id: u64,
    pub user_uuid: String,
    pub check_in_code: String,
    /// PNG-encoded share B
    pub share_b: Vec<u8>,
    /// Unix seconds
    pub created_at: i64,
    /// Unix seconds
    pub expires_at: i64,
    pub status: TicketStatus,
    pub redeemed_at: Option<i64>,
}

impl Ticket {
    /// Whether the ticket is past its expiry at `now`
    pub fn is_past_expiry(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}

/// Random decimal check-in code of [`CHECK_IN_CODE_LEN`] digits
pub fn generate_check_in_code<R: Rng + CryptoRng>(rng: &mut R) -> String {
    (0..CHECK_IN_CODE_LEN)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}
