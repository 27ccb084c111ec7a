//! Ticket persistence boundary.
//!
//! `update_status` is the only way a ticket changes state and must be an
//! indivisible compare-and-set: two redemptions racing on one ticket see
//! exactly one `true`.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use super::{Ticket, TicketStatus};
use crate::error::{Error, Result};

pub trait TicketStore: Send + Sync {
    /// Store a new ticket and return its assigned id. Check-in codes and user
    /// UUIDs are unique.
    fn insert(&self, ticket: Ticket) -> Result<u64>;

    fn find_by_check_in_code(&self, code: &str) -> Option<Ticket>;

    /// Move ticket `id` to `new_status` if it is currently `expected`.
    /// A move to `Redeemed` stamps `redeemed_at` with `at` (unix seconds).
    /// Returns whether the update happened.
    fn update_status(
        &self,
        id: u64,
        new_status: TicketStatus,
        expected: TicketStatus,
        at: i64,
    ) -> bool;

    fn code_exists(&self, code: &str) -> bool {
        self.find_by_check_in_code(code).is_some()
    }
}

#[derive(Default)]
struct Tables {
    next_id: u64,
    tickets: HashMap<u64, Ticket>,
    by_code: HashMap<String, u64>,
    by_uuid: HashMap<String, u64>,
}

/// In-process store behind a single mutex
#[derive(Default)]
pub struct MemoryTicketStore {
    tables: Mutex<Tables>,
}

impl MemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: u64) -> Option<Ticket> {
        self.lock().tickets.get(&id).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TicketStore for MemoryTicketStore {
    fn insert(&self, mut ticket: Ticket) -> Result<u64> {
        let mut tables = self.lock();
        if tables.by_code.contains_key(&ticket.check_in_code) {
            return Err(Error::DuplicateTicket(format!(
                "check-in code {}",
                ticket.check_in_code
            )));
        }
        if tables.by_uuid.contains_key(&ticket.user_uuid) {
            return Err(Error::DuplicateTicket(format!("user uuid {}", ticket.user_uuid)));
        }

        tables.next_id += 1;
        let id = tables.next_id;
        ticket.id = id;
        tables.by_code.insert(ticket.check_in_code.clone(), id);
        tables.by_uuid.insert(ticket.user_uuid.clone(), id);
        tables.tickets.insert(id, ticket);
        Ok(id)
    }

    fn find_by_check_in_code(&self, code: &str) -> Option<Ticket> {
        let tables = self.lock();
        let id = tables.by_code.get(code)?;
        tables.tickets.get(id).cloned()
    }

    fn update_status(
        &self,
        id: u64,
        new_status: TicketStatus,
        expected: TicketStatus,
        at: i64,
    ) -> bool {
        let mut tables = self.lock();
        let Some(ticket) = tables.tickets.get_mut(&id) else {
            return false;
        };
        if ticket.status != expected {
            return false;
        }
        ticket.status = new_status;
        if new_status == TicketStatus::Redeemed {
            ticket.redeemed_at = Some(at);
        }
        true
    }

    fn code_exists(&self, code: &str) -> bool {
        self.lock().by_code.contains_key(code)
    }
}
