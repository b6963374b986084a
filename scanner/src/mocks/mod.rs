//! Mock provider implementations for testing.

pub mod ticket_store;

pub use ticket_store::InMemoryTicketStore;
