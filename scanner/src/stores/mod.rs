//! Production provider implementations.

#[cfg(feature = "postgres")]
pub mod postgres;
