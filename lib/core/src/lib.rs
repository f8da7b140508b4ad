//! Core domain types and utilities for the caby platform.
//!
//! This crate provides the foundational types, error handling, and shared
//! business rules used throughout the caby taxi-business backend.

pub mod earnings;
pub mod error;
pub mod id;

pub use earnings::{EarningInput, calculate_earning};
pub use error::Result;
pub use id::{
    BounceRecordId, ComplaintRecordId, NotificationId, OrganizationId, SessionId, UserId,
};
