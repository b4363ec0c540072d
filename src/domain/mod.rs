//! Core domain types and traits

pub mod fake;
pub mod ports;

pub use fake::FakeArray;
pub use ports::{ApiCall, ArrayApi, Member, MembershipResource};
