//! Entity definitions for the Cycle data model

pub mod chama;
pub mod contribution;
pub mod cycle;
pub mod invite;
pub mod member;
pub mod payout;
pub mod user;
