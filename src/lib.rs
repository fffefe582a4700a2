//! Administrative backend for a coaching center.
//!
//! The interesting part is [`cascade`]: deleting an owning record (a
//! teacher, a batch or a student) unwinds every dependent record in the
//! document store and every file it references in object storage. The two
//! stores share no transaction, so blob cleanup is best-effort and every
//! step re-derives its work from current store state.

pub mod admin;
pub mod cascade;
pub mod core;
pub mod db;
pub mod models;
pub mod otp;
pub mod storage;


pub use cascade::{CascadeError, CascadeManager, CascadeOptions, CascadeReport, DeletionPlan, SweepStats};
pub use core::config::CoachConfig;
pub use core::error::{CoachError, Result};
pub use db::{DocumentStore, HelixClient, HelixStore, MemoryStore};
pub use otp::{OtpStore, OtpVerdict};
pub use storage::{BlobStore, MemoryBlobStore, S3BlobStore};


pub const DEFAULT_HELIX_PORT: u16 = 6969;


pub const DEFAULT_OTP_TTL: u64 = 300;


pub const DEFAULT_OTP_CAPACITY: usize = 10_000;
