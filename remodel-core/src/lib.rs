//! Remodel Core
//!
//! Core types shared by the remodel worker, client and CLI.
//!
//! This crate contains:
//! - Domain types: jobs, model analysis snapshots, operation directives and
//!   execution reports
//! - DTOs: request/response bodies exchanged with the job backend

pub mod domain;
pub mod dto;
