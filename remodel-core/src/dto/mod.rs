//! Data Transfer Objects for communication with the job backend
//!
//! Request and response bodies that only exist on the wire. Domain entities
//! travel as-is; these wrap them with the envelope each endpoint expects.

pub mod job;
