//! Object storage backends.
//!
//! The [`backend::ObjectBackend`] trait abstracts over the bucket the
//! repository talks to.  [`aws::S3Backend`] targets AWS S3 and
//! S3-compatible services; [`memory::MemoryBackend`] keeps objects in
//! process.

pub mod aws;
pub mod backend;
pub mod memory;
