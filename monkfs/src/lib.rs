//! monkfs: a read-only FUSE filesystem backed by the Monk File API.
//!
//! The remote tree is addressed purely by path. [`resolver::NodeResolver`]
//! turns filesystem callbacks into File API calls through
//! [`api::FileApiClient`], keeps attribute snapshots in a
//! [`cache::MetadataCache`] and reports failures as POSIX errnos
//! ([`errno`]). [`fuse::MonkFs`] hosts the resolver under rfuse3.

pub mod api;
pub mod cache;
pub mod config;
pub mod constants;
pub mod errno;
pub mod fuse;
pub mod path;
pub mod resolver;
