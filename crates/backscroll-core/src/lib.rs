//! # Backscroll Core
//!
//! Time-windowed retrieval over a reverse-chronological remote record
//! stream, with an append-only local index in front of it.
//!
//! This crate does no filesystem or network I/O of its own. Remote access
//! and index storage come in through the [`store::RemoteStore`] and
//! [`index::RecordIndex`] traits; in-memory implementations of both live
//! alongside them.
//!
//! | Module | Role |
//! |--------|------|
//! | [`snowflake`] | instant ⇄ snowflake ID codec |
//! | [`civil`] | fixed-offset civil zone with a US daylight-saving rule |
//! | [`range`] | `{date}` / `{date - date}` token parsing |
//! | [`anchor`] | `around`-based anchor search |
//! | [`expand`] | bidirectional expansion from an anchor |
//! | [`linear`] | linear backward walk |
//! | [`strategy`] | the two remote strategies behind one trait |
//! | [`retrieve`] | index-first orchestration with fallback |

pub mod anchor;
pub mod civil;
pub mod collect;
pub mod error;
pub mod expand;
pub mod index;
pub mod linear;
pub mod models;
pub mod range;
pub mod retrieve;
pub mod snowflake;
pub mod store;
pub mod strategy;
