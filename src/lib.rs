//! # Backscroll
//!
//! Time-windowed history retrieval for chat channels, with an append-only
//! local index in front of the remote API.
//!
//! A free-text question such as `what did we decide {03/04/2024 - Today}?`
//! carries a range token. Backscroll resolves it to a UTC window in a
//! configured civil timezone, serves the window from the local index when
//! it has any records for it, and otherwise pulls it from the remote store
//! by jumping near the window and walking outward.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────────┐   ┌──────────────────┐
//! │ RangeParser  │──▶│    Retriever     │──▶│  HttpRemoteStore │
//! │ {A} / {A-B}  │   │ index → anchored │   │ before/after/    │
//! └──────────────┘   │ → linear         │   │ around           │
//!                    └────────┬─────────┘   └──────────────────┘
//!                             │ query / backfill
//!                             ▼
//!                    ┌──────────────────┐
//!                    │    JsonlIndex    │◀── bsc ingest
//!                    │ {ch}/{yyyy}/{mm} │
//!                    └──────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! bsc window "{01/10/2024}"                  # show the resolved UTC window
//! bsc ingest 1234 --file messages.jsonl      # feed the local index
//! bsc query 1234 "{01/10/2024}"              # index-only lookup
//! bsc fetch 1234 "{Today}" --max 200         # full retrieval
//! bsc stats                                  # what the index holds
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`jsonl_index`] | On-disk append-only index |
//! | [`remote_http`] | REST client implementing `RemoteStore` |
//! | [`fetch`] | `window`, `query` and `fetch` commands |
//! | [`ingest`] | Live ingestion from NDJSON |
//! | [`stats`] | Index statistics |
//!
//! The algorithms themselves live in [`backscroll_core`].

pub mod config;
pub mod fetch;
pub mod ingest;
pub mod jsonl_index;
pub mod remote_http;
pub mod stats;
