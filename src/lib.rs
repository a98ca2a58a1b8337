//! # Code Assistant
//!
//! Chained AI code transformations over wiki pages, plus a change-impact
//! heuristic, driven from a CLI or a small HTTP service.
//!
//! The pipeline logic lives in `code_assistant_core`; this crate adds the
//! HTTP client for the AI backend, configuration, session state, and the
//! two front ends.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐
//! │   CLI    │──┐   ┌──────────┐   ┌──────────────┐   ┌─────────────┐
//! │(cassist) │  ├──▶│ Session  │──▶│ orchestrator │──▶│ HttpBackend │──▶ AI backend
//! └──────────┘  │   │ busy flag│   │ impact       │   │  (reqwest)  │
//! ┌──────────┐  │   └──────────┘   └──────────────┘   └─────────────┘
//! │   HTTP   │──┘
//! │  (axum)  │
//! └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! cassist spaces
//! cassist run ENG "Parser" --language rust --action "Optimize Performance" --impact
//! cassist serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`client`] | HTTP client implementing the backend traits |
//! | [`session`] | Per-user state and the busy flag |
//! | [`catalog`] | Actions, languages, and formats offered to users |
//! | [`export`] | Writing rendered exports to disk |
//! | [`logging`] | Tracing subscriber setup |
//! | [`server`] | HTTP service |

pub mod catalog;
pub mod client;
pub mod config;
pub mod export;
pub mod logging;
pub mod server;
pub mod session;
