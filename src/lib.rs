//! Client core for the business viability dashboard.
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │   Backend    │────►│  Controller  │────►│ Orchestrator │
//! │  (REST/JSON) │     │ (arrivals)   │     │  (reducer)   │
//! └──────────────┘     └──────────────┘     └──────────────┘
//!        ▲                    │                    │
//!        │                    ▼                    ▼
//!        │             ┌──────────────┐     ┌──────────────┐
//!        └─────────────│   Commands   │◄────│    State     │
//!                      │ (fetch/etc)  │     │ (generation) │
//!                      └──────────────┘     └──────────────┘
//! ```
//!
//! The orchestrator never performs I/O. The controller executes the
//! commands it returns and feeds every response back in as an event, tagged
//! with the generation of the analysis that requested it.

pub mod api;
pub mod catalog;
pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod orchestrator;
pub mod view;
