//! Agents for callassist
//!
//! The transcript router takes a live call transcript, optionally looks
//! things up through its tools, and answers with a markdown report.

pub mod router;

pub use router::{parse_router_output, RouterInput, TranscriptRouter, ROUTER_INSTRUCTIONS};
