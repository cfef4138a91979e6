//! Guild Encounter — a tick-driven narrative state machine for a
//! branching dialogue between an applicant and a gatekeeping clerk.
//!
//! Authored content lives in RON and is validated once at load. The
//! engine resolves node ids into presentable turns, applies status
//! effects and fail handling, and the presenter paces text reveal,
//! input gating and the ending cutscene one tick at a time.

pub mod core;
pub mod schema;
