//! Portfolio domain
//!
//! Section dispatch, the scoring rule, owner-side submissions, and the
//! reviewer-side review operation.

pub mod review;
pub mod scoring;
pub mod section;
pub mod submissions;

pub use review::{ReviewRequest, ReviewService};
pub use scoring::{apply_removal, apply_transition, recompute_points, reconcile};
pub use section::{Section, ITEM_SECTIONS};
