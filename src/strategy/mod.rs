//! Strategy layer: eligibility gates, player status, line projection,
//! cautions, confidence scoring, parlay composition and explanations.
//!
//! Every engine is pure and holds only an `Arc<Rules>`; the service layer
//! in `engine` feeds them pre-fetched samples.

pub mod caution;
pub mod composition;
pub mod confidence;
pub mod eligibility;
pub mod explanation;
pub mod player_status;
pub mod projection;

pub use caution::CautionEngine;
pub use composition::{CompositionSettings, ParlayCompositionEngine};
pub use confidence::ConfidenceEngine;
pub use eligibility::EligibilityEngine;
pub use explanation::{Explanation, ExplanationEngine};
pub use player_status::PlayerStatusEngine;
pub use projection::LineProjectionEngine;
