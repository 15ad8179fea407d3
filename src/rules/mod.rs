//! Pattern/replacement rules and the engine that applies them

pub mod engine;
pub mod rule;
pub mod set;

pub use engine::{apply, Applied};
pub use rule::{Matcher, Replacement, Rule, RuleScope};
pub use set::RuleSet;
