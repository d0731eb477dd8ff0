pub mod achievement;
pub mod classifier;
pub mod distribution;
pub mod efficiency;
pub mod overdue;
pub mod progress;
pub mod rollup;
pub mod sample;
pub mod sla;
pub mod stats;
pub mod temporal;

pub use achievement::{compute_achievement, AchievementReport};
pub use classifier::CompletionClassifier;
pub use overdue::{compute_overdue, OverdueReport};
pub use sample::TicketSample;
pub use sla::{SlaOverrides, SlaRuleSet};
pub use temporal::{Buckets, Interval};
