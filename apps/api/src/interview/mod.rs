//! Interview: the adaptive session core and its HTTP surface.
//!
//! Leaves first: decisions, timing, competency, difficulty, history and
//! strategy feed question_gen; session orchestrates them; transcript, registry
//! and handlers sit on top.

pub mod competency;
pub mod decisions;
pub mod difficulty;
pub mod handlers;
pub mod history;
pub mod prompts;
pub mod question_gen;
pub mod registry;
pub mod session;
pub mod strategy;
pub mod timing;
pub mod transcript;

#[cfg(test)]
pub(crate) mod test_support;
