/*!
 * Segmentation rules (SRX).
 */

pub mod rules;

pub use rules::{FormatHandles, Rule, RuleSpec, SrxHeader, SrxStore, default_rules};
