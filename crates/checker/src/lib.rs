mod checker;
mod limits;

pub use checker::{check, CheckFailed, CheckResult, Checker};
pub use limits::Limits;
