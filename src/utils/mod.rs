pub mod format;
pub mod parallel;
