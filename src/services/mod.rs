pub(crate) mod attempt_finalize;
pub(crate) mod attempt_timing;
pub(crate) mod grading;
pub(crate) mod ordering;
pub(crate) mod scoring;
