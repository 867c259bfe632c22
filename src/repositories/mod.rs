pub(crate) mod answers;
pub(crate) mod attempts;
pub(crate) mod overrides;
pub(crate) mod questions;
pub(crate) mod tests;
pub(crate) mod users;
