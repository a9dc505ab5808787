pub mod session;
pub mod history;
pub mod cherry;

#[cfg(test)]
pub(crate) mod fake;

pub use session::SessionService;
