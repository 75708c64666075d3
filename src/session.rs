mod controller;

#[cfg(test)]
mod tests;

pub use controller::{Session, SessionUpdate};
