pub mod content;
pub mod document;
pub mod outline;
pub mod query;

// Include tests
#[cfg(test)]
mod tests;
