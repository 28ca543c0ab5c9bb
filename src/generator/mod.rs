pub mod assembler;
pub mod content;
pub mod context;
pub mod corpus;
pub mod outlet;
pub mod outline;
pub mod pipeline;
pub mod planner;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;
