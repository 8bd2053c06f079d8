pub mod command;
pub mod controller;
pub mod evaluator;
pub mod persistence;
pub mod resume;
pub mod store;
pub mod timing;
pub mod typewriter;
