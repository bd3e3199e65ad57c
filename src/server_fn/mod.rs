mod chatbots;

pub use chatbots::*;
