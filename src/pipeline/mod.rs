pub mod assembler;
pub mod batch;
pub mod enhancer;
pub mod strategy;
