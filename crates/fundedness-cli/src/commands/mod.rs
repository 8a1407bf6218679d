pub mod cefr;
pub mod simulation;
