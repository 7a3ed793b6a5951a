pub mod check;
pub mod connections;
pub mod run;
