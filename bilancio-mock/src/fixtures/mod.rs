pub mod fundamentals;
pub mod history;
pub mod symbols;
