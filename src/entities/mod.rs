pub mod milk_entry;
pub mod supplier;
pub mod todo;
