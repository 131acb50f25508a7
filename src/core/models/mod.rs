pub mod file_task;
pub mod outcome;
pub mod recipient_set;
