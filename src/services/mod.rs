pub mod command;
pub mod playlist;
