pub mod chat;
pub mod db_tool;
