//! Built-in operation kinds

mod create_link;
mod global_config;
mod simple_move_file;
mod speed_dial;

pub use create_link::CreateLink;
pub use global_config::{GlobalConfig, SettingsLocation};
pub use simple_move_file::SimpleMoveFile;
pub use speed_dial::AddKitsToSpeedDial;
