pub mod audit;
pub mod board;
pub mod board_post;
pub mod board_template;
pub mod category;
pub mod settings;
pub mod skin;
pub mod user;
