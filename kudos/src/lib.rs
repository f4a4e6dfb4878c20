pub mod cli;
pub mod commands;
pub mod leaderboard;
pub mod logging;
pub mod render;
