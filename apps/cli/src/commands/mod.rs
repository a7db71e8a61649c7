//! 命令定义和实现

pub mod config;
pub mod presets;
pub mod simulate;

pub use config::ConfigCommand;
pub use simulate::SimulateCommand;
