// config module — TOML configuration, discovery and keybindings

pub mod keybindings;
pub mod loader;
pub mod types;
