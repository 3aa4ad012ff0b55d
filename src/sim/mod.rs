pub mod achievements;
pub mod boosts;
pub mod catalog;
pub mod economy;
pub mod events;
pub mod game;
pub mod offline;
pub mod state;
pub mod upgrades;
