//! Dungeon battle-log viewer built on tui-dispatch
//!
//! The library holds the event model, the replay fold and the store pieces;
//! the binary wires them to a terminal.

pub mod action;
pub mod api;
pub mod battle;
pub mod components;
pub mod config;
pub mod effect;
pub mod reducer;
pub mod replay;
pub mod state;
