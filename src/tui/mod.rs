//! TUI Module for the engine console
//!
//! Default front-end; `LOG_FORMAT=json|pretty` runs headless instead.
//!
//! # Keyboard Controls
//! - `q` or `Ctrl+C`: Quit
//! - `s` / `x`: Start / stop the engine
//! - `m` `c` `b` `r`: Cycle mode, chain, balance source, risk profile
//! - `t`: Toggle auto/manual strategy
//! - `p` / `o`: Edit contracts / OpenSea key (Enter saves, Esc cancels)
//! - `h` / `T` / `u`: RPC check / self test / reload settings
//! - `↑/k` `↓/j` `PgUp` `PgDn`: Scroll logs, `End/G`: follow the tail
//! - `l`: Toggle INFO/DEBUG logs

pub mod app;
pub mod event;
pub mod logging;
pub mod terminal;
pub mod ui;

pub use app::{AppState, InputMode, InputTarget};
pub use event::EventResult;
pub use logging::TuiLayer;
