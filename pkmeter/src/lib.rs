//! pkmeter: generates a conky overlay from a stack of widgets
//!
//! Three entry points share this library:
//! - `conkyrc` composes the layout and drawing artifacts from configuration
//! - `update` refreshes one widget's cached data when it is due
//! - `get` reads one value back out of a widget's cache for conky to print

pub mod cache;
pub mod config;
pub mod draw;
pub mod error;
pub mod execution;
pub mod http;
pub mod layout;
pub mod logging;
pub mod path;
pub mod query;
pub mod theme;
pub mod update;
pub mod utils;
pub mod widgets;

pub use config::{Config, Paths};
pub use error::{ConfigError, WidgetError};
pub use layout::{compose, Layout};
pub use theme::Theme;
pub use widgets::{Widget, WidgetContext, WidgetRegistry};
