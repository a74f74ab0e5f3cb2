mod app;
mod servers;

pub use app::ConsoleApp;
pub use servers::{record_connection, select_server};
