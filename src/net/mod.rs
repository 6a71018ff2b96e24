//! URL, DNS, and host reachability helpers (the `ubrl` tool)

pub mod dns;
pub mod server;
pub mod url;

pub use dns::{Dns, PROVIDERS};
pub use server::Server;
pub use self::url::{is_valid_domain, UrlInfo};
