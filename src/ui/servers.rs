use crate::config::{ClientConfig, ServerEntry, DEFAULT_SERVER_PORT};

/// Pick the server entry to dial.
///
/// An explicit override wins, then the last-used entry, then the first
/// configured one. Returns `None` when nothing is configured and no
/// override was given.
pub fn select_server(config: &ClientConfig, override_address: Option<&str>) -> Option<ServerEntry> {
    if let Some(address) = override_address {
        return Some(ServerEntry::new("command line", qualify(address)));
    }

    config
        .servers
        .iter()
        .find(|entry| entry.last_used)
        .or_else(|| config.servers.first())
        .cloned()
}

/// Append the default console port when the address has none
fn qualify(address: &str) -> String {
    if address.contains(':') {
        address.to_string()
    } else {
        format!("{}:{}", address, DEFAULT_SERVER_PORT)
    }
}

/// Record a successful connection in the server list.
///
/// Updates the matching entry or adds a new one, and marks exactly that
/// entry as last-used.
pub fn record_connection(servers: &mut Vec<ServerEntry>, name: &str, address: &str) {
    let mut found = false;
    for entry in servers.iter_mut() {
        if entry.address == address {
            entry.last_used = true;
            found = true;
        } else {
            entry.last_used = false;
        }
    }

    if !found {
        let mut entry = ServerEntry::new(name, address);
        entry.last_used = true;
        servers.push(entry);
    }
}
