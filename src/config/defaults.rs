/// Default connect timeout, seconds
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default session event channel capacity
pub const DEFAULT_EVENT_BUFFER: usize = 128;

/// Default telnet console port
pub const DEFAULT_SERVER_PORT: u16 = 8765;

/// Stock player command templates seeded into a fresh configuration
pub const DEFAULT_PLAYER_COMMANDS: &[(&str, &str)] = &[
    ("Kick", "kick {name}"),
    ("Ban", "ban {name}"),
    ("Ban IP", "ban-ip {ip}"),
    ("Op", "op {name}"),
    ("Deop", "deop {name}"),
    ("Teleport to spawn", "tp {name} 0 64 0"),
];
