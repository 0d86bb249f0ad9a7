//! Well-known service names for report rendering.

/// Look up the conventional service name for a TCP port.
///
/// Returns `None` if the port has no well-known assignment here.
pub fn service_name(port: u16) -> Option<&'static str> {
    let name = match port {
        20 => "ftp-data",
        21 => "ftp",
        22 => "ssh",
        23 => "telnet",
        25 => "smtp",
        53 => "dns",
        80 => "http",
        88 => "kerberos",
        110 => "pop3",
        111 => "rpcbind",
        135 => "msrpc",
        139 => "netbios-ssn",
        143 => "imap",
        389 => "ldap",
        443 => "https",
        445 => "microsoft-ds",
        465 => "smtps",
        587 => "submission",
        631 => "ipp",
        636 => "ldaps",
        873 => "rsync",
        993 => "imaps",
        995 => "pop3s",
        1433 => "ms-sql",
        1521 => "oracle",
        2049 => "nfs",
        2375 => "docker",
        3000 => "http-dev",
        3306 => "mysql",
        3389 => "rdp",
        5432 => "postgresql",
        5672 => "amqp",
        5900 => "vnc",
        6379 => "redis",
        6443 => "kubernetes",
        8000 | 8008 | 8081 | 8888 => "http-alt",
        8080 => "http-proxy",
        8443 => "https-alt",
        9090 => "prometheus",
        9092 => "kafka",
        9200 => "elasticsearch",
        11211 => "memcached",
        27017 => "mongodb",
        _ => return None,
    };
    Some(name)
}

/// Service name for display, `"unknown"` when unassigned.
pub fn service_label(port: u16) -> &'static str {
    service_name(port).unwrap_or("unknown")
}
