use std::path::Path;

use serde::{Deserialize, Serialize};

/// Addressing for ZeroMQ socket endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "address")]
pub enum Transport {
    /// Unix domain socket under `/tmp/siebwerk/`. Fastest for same-host runs.
    Ipc(String),

    /// TCP for distributed deployment.
    Tcp { host: String, port: u16 },
}

impl Transport {
    /// Create an IPC transport with the given socket name.
    pub fn ipc(name: &str) -> Self {
        Self::Ipc(name.to_string())
    }

    /// Create a TCP transport with the given host and port.
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::Tcp {
            host: host.into(),
            port,
        }
    }

    /// Generate the ZeroMQ endpoint address string.
    pub fn endpoint(&self) -> String {
        match self {
            Self::Ipc(name) => format!("ipc:///tmp/siebwerk/{name}.sock"),
            Self::Tcp { host, port } => format!("tcp://{host}:{port}"),
        }
    }

    /// For IPC transports, ensure the socket's parent directory exists.
    ///
    /// ZeroMQ requires the directory to exist before binding an IPC socket.
    /// No-op for TCP.
    pub fn ensure_ipc_dir(&self) -> std::io::Result<()> {
        if let Self::Ipc(_) = self {
            let endpoint = self.endpoint();
            let path = endpoint.strip_prefix("ipc://").unwrap_or(&endpoint);
            if let Some(parent) = Path::new(path).parent() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }

    /// Remove a stale IPC socket file left over from a previous run.
    ///
    /// An unclean exit leaves the `.sock` file behind, which makes the next
    /// bind fail with `EADDRINUSE`. No-op for TCP or when the file is absent.
    pub fn remove_stale_socket(&self) -> std::io::Result<()> {
        if let Self::Ipc(_) = self {
            let endpoint = self.endpoint();
            let path = endpoint.strip_prefix("ipc://").unwrap_or(&endpoint);
            match std::fs::remove_file(path) {
                Ok(()) => {
                    tracing::debug!(path, "removed stale IPC socket");
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.endpoint())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ipc_endpoint_format() {
        let t = Transport::ipc("results");
        assert_eq!(t.endpoint(), "ipc:///tmp/siebwerk/results.sock");
    }

    #[test]
    fn tcp_endpoint_format() {
        let t = Transport::tcp("127.0.0.1", 6600);
        assert_eq!(t.endpoint(), "tcp://127.0.0.1:6600");
    }

    #[test]
    fn tcp_stale_socket_is_noop() {
        let t = Transport::tcp("127.0.0.1", 6600);
        assert!(t.remove_stale_socket().is_ok());
        assert!(t.ensure_ipc_dir().is_ok());
    }
}
