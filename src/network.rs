// LAN address tracking
//
// Download links handed out by the responder are absolute, so the service
// needs to know the address other devices reach it on and the bound port.

use std::net::{IpAddr, SocketAddr, UdpSocket};
use std::sync::{Arc, RwLock};
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkInfo {
    pub ip: Option<IpAddr>,
    pub port: Option<u16>,
}

impl NetworkInfo {
    /// `http://ip:port`, or None while either part is unknown.
    pub fn base_url(&self) -> Option<String> {
        let addr = SocketAddr::new(self.ip?, self.port?);
        Some(format!("http://{}", addr))
    }
}

#[derive(Debug, Default)]
pub struct NetworkState {
    info: RwLock<NetworkInfo>,
    /// Fixed address from configuration; detection never overrides it.
    advertised: Option<IpAddr>,
}

impl NetworkState {
    pub fn new(advertised: Option<IpAddr>) -> Self {
        Self {
            info: RwLock::new(NetworkInfo {
                ip: advertised,
                port: None,
            }),
            advertised,
        }
    }

    pub fn snapshot(&self) -> NetworkInfo {
        *self.info.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_port(&self, port: Option<u16>) {
        self.info.write().unwrap_or_else(|e| e.into_inner()).port = port;
    }

    pub fn set_ip(&self, ip: Option<IpAddr>) {
        let mut info = self.info.write().unwrap_or_else(|e| e.into_inner());
        if info.ip != ip {
            match ip {
                Some(ip) => log::info!("LAN address is now {}", ip),
                None => log::warn!("No LAN address available"),
            }
        }
        info.ip = ip;
    }

    /// Re-detect the LAN address unless one is configured.
    pub fn refresh(&self) {
        if self.advertised.is_some() {
            return;
        }
        self.set_ip(detect_local_ip());
    }
}

/// Address of the interface that routes off-host. A UDP connect sends
/// nothing; it only selects the route.
pub fn detect_local_ip() -> Option<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    let ip = socket.local_addr().ok()?.ip();
    if ip.is_unspecified() || ip.is_loopback() {
        return None;
    }
    Some(ip)
}

/// Keep the address current while the server runs.
pub fn spawn_refresh(state: Arc<NetworkState>, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let state = Arc::clone(&state);
            // Socket calls are quick but blocking
            if tokio::task::spawn_blocking(move || state.refresh()).await.is_err() {
                log::error!("Network refresh task panicked");
            }
        }
    })
}
