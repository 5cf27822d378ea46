// src/server/listener.rs
// Low-level TCP bind kept separate from the serve loop.
use anyhow::Result;
use std::net::SocketAddr;
use tokio::net::TcpListener;

pub async fn bind_tcp(addr: SocketAddr) -> Result<TcpListener> {
    let listener = TcpListener::bind(addr).await?;
    Ok(listener)
}
