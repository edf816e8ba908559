//! TCP command transport.
//!
//! One client is served at a time, mirroring the console: lines in,
//! lines out. A `hostFile=` request switches the connection to a binary
//! download and closes it afterwards, so a fresh connection is needed
//! per file.

use crate::dispatch::Dispatcher;
use crate::framing;
use ads1115::I2cBus;
use recorder::RecorderError;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{info, warn};

const CHUNK_SIZE: usize = 4096;

/// Accept clients forever, serving each session to completion.
pub async fn serve<B: I2cBus + 'static>(
    listener: TcpListener,
    dispatcher: Arc<Dispatcher<B>>,
) -> io::Result<()> {
    let port = listener.local_addr()?.port();
    info!("Command server listening on port {port}");
    loop {
        let mut stream = match listener.accept().await {
            Ok((stream, _)) => stream,
            Err(err) => {
                warn!("Accept failed: {err}");
                tokio::time::sleep(Duration::from_millis(50)).await;
                continue;
            }
        };
        info!("Client connected");
        if let Err(err) = serve_client(&mut stream, &dispatcher).await {
            warn!("Client session ended with error: {err}");
        }
        let _ = stream.shutdown().await;
        info!("Client disconnected");
    }
}

async fn serve_client<B: I2cBus + 'static>(
    stream: &mut TcpStream,
    dispatcher: &Arc<Dispatcher<B>>,
) -> io::Result<()> {
    let (reader, mut writer) = stream.split();
    let mut reader = BufReader::new(reader);
    loop {
        let Some(line) = framing::read_line(&mut reader).await? else {
            return Ok(());
        };
        // the file name is taken verbatim, whitespace included
        if let Some(name) = line.strip_prefix("hostFile=") {
            host_file(dispatcher, &mut writer, name.to_string()).await?;
            return Ok(());
        }
        let worker = Arc::clone(dispatcher);
        let response = tokio::task::spawn_blocking(move || worker.dispatch(&line))
            .await
            .map_err(io::Error::other)?;
        writer.write_all(response.as_bytes()).await?;
        writer.write_all(b"\n").await?;
    }
}

/// Stream a recorded file: a `SIZE <n>` header line, then exactly `n`
/// raw bytes.
async fn host_file<B, W>(
    dispatcher: &Arc<Dispatcher<B>>,
    writer: &mut W,
    name: String,
) -> io::Result<()>
where
    B: I2cBus + 'static,
    W: AsyncWrite + Unpin,
{
    let exporter = Arc::clone(dispatcher);
    let target = name.clone();
    let exported = tokio::task::spawn_blocking(move || exporter.recorder().export(&target))
        .await
        .map_err(io::Error::other)?;
    let (file, size) = match exported {
        Ok(pair) => pair,
        Err(err) => {
            let line = match err {
                RecorderError::NotMounted => "Error: SD not mounted".to_string(),
                RecorderError::NotFound(_) => "Error: File not found".to_string(),
                RecorderError::Busy => "Error: SD busy".to_string(),
                _ => format!("Error: Failed to open file {name}"),
            };
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            return Ok(());
        }
    };

    writer.write_all(format!("SIZE {size}\n").as_bytes()).await?;
    // cap at the advertised size; an active recording may grow the file
    // while we stream it
    let mut remaining = tokio::fs::File::from_std(file).take(size);
    let mut chunk = vec![0u8; CHUNK_SIZE];
    loop {
        let read = remaining.read(&mut chunk).await?;
        if read == 0 {
            break;
        }
        writer.write_all(&chunk[..read]).await?;
    }
    writer.flush().await?;
    Ok(())
}
