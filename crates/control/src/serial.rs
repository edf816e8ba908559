//! Serial console transport.
//!
//! Runs the same line protocol as the socket, minus the file download:
//! `hostFile=` is a socket continuation and falls through to the
//! unknown-command reply here. Without a configured device the console
//! binds to the process stdio, which keeps local debugging one pipe
//! away.

use crate::dispatch::Dispatcher;
use crate::framing;
use ads1115::I2cBus;
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_serial::SerialPortBuilderExt;
use tracing::info;

const BAUD_RATE: u32 = 115_200;

pub async fn serve<B: I2cBus + 'static>(
    dispatcher: Arc<Dispatcher<B>>,
    device: Option<String>,
) -> io::Result<()> {
    match device {
        Some(path) => {
            let port = tokio_serial::new(&path, BAUD_RATE)
                .data_bits(tokio_serial::DataBits::Eight)
                .parity(tokio_serial::Parity::None)
                .stop_bits(tokio_serial::StopBits::One)
                .flow_control(tokio_serial::FlowControl::None)
                .open_native_async()
                .map_err(io::Error::from)?;
            info!("Console listening on {path} at {BAUD_RATE} baud");
            let (reader, writer) = tokio::io::split(port);
            run_console(reader, writer, dispatcher).await
        }
        None => {
            info!("Console listening on stdio");
            run_console(tokio::io::stdin(), tokio::io::stdout(), dispatcher).await
        }
    }
}

async fn run_console<B, R, W>(
    reader: R,
    mut writer: W,
    dispatcher: Arc<Dispatcher<B>>,
) -> io::Result<()>
where
    B: I2cBus + 'static,
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(reader);
    loop {
        let Some(line) = framing::read_line(&mut reader).await? else {
            return Ok(());
        };
        let worker = Arc::clone(&dispatcher);
        let response = tokio::task::spawn_blocking(move || worker.dispatch(&line))
            .await
            .map_err(io::Error::other)?;
        writer.write_all(response.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
}
