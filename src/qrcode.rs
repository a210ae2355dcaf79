use crate::client::{ClientError, ProtocolClient};
use log::{error, info};
use spowcore::types::events::QrEvent;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Logs QR codes and pairing results while the device is unpaired.
///
/// Returns `None` when there is nothing to report, e.g. the store already
/// holds a session.
pub async fn spawn_qr_reporter<C: ProtocolClient>(client: &C) -> Option<JoinHandle<()>> {
    match client.qr_channel().await {
        Ok(rx) => Some(tokio::spawn(report(rx))),
        Err(ClientError::AlreadyLoggedIn) => None,
        Err(e) => {
            error!("Failed to get QR channel: {e}");
            None
        }
    }
}

async fn report(mut rx: mpsc::Receiver<QrEvent>) {
    while let Some(evt) = rx.recv().await {
        match evt {
            QrEvent::Code { code, timeout } => {
                info!("QR code (valid for {} seconds): {code}", timeout.as_secs());
            }
            other => info!("QR channel result: {other}"),
        }
    }
}
