use crate::client::ProtocolClient;
use crate::handlers::RouterExit;
use crate::input::spawn_line_pump;
use crate::pairing::PairRejectHandle;
use crate::qrcode::spawn_qr_reporter;
use crate::session::Session;
use crate::share::read_staged_body;
use anyhow::Context;
use log::{debug, error, info, warn};
use spowcore::command::Invocation;
use spowcore::types::events::Event;
use std::io::Write;
use tokio::io::AsyncBufRead;
use tokio::sync::mpsc;

/// Line that rejects a pending device link in `login` mode.
pub const REJECT_LINE: &str = "r";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Finished,
    /// Another client took over the session; exit right away.
    StreamReplaced,
}

/// Connects, runs what `invocation` asks for and disconnects.
///
/// `input` is only read in `login` and share mode. Results of one-shot
/// commands are written to `out`.
pub async fn run<C, R, W>(
    session: &Session<C>,
    events: mpsc::Receiver<Event>,
    invocation: Invocation,
    input: R,
    out: W,
) -> anyhow::Result<Outcome>
where
    C: ProtocolClient,
    R: AsyncBufRead + Unpin + Send + 'static,
    W: Write,
{
    let reject = session.install_pairing();
    let router = session.router();
    let mut router_task = tokio::spawn(router.clone().run(events));
    let _qr = spawn_qr_reporter(session.client.as_ref()).await;

    session
        .client
        .connect()
        .await
        .context("failed to connect")?;

    let mode = run_mode(session, invocation, input, reject, out);
    tokio::pin!(mode);
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let mut router_done = false;
    let result = tokio::select! {
        res = &mut mode => res,
        exit = &mut router_task => {
            router_done = true;
            match exit {
                Ok(RouterExit::StreamReplaced) => return Ok(Outcome::StreamReplaced),
                Ok(RouterExit::StreamClosed) => debug!("Event stream ended before the command finished"),
                Err(e) => warn!("Event router stopped: {e}"),
            }
            tokio::select! {
                res = &mut mode => res,
                _ = &mut shutdown => {
                    info!("Interrupt received, exiting");
                    Ok(())
                }
            }
        }
        _ = &mut shutdown => {
            info!("Interrupt received, exiting");
            Ok(())
        }
    };

    session.client.disconnect().await;
    if !router_done {
        router_task.abort();
    }
    router.drain().await;

    result?;
    Ok(Outcome::Finished)
}

async fn run_mode<C, R, W>(
    session: &Session<C>,
    invocation: Invocation,
    input: R,
    reject: PairRejectHandle,
    out: W,
) -> Result<(), crate::commands::DispatchError>
where
    C: ProtocolClient,
    R: AsyncBufRead + Unpin + Send + 'static,
    W: Write,
{
    match invocation {
        Invocation::Login => {
            let (lines, _pump) = spawn_line_pump(input);
            stay_logged_in(lines, &reject).await;
            Ok(())
        }
        Invocation::Command { verb, args } => {
            session.dispatcher(out).dispatch(&verb, &args).await
        }
        Invocation::Share => {
            let body = match read_staged_body(&session.config.message_path).await {
                Ok(body) => body,
                Err(e) => {
                    error!(
                        "Failed to read staged message {}: {e}",
                        session.config.message_path.display()
                    );
                    return Ok(());
                }
            };
            let (mut lines, _pump) = spawn_line_pump(input);
            let Some(target_line) = lines.recv().await else {
                info!("No share targets given");
                return Ok(());
            };
            let report = session.relay().run(&body, &target_line).await;
            debug!("Share finished: {report:?}");
            Ok(())
        }
    }
}

/// Keeps the session open until input closes. A reject line declines a
/// pending device link; anything else is ignored.
async fn stay_logged_in(mut lines: mpsc::Receiver<String>, reject: &PairRejectHandle) {
    while let Some(line) = lines.recv().await {
        if line == REJECT_LINE {
            if !reject.signal(true) {
                debug!("No pairing to reject");
            }
        } else {
            debug!("Ignoring input {line:?}");
        }
    }
    info!("Input closed, exiting");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for interrupt: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
