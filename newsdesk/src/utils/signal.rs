use tokio::signal::unix;

pub const TERMINATION_SIGNALS: [libc::c_int; 4] =
    [libc::SIGINT, libc::SIGTERM, libc::SIGQUIT, libc::SIGABRT];

/// Resolves once any of the termination signals is received.
pub async fn shutdown_signal() {
    match any_signal(TERMINATION_SIGNALS).await {
        Ok(signal) => tracing::info!(?signal, "received termination signal"),
        Err(_) => {
            tracing::warn!("no termination signals could be subscribed");
            std::future::pending::<()>().await
        }
    }
}

pub fn any_signal<I, T>(signals: I) -> tokio::sync::oneshot::Receiver<unix::SignalKind>
where
    I: IntoIterator<Item = T>,
    T: Into<unix::SignalKind> + Send + 'static,
{
    let (tx, rx) = tokio::sync::oneshot::channel();

    let listeners = signals
        .into_iter()
        .filter_map(|signal| {
            let signal = signal.into();
            match unix::signal(signal) {
                Ok(stream) => Some((signal, stream)),
                Err(e) => {
                    tracing::warn!(?signal, "failed to subscribe on signal: {e}");
                    None
                }
            }
        })
        .map(|(signal, mut stream)| {
            Box::pin(async move {
                stream.recv().await;
                signal
            })
        })
        .collect::<Vec<_>>();

    if listeners.is_empty() {
        return rx;
    }

    tokio::spawn(async move {
        let (signal, ..) = futures_util::future::select_all(listeners).await;
        tx.send(signal).ok();
    });

    rx
}
