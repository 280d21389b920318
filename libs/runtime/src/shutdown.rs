use std::fmt;

use anyhow::Result;

/// What asked the process to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// SIGTERM, as sent by systemd or `docker stop`.
    Terminate,
    /// SIGINT / Ctrl+C.
    Interrupt,
    /// Windows console close, logoff or shutdown event.
    Console,
}

impl ShutdownSignal {
    pub fn as_str(self) -> &'static str {
        match self {
            ShutdownSignal::Terminate => "terminate",
            ShutdownSignal::Interrupt => "interrupt",
            ShutdownSignal::Console => "console",
        }
    }
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolves with the first stop request the process receives.
pub async fn wait_for_shutdown() -> Result<ShutdownSignal> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        let received = tokio::select! {
            _ = sigterm.recv() => ShutdownSignal::Terminate,
            _ = sigint.recv() => ShutdownSignal::Interrupt,
        };
        tracing::info!(signal = %received, "shutdown requested");
        Ok(received)
    }

    #[cfg(windows)]
    {
        use tokio::signal::windows::{ctrl_break, ctrl_c, ctrl_close, ctrl_logoff, ctrl_shutdown};
        use tokio::time::{timeout, Duration};

        async fn arm_once() -> std::io::Result<ShutdownSignal> {
            let mut c = ctrl_c()?;
            let mut br = ctrl_break()?;
            let mut cl = ctrl_close()?;
            let mut lo = ctrl_logoff()?;
            let mut sh = ctrl_shutdown()?;

            Ok(tokio::select! {
                _ = c.recv() => ShutdownSignal::Interrupt,
                _ = br.recv() => ShutdownSignal::Interrupt,
                _ = cl.recv() => ShutdownSignal::Console,
                _ = lo.recv() => ShutdownSignal::Console,
                _ = sh.recv() => ShutdownSignal::Console,
            })
        }

        // A console event fired within 50ms of arming is spurious; wait for the next one.
        let received = match timeout(Duration::from_millis(50), arm_once()).await {
            Ok(Ok(_)) => {
                tracing::warn!("shutdown: early Windows console signal detected; debouncing");
                arm_once().await?
            }
            Ok(Err(e)) => return Err(e.into()),
            Err(_elapsed) => arm_once().await?,
        };
        tracing::info!(signal = %received, "shutdown requested");
        Ok(received)
    }
}
