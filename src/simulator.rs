//! Consumer-facing simulator handle

use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::SimulatorConfig;
use crate::connection::StripMachine;
use crate::driver::{ControlFlags, Driver};
use crate::stream::snapshot_stream;
use crate::transport::{PortBackend, PortScanner, SerialBackend};
use crate::types::{
    ConnectionState, DerivedKind, RefreshRate, ScalingExponent, StripBuffer, StripSnapshot,
};
use crate::Result;

/// Running simulator.
///
/// Owns the worker task. Requests are posted without blocking and take
/// effect at the start of the worker's next cycle; state and buffers are
/// read from the latest published snapshot.
pub struct Simulator {
    /// Latest snapshot receiver
    snapshots: watch::Receiver<Arc<StripSnapshot>>,

    /// Pending requests shared with the worker
    controls: Arc<ControlFlags>,

    scanner: PortScanner,

    /// Rate used by [`Simulator::updates`]
    refresh_rate: RefreshRate,

    /// Cancellation token for stopping the worker
    cancel: CancellationToken,

    task: Option<JoinHandle<()>>,
}

impl Simulator {
    /// Start a simulator on the host's serial ports.
    pub async fn start(config: SimulatorConfig) -> Result<Self> {
        Self::with_backend(Arc::new(SerialBackend), config).await
    }

    /// Start a simulator on an arbitrary port backend.
    pub async fn with_backend(
        backend: Arc<dyn PortBackend>,
        config: SimulatorConfig,
    ) -> Result<Self> {
        config.validate()?;

        let machine = StripMachine::from_config(backend, &config);
        let scanner = machine.scanner().clone();
        let controls = Arc::new(ControlFlags::new(config.default_scaling));
        let cancel = CancellationToken::new();

        let channels =
            Driver::spawn(machine, Arc::clone(&controls), cancel.clone(), config.cycle_interval());

        info!(
            scaling = config.default_scaling.get(),
            reserved = ?config.reserved_ports,
            "Simulator started"
        );

        Ok(Self {
            snapshots: channels.snapshots,
            controls,
            scanner,
            refresh_rate: config.refresh_rate(),
            cancel,
            task: Some(channels.task),
        })
    }

    /// Connectable ports. Runs on the caller, not the worker.
    pub fn scan(&self) -> Result<Vec<String>> {
        self.scanner.scan()
    }

    /// Ask the worker to connect to `port`.
    ///
    /// The sentinel and reserved ports are refused here. The request is
    /// ignored by the worker unless it is disconnected or connecting.
    pub fn request_connect(&self, port: &str) -> Result<()> {
        self.scanner.check_target(port)?;
        debug!(port, "Connect requested");
        self.controls.request_connect(port);
        Ok(())
    }

    pub fn request_disconnect(&self) {
        debug!("Disconnect requested");
        self.controls.request_disconnect();
    }

    /// Set the scaling exponent used from the next decoded frame on.
    pub fn set_scaling(&self, value: f32) -> Result<()> {
        let scaling = ScalingExponent::new(value)?;
        self.controls.set_scaling(scaling);
        Ok(())
    }

    pub fn scaling(&self) -> ScalingExponent {
        self.controls.scaling()
    }

    pub fn state(&self) -> ConnectionState {
        self.snapshots.borrow().state
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> Arc<StripSnapshot> {
        self.snapshots.borrow().clone()
    }

    pub fn latest_primary_buffer(&self) -> Arc<StripBuffer> {
        Arc::clone(&self.snapshots.borrow().primary)
    }

    pub fn latest_derived_buffer(&self, kind: DerivedKind) -> Arc<StripBuffer> {
        Arc::clone(self.snapshots.borrow().derived(kind))
    }

    /// Snapshots at `rate`, starting with the current one.
    pub fn subscribe(&self, rate: RefreshRate) -> impl Stream<Item = Arc<StripSnapshot>> + 'static {
        snapshot_stream(self.snapshots.clone(), rate)
    }

    /// Snapshots at the configured refresh rate.
    pub fn updates(&self) -> impl Stream<Item = Arc<StripSnapshot>> + 'static {
        self.subscribe(self.refresh_rate)
    }

    /// Wait until the published state is `state`. Returns `false` on timeout
    /// or when the worker is gone.
    pub async fn wait_for_state(&self, state: ConnectionState, timeout: Duration) -> bool {
        let mut rx = self.snapshots.clone();
        matches!(
            tokio::time::timeout(timeout, rx.wait_for(|s| s.state == state)).await,
            Ok(Ok(_))
        )
    }

    /// Ask the worker to exit without waiting for it. Interrupts a blocked read.
    pub fn request_exit(&self) {
        debug!("Exit requested");
        self.cancel.cancel();
    }

    /// Exit: stop the worker, close the port and wait for the task to end.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!("Strip worker ended abnormally: {}", e);
            }
        }
        info!("Simulator shut down");
    }
}

impl Drop for Simulator {
    fn drop(&mut self) {
        debug!("Dropping simulator");
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for Simulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulator")
            .field("state", &self.state())
            .field("scaling", &self.scaling())
            .field("refresh_rate", &self.refresh_rate)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SimulatorError;
    use crate::test_utils::{ScriptedBackend, ScriptedRead};
    use futures::StreamExt;

    const WAIT: Duration = Duration::from_secs(2);

    async fn start(backend: &ScriptedBackend) -> Simulator {
        let config = SimulatorConfig { cycle_interval_ms: 5, ..SimulatorConfig::default() };
        Simulator::with_backend(Arc::new(backend.clone()), config).await.unwrap()
    }

    #[tokio::test]
    async fn frames_reach_subscribers() {
        let _ = tracing_subscriber::fmt::try_init();

        let backend = ScriptedBackend::with_ports(["COM3"]);
        backend.push_lines(&["10,20,30 40,50,60"]);
        backend.push_reads([ScriptedRead::Hang]);
        let simulator = start(&backend).await;
        simulator.set_scaling(1.0).unwrap();

        let mut updates = Box::pin(simulator.subscribe(RefreshRate::EveryFrame));
        simulator.request_connect("COM3").unwrap();

        let snapshot = tokio::time::timeout(WAIT, async {
            while let Some(snapshot) = updates.next().await {
                if snapshot.sequence > 0 {
                    return Some(snapshot);
                }
            }
            None
        })
        .await
        .expect("frame within timeout")
        .expect("stream open");

        assert_eq!(snapshot.state, ConnectionState::Connected);
        assert_eq!(snapshot.port.as_deref(), Some("COM3"));
        assert_eq!(snapshot.primary.column(0), Some([30, 20, 10]));
        assert_eq!(snapshot.derived(DerivedKind::Rgb).column(849), Some([40, 50, 60]));
        assert_eq!(simulator.latest_primary_buffer().column(425), Some([60, 50, 40]));

        simulator.shutdown().await;
        assert_eq!(backend.live_transports(), 0);
    }

    #[tokio::test]
    async fn silent_device_is_dropped() {
        // Script runs dry: every read is empty
        let backend = ScriptedBackend::with_ports(["COM3"]);
        let simulator = start(&backend).await;

        simulator.request_connect("COM3").unwrap();
        assert!(simulator.wait_for_state(ConnectionState::Connected, WAIT).await);
        assert!(simulator.wait_for_state(ConnectionState::Disconnected, WAIT).await);

        let snapshot = simulator.snapshot();
        assert_eq!(snapshot.failures, 0);
        assert!(snapshot.primary.is_zeroed());
        assert_eq!(backend.live_transports(), 0);
    }

    #[tokio::test]
    async fn disconnect_request_blanks_strip() {
        let backend = ScriptedBackend::with_ports(["COM3"]);
        backend.push_reads(std::iter::repeat_n(ScriptedRead::line("255,255,255"), 10_000));
        let simulator = start(&backend).await;

        simulator.request_connect("COM3").unwrap();
        let mut rx = simulator.snapshots.clone();
        tokio::time::timeout(WAIT, rx.wait_for(|s| s.sequence >= 1)).await.unwrap().unwrap();
        assert_eq!(simulator.latest_primary_buffer().column(0), Some([255, 255, 255]));

        simulator.request_disconnect();
        assert!(simulator.wait_for_state(ConnectionState::Disconnected, WAIT).await);

        let snapshot = simulator.snapshot();
        assert!(snapshot.primary.is_zeroed());
        assert!(snapshot.derived(DerivedKind::Hsv).is_zeroed());
        assert_eq!(backend.live_transports(), 0);
        // Frames were still flowing, so this was not the failure policy
        assert!(backend.remaining_reads() > 0);
    }

    #[tokio::test]
    async fn disconnect_request_from_connecting() {
        let backend = ScriptedBackend::with_ports(["COM3"]);
        backend.fail_opens("COM3", usize::MAX);
        let simulator = start(&backend).await;

        simulator.request_connect("COM3").unwrap();
        assert!(simulator.wait_for_state(ConnectionState::Connecting, WAIT).await);

        simulator.request_disconnect();
        assert!(simulator.wait_for_state(ConnectionState::Disconnected, WAIT).await);
        assert_eq!(simulator.snapshot().port, None);
    }

    #[tokio::test]
    async fn refuses_reserved_ports_and_bad_scaling() {
        let backend = ScriptedBackend::with_ports(["COM1", "COM3"]);
        let simulator = start(&backend).await;

        assert_eq!(simulator.scan().unwrap(), vec!["COM3".to_string()]);
        assert!(matches!(
            simulator.request_connect("COM1"),
            Err(SimulatorError::ReservedPort { .. })
        ));
        assert!(matches!(simulator.set_scaling(0.0), Err(SimulatorError::InvalidScaling { .. })));
        assert_eq!(simulator.scaling(), ScalingExponent::default());
        assert_eq!(simulator.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn shutdown_interrupts_blocked_read() {
        let backend = ScriptedBackend::with_ports(["COM3"]);
        backend.push_reads([ScriptedRead::Hang]);
        let simulator = start(&backend).await;
        let mut rx = simulator.snapshots.clone();

        simulator.request_connect("COM3").unwrap();
        assert!(simulator.wait_for_state(ConnectionState::Connected, WAIT).await);

        tokio::time::timeout(WAIT, simulator.shutdown()).await.expect("shutdown completes");
        assert_eq!(rx.borrow_and_update().state, ConnectionState::Exiting);
        assert_eq!(backend.live_transports(), 0);
    }

    #[tokio::test]
    async fn exit_request_publishes_terminal_state() {
        let backend = ScriptedBackend::with_ports(["COM3"]);
        let simulator = start(&backend).await;

        simulator.request_exit();
        assert!(simulator.wait_for_state(ConnectionState::Exiting, WAIT).await);

        // Requests after exit are accepted but never acted on
        simulator.request_connect("COM3").unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(simulator.state(), ConnectionState::Exiting);
        assert_eq!(backend.open_count(), 0);
    }
}
