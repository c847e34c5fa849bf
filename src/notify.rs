use log::info;

/// Outbound side-channel for milestone alerts. Calls are fire and forget:
/// delivery failures are neither observed nor retried by the tracker.
pub trait Notifier: Send + Sync {
    /// Invoked once when the run reaches the stronghold.
    fn stronghold_reached(&self, phase: &str, previous: &str);
}

/// Default notifier that only writes to the log. Real deployments plug in a
/// messaging integration here.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn stronghold_reached(&self, phase: &str, previous: &str) {
        info!("stronghold reached: {previous} -> {phase}");
    }
}
