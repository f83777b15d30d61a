//! Device location boundary.

use async_trait::async_trait;
use std::{
    fmt::Debug,
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};
use tokio::sync::mpsc;

use crate::{
    error::{Result, WeatherError},
    model::Coordinate,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    NotDetermined,
    AuthorizedAlways,
    AuthorizedWhenInUse,
    Denied,
    Restricted,
}

impl Authorization {
    pub fn is_authorized(self) -> bool {
        matches!(
            self,
            Authorization::AuthorizedAlways | Authorization::AuthorizedWhenInUse
        )
    }
}

/// Source of the best-known device coordinate.
#[async_trait]
pub trait LocationSource: Send + Sync + Debug {
    fn authorization(&self) -> Authorization;

    /// Ask the user; resolves with the resulting status.
    async fn request_authorization(&self) -> Authorization;

    /// Coordinates as they are fixed. Must only be called when authorized.
    fn start_updates(&self) -> mpsc::Receiver<Coordinate>;

    fn stop(&self);
}

/// Authorize if needed, wait for the first fix, then stop the source.
///
/// `Ok(None)` means authorized but no fix arrived within `timeout`.
pub async fn first_fix(source: &dyn LocationSource, timeout: Duration) -> Result<Option<Coordinate>> {
    let mut status = source.authorization();
    if status == Authorization::NotDetermined {
        status = source.request_authorization().await;
    }

    if !status.is_authorized() {
        tracing::info!(?status, "location not authorized");
        return Err(WeatherError::PermissionDenied);
    }

    let mut updates = source.start_updates();
    let fix = tokio::time::timeout(timeout, updates.recv()).await;
    source.stop();

    match fix {
        Ok(Some(coord)) => {
            tracing::info!(lat = coord.lat, lon = coord.lon, "location fix");
            Ok(Some(coord))
        }
        Ok(None) => {
            tracing::warn!("location updates ended without a fix");
            Ok(None)
        }
        Err(_) => {
            tracing::warn!(?timeout, "no location fix in time");
            Ok(None)
        }
    }
}

/// A device whose position is known up front (from config). Without a
/// coordinate it behaves like a denied permission.
#[derive(Debug)]
pub struct FixedLocation {
    coordinate: Option<Coordinate>,
    stopped: AtomicBool,
}

impl FixedLocation {
    pub fn new(coordinate: Option<Coordinate>) -> Self {
        Self {
            coordinate,
            stopped: AtomicBool::new(false),
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LocationSource for FixedLocation {
    fn authorization(&self) -> Authorization {
        if self.coordinate.is_some() {
            Authorization::AuthorizedWhenInUse
        } else {
            Authorization::Denied
        }
    }

    async fn request_authorization(&self) -> Authorization {
        self.authorization()
    }

    fn start_updates(&self) -> mpsc::Receiver<Coordinate> {
        let (tx, rx) = mpsc::channel(1);
        if let Some(coord) = self.coordinate {
            let _ = tx.try_send(coord);
        }
        rx
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Debug)]
    struct PromptingSource {
        status: Mutex<Authorization>,
        grant: Authorization,
        fixes: Vec<Coordinate>,
        started: AtomicBool,
        stopped: AtomicBool,
    }

    impl PromptingSource {
        fn new(status: Authorization, grant: Authorization, fixes: Vec<Coordinate>) -> Self {
            Self {
                status: Mutex::new(status),
                grant,
                fixes,
                started: AtomicBool::new(false),
                stopped: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl LocationSource for PromptingSource {
        fn authorization(&self) -> Authorization {
            *self.status.lock()
        }

        async fn request_authorization(&self) -> Authorization {
            *self.status.lock() = self.grant;
            self.grant
        }

        fn start_updates(&self) -> mpsc::Receiver<Coordinate> {
            self.started.store(true, Ordering::SeqCst);
            let (tx, rx) = mpsc::channel(self.fixes.len().max(1));
            for fix in &self.fixes {
                let _ = tx.try_send(*fix);
            }
            rx
        }

        fn stop(&self) {
            self.stopped.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn requests_when_not_determined_and_takes_first_fix() {
        let source = PromptingSource::new(
            Authorization::NotDetermined,
            Authorization::AuthorizedWhenInUse,
            vec![Coordinate::new(1.0, 2.0), Coordinate::new(3.0, 4.0)],
        );

        let fix = first_fix(&source, Duration::from_secs(1)).await.unwrap();

        assert_eq!(fix, Some(Coordinate::new(1.0, 2.0)));
        assert!(source.stopped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn denied_never_starts_updates() {
        let source = PromptingSource::new(
            Authorization::Restricted,
            Authorization::AuthorizedAlways,
            vec![Coordinate::new(1.0, 2.0)],
        );

        let err = first_fix(&source, Duration::from_secs(1)).await.unwrap_err();

        assert_eq!(err, WeatherError::PermissionDenied);
        assert!(!source.started.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn prompt_refusal_is_permission_denied() {
        let source = PromptingSource::new(
            Authorization::NotDetermined,
            Authorization::Denied,
            Vec::new(),
        );

        let err = first_fix(&source, Duration::from_secs(1)).await.unwrap_err();
        assert_eq!(err, WeatherError::PermissionDenied);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_source_times_out_and_stops() {
        #[derive(Debug)]
        struct Silent {
            stopped: AtomicBool,
            // Keeps the channel open so recv() never sees the end.
            held: Mutex<Option<mpsc::Sender<Coordinate>>>,
        }

        #[async_trait]
        impl LocationSource for Silent {
            fn authorization(&self) -> Authorization {
                Authorization::AuthorizedAlways
            }
            async fn request_authorization(&self) -> Authorization {
                Authorization::AuthorizedAlways
            }
            fn start_updates(&self) -> mpsc::Receiver<Coordinate> {
                let (tx, rx) = mpsc::channel(1);
                *self.held.lock() = Some(tx);
                rx
            }
            fn stop(&self) {
                self.stopped.store(true, Ordering::SeqCst);
            }
        }

        let source = Silent {
            stopped: AtomicBool::new(false),
            held: Mutex::new(None),
        };

        let fix = first_fix(&source, Duration::from_secs(10)).await.unwrap();

        assert_eq!(fix, None);
        assert!(source.stopped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn fixed_location_without_coordinate_is_denied() {
        let source = FixedLocation::new(None);
        assert_eq!(source.authorization(), Authorization::Denied);

        let located = FixedLocation::new(Some(Coordinate::new(5.0, 6.0)));
        let fix = first_fix(&located, Duration::from_secs(1)).await.unwrap();
        assert_eq!(fix, Some(Coordinate::new(5.0, 6.0)));
        assert!(located.is_stopped());
    }
}
