//! Device location acquisition: timeout, cached fixes and a pending gate.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use foundation::LatLng;
use tokio::time::Instant;

pub const DEFAULT_LOCATE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_POSITION_MAX_AGE: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    pub timeout: Duration,
    /// A cached fix younger than this is returned without a new read.
    pub maximum_age: Duration,
    pub high_accuracy: bool,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_LOCATE_TIMEOUT,
            maximum_age: DEFAULT_POSITION_MAX_AGE,
            high_accuracy: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationError {
    PermissionDenied,
    Unavailable(String),
    Timeout,
    /// Another request is still in flight.
    Busy,
}

impl std::fmt::Display for LocationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LocationError::PermissionDenied => write!(f, "location permission denied"),
            LocationError::Unavailable(msg) => write!(f, "location unavailable: {msg}"),
            LocationError::Timeout => write!(f, "timed out waiting for a location fix"),
            LocationError::Busy => write!(f, "a location request is already pending"),
        }
    }
}

impl std::error::Error for LocationError {}

/// Source of raw position reads (device GPS, browser API, fixed test data).
pub trait LocationProvider {
    fn current_position(
        &self,
        options: &PositionOptions,
    ) -> impl Future<Output = Result<LatLng, LocationError>>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fix {
    pub position: LatLng,
    pub acquired_at: Instant,
}

/// Observable "request in flight" flag; UI controls stay disabled while set.
#[derive(Debug, Clone, Default)]
pub struct PendingGate(Rc<Cell<bool>>);

impl PendingGate {
    pub fn is_pending(&self) -> bool {
        self.0.get()
    }

    fn enter(&self) -> Option<PendingGuard> {
        if self.0.replace(true) {
            return None;
        }
        Some(PendingGuard(self.0.clone()))
    }
}

// Clears the gate on completion, error, timeout or cancellation.
struct PendingGuard(Rc<Cell<bool>>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

pub struct Geolocator<P> {
    provider: P,
    options: PositionOptions,
    last_fix: RefCell<Option<Fix>>,
    gate: PendingGate,
}

impl<P: LocationProvider> Geolocator<P> {
    pub fn new(provider: P, options: PositionOptions) -> Self {
        Self {
            provider,
            options,
            last_fix: RefCell::new(None),
            gate: PendingGate::default(),
        }
    }

    pub fn options(&self) -> &PositionOptions {
        &self.options
    }

    pub fn gate(&self) -> PendingGate {
        self.gate.clone()
    }

    pub fn last_fix(&self) -> Option<Fix> {
        *self.last_fix.borrow()
    }

    /// Current position, reusing a fix younger than `maximum_age`.
    ///
    /// On error or timeout the previous fix is left untouched.
    pub async fn acquire(&self) -> Result<LatLng, LocationError> {
        let Some(_guard) = self.gate.enter() else {
            return Err(LocationError::Busy);
        };

        if let Some(fix) = self.last_fix() {
            if fix.acquired_at.elapsed() <= self.options.maximum_age {
                tracing::debug!(position = %fix.position, "reusing cached fix");
                return Ok(fix.position);
            }
        }

        let read = self.provider.current_position(&self.options);
        let position = match tokio::time::timeout(self.options.timeout, read).await {
            Ok(Ok(position)) => position,
            Ok(Err(e)) => {
                tracing::warn!("location request failed: {e}");
                return Err(e);
            }
            Err(_) => {
                tracing::warn!(timeout_s = self.options.timeout.as_secs(), "location request timed out");
                return Err(LocationError::Timeout);
            }
        };

        if !position.is_valid() {
            return Err(LocationError::Unavailable(format!("invalid fix {position}")));
        }

        *self.last_fix.borrow_mut() = Some(Fix {
            position,
            acquired_at: Instant::now(),
        });
        Ok(position)
    }
}

/// Provider that answers every read with the same result after a delay.
#[derive(Debug, Clone)]
pub struct FixedLocationProvider {
    result: Result<LatLng, LocationError>,
    delay: Duration,
    reads: Rc<Cell<usize>>,
}

impl FixedLocationProvider {
    pub fn new(result: Result<LatLng, LocationError>) -> Self {
        Self {
            result,
            delay: Duration::ZERO,
            reads: Rc::default(),
        }
    }

    pub fn at(position: LatLng) -> Self {
        Self::new(Ok(position))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Shared counter of reads issued so far.
    pub fn reads(&self) -> Rc<Cell<usize>> {
        self.reads.clone()
    }
}

impl LocationProvider for FixedLocationProvider {
    async fn current_position(&self, _options: &PositionOptions) -> Result<LatLng, LocationError> {
        self.reads.set(self.reads.get() + 1);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.result.clone()
    }
}
