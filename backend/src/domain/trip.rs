//! Trip record and its lifecycle state machine.
//!
//! Legal transitions are `pending → assigned → ongoing → completed` plus
//! `pending | assigned → cancelled`. Re-requesting the state a trip is
//! already in (with the same driver) is reported as already satisfied so
//! redelivered broker events stay harmless.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{Driver, DriverId, RideFare, RiderId, TripId};

/// Lifecycle status of a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TripStatus {
    Pending,
    Assigned,
    Ongoing,
    Completed,
    Cancelled,
}

impl TripStatus {
    /// Whether `next` directly follows `self` in the lifecycle.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Assigned)
                | (Self::Assigned, Self::Ongoing)
                | (Self::Ongoing, Self::Completed)
                | (Self::Pending | Self::Assigned, Self::Cancelled)
        )
    }

    /// Position along the main chain; cancelled sits outside it.
    fn rank(self) -> Option<u8> {
        match self {
            Self::Pending => Some(0),
            Self::Assigned => Some(1),
            Self::Ongoing => Some(2),
            Self::Completed => Some(3),
            Self::Cancelled => None,
        }
    }

    /// Whether `self` lies at or beyond `other` on the main chain.
    fn has_reached(self, other: Self) -> bool {
        matches!((self.rank(), other.rank()), (Some(a), Some(b)) if a >= b)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Assigned => "assigned",
            Self::Ongoing => "ongoing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when stored status text is not a known status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown trip status: {0}")]
pub struct UnknownTripStatus(pub String);

impl FromStr for TripStatus {
    type Err = UnknownTripStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            Self::Pending,
            Self::Assigned,
            Self::Ongoing,
            Self::Completed,
            Self::Cancelled,
        ]
        .into_iter()
        .find(|status| status.as_str() == s)
        .ok_or_else(|| UnknownTripStatus(s.to_owned()))
    }
}

/// Why a requested transition cannot be applied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("cannot move trip from {from} to {to}")]
    Illegal { from: TripStatus, to: TripStatus },
    #[error("a driver is required to assign a trip")]
    DriverRequired,
    #[error("trip is assigned to driver {assigned}, not {requested}")]
    DriverMismatch {
        assigned: DriverId,
        requested: DriverId,
    },
}

/// Result of checking a requested transition against the current trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionPlan {
    /// The trip must be updated.
    Apply,
    /// The trip already reflects the request.
    AlreadySatisfied,
}

/// A trip created from a consumed fare quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: TripId,
    #[serde(rename = "userID")]
    pub rider_id: RiderId,
    pub status: TripStatus,
    pub fare: RideFare,
    pub driver: Option<Driver>,
    pub created_at: DateTime<Utc>,
}

impl Trip {
    /// Build a new pending trip for the fare's rider.
    #[must_use]
    pub fn pending(id: TripId, fare: RideFare, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            rider_id: fare.rider_id.clone(),
            status: TripStatus::Pending,
            fare,
            driver: None,
            created_at,
        }
    }

    fn check_driver(&self, requested: Option<&Driver>) -> Result<(), TransitionError> {
        match (&self.driver, requested) {
            (Some(assigned), Some(requested)) if assigned.id != requested.id => {
                Err(TransitionError::DriverMismatch {
                    assigned: assigned.id.clone(),
                    requested: requested.id.clone(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Decide whether moving to `target` (optionally by `driver`) applies,
    /// is already satisfied, or is rejected.
    ///
    /// # Examples
    /// ```ignore
    /// let plan = trip.plan_transition(TripStatus::Assigned, Some(&driver))?;
    /// assert_eq!(plan, TransitionPlan::Apply);
    /// ```
    pub fn plan_transition(
        &self,
        target: TripStatus,
        driver: Option<&Driver>,
    ) -> Result<TransitionPlan, TransitionError> {
        if target == TripStatus::Assigned && self.status.has_reached(TripStatus::Assigned) {
            self.check_driver(driver)?;
            return Ok(TransitionPlan::AlreadySatisfied);
        }
        // Redelivered status reports and cancels land on the status they set.
        if target == self.status && target != TripStatus::Pending {
            self.check_driver(driver)?;
            return Ok(TransitionPlan::AlreadySatisfied);
        }
        if !self.status.can_transition_to(target) {
            return Err(TransitionError::Illegal {
                from: self.status,
                to: target,
            });
        }
        if target == TripStatus::Assigned && driver.is_none() {
            return Err(TransitionError::DriverRequired);
        }
        self.check_driver(driver)?;
        Ok(TransitionPlan::Apply)
    }

    /// Return the trip with `target` applied; the driver is attached only
    /// when entering `assigned`.
    #[must_use]
    pub fn with_transition(mut self, target: TripStatus, driver: Option<Driver>) -> Self {
        if target == TripStatus::Assigned {
            self.driver = driver;
        }
        self.status = target;
        self
    }
}
