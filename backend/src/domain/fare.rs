//! Package categories, pricing and fare quotes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{FareId, RiderId, Route};

/// Default price per provider distance unit, in cents.
pub const DEFAULT_PRICE_PER_DISTANCE_UNIT: f64 = 1.5;
/// Default price per provider time unit, in cents.
pub const DEFAULT_PRICE_PER_TIME_UNIT: f64 = 0.25;

/// Vehicle package a fare is quoted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PackageCategory {
    Suv,
    Sedan,
    Van,
    Luxury,
}

impl PackageCategory {
    /// Every category, in quoting order.
    pub const ALL: [Self; 4] = [Self::Suv, Self::Sedan, Self::Van, Self::Luxury];

    /// Flat base price of the package in cents.
    #[must_use]
    pub fn base_price_cents(self) -> f64 {
        match self {
            Self::Suv => 1000.0,
            Self::Sedan => 2000.0,
            Self::Van => 8000.0,
            Self::Luxury => 15000.0,
        }
    }

    /// Wire slug used in events, storage and the driver query string.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Suv => "suv",
            Self::Sedan => "sedan",
            Self::Van => "van",
            Self::Luxury => "luxury",
        }
    }
}

impl fmt::Display for PackageCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a package slug is not one of the known categories.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown package category: {0}")]
pub struct UnknownPackageCategory(pub String);

impl FromStr for PackageCategory {
    type Err = UnknownPackageCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| UnknownPackageCategory(s.to_owned()))
    }
}

/// Per-unit prices applied on top of the package base price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricingConfig {
    pub price_per_distance_unit: f64,
    pub price_per_time_unit: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            price_per_distance_unit: DEFAULT_PRICE_PER_DISTANCE_UNIT,
            price_per_time_unit: DEFAULT_PRICE_PER_TIME_UNIT,
        }
    }
}

impl PricingConfig {
    /// Price a route for one package:
    /// `base + distance * price_per_distance_unit + duration * price_per_time_unit`.
    ///
    /// # Examples
    /// ```
    /// use dispatch::domain::{PackageCategory, PricingConfig, Route};
    ///
    /// let pricing = PricingConfig { price_per_distance_unit: 100.0, price_per_time_unit: 50.0 };
    /// let route = Route { distance: 5.0, duration: 10.0, geometry: Vec::new() };
    /// assert_eq!(pricing.total_cents(PackageCategory::Sedan, &route), 3000.0);
    /// ```
    #[must_use]
    pub fn total_cents(&self, package: PackageCategory, route: &Route) -> f64 {
        package.base_price_cents()
            + route.distance * self.price_per_distance_unit
            + route.duration * self.price_per_time_unit
    }

    /// Build one fresh quote per package category for the rider.
    #[must_use]
    pub fn quote_all(&self, rider_id: &RiderId, route: &Route) -> Vec<RideFare> {
        PackageCategory::ALL
            .into_iter()
            .map(|package| RideFare {
                id: FareId::random(),
                rider_id: rider_id.clone(),
                package,
                total_price_cents: self.total_cents(package, route),
                route: route.clone(),
            })
            .collect()
    }
}

/// An immutable fare quote offered to a rider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RideFare {
    pub id: FareId,
    #[serde(rename = "userID")]
    pub rider_id: RiderId,
    #[serde(rename = "packageSlug")]
    pub package: PackageCategory,
    #[serde(rename = "totalPriceInCents")]
    pub total_price_cents: f64,
    pub route: Route,
}
