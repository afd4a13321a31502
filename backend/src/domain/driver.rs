//! Transient driver record built when a driver connects.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;

use super::{DriverId, PackageCategory};

const DISPLAY_NAMES: [&str; 8] = [
    "John Doe",
    "Amara Okafor",
    "Mateo Rossi",
    "Lena Fischer",
    "Yuki Tanaka",
    "Priya Nair",
    "Omar Haddad",
    "Sofia Lindqvist",
];

const AVATAR_BASE_URL: &str = "https://randomuser.me/api/portraits/lego";
const AVATAR_COUNT: u8 = 9;

/// Driver attributes pushed to the driver on connect and to riders on
/// assignment. Display attributes derive from the driver id so a reconnect
/// shows the same name, avatar and plate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    pub id: DriverId,
    pub name: String,
    pub profile_picture: String,
    pub car_plate: String,
    #[serde(rename = "packageSlug")]
    pub package: PackageCategory,
}

impl Driver {
    /// Build the record for a freshly connected driver.
    ///
    /// # Examples
    /// ```
    /// use dispatch::domain::{Driver, DriverId, PackageCategory};
    ///
    /// let id = DriverId::new("driver-1").expect("driver id");
    /// let first = Driver::for_connection(id.clone(), PackageCategory::Van);
    /// let again = Driver::for_connection(id, PackageCategory::Van);
    /// assert_eq!(first, again);
    /// ```
    #[must_use]
    pub fn for_connection(id: DriverId, package: PackageCategory) -> Self {
        let digest = Sha256::digest(id.as_ref().as_bytes());
        let name_index = usize::from(digest[0]) % DISPLAY_NAMES.len();
        let avatar = digest[1] % AVATAR_COUNT;
        let plate = hex::encode_upper(&digest[2..5]);
        Self {
            name: DISPLAY_NAMES[name_index].to_owned(),
            profile_picture: format!("{AVATAR_BASE_URL}/{avatar}.jpg"),
            car_plate: plate,
            package,
            id,
        }
    }
}
