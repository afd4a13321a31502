//! Diesel table definitions for the dispatch schema.
//!
//! These definitions must match `migrations/` exactly.

diesel::table! {
    /// Persisted fare quotes. A quote is immutable once written.
    ride_fares (id) {
        id -> Uuid,
        rider_id -> Text,
        package_slug -> Text,
        total_price_cents -> Float8,
        /// Route snapshot the quote was priced from.
        route -> Jsonb,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Trips. `fare_id` is unique so a quote backs at most one trip.
    trips (id) {
        id -> Uuid,
        rider_id -> Text,
        fare_id -> Uuid,
        status -> Text,
        /// Driver record attached on assignment.
        driver -> Nullable<Jsonb>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(trips -> ride_fares (fare_id));
diesel::allow_tables_to_appear_in_same_query!(ride_fares, trips);
