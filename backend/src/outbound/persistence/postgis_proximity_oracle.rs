//! PostGIS-backed distance checks for QR redemption.
//!
//! Distances are geodesic metres between the caller's WGS84 point and the
//! offer's place. All inputs are bound parameters.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::{Double, Uuid as SqlUuid};
use diesel_async::RunQueryDsl;

use crate::domain::ports::{ProximityOracle, ProximityOracleError};
use crate::domain::{GeoPoint, OfferId};

use super::diesel_error_mapping::{map_diesel_error, map_pool_error};
use super::pool::DbPool;

const DISTANCE_SQL: &str = r#"
SELECT ST_Distance(
    p.location,
    ST_SetSRID(ST_MakePoint($2, $3), 4326)::geography
) AS distance_meters
FROM offers o
JOIN places p ON p.id = o.place_id
WHERE o.id = $1
"#;

#[derive(Debug, QueryableByName)]
struct DistanceRow {
    #[diesel(sql_type = Double)]
    distance_meters: f64,
}

/// `ProximityOracle` answering from the `places` table.
#[derive(Clone)]
pub struct PostgisProximityOracle {
    pool: DbPool,
}

impl PostgisProximityOracle {
    /// Create a new oracle with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProximityOracle for PostgisProximityOracle {
    async fn distance_meters(
        &self,
        offer_id: &OfferId,
        point: GeoPoint,
    ) -> Result<Option<f64>, ProximityOracleError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error::<ProximityOracleError>)?;

        // ST_MakePoint takes longitude first.
        let row: Option<DistanceRow> = sql_query(DISTANCE_SQL)
            .bind::<SqlUuid, _>(*offer_id.as_uuid())
            .bind::<Double, _>(point.lng())
            .bind::<Double, _>(point.lat())
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error::<ProximityOracleError>(err, "proximity lookup"))?;

        Ok(row.map(|row| row.distance_meters))
    }
}
