//! Port for the external spatial distance query.

use async_trait::async_trait;

use crate::domain::{GeoPoint, OfferId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by proximity adapters.
    pub enum ProximityOracleError {
        /// The spatial backend could not be reached.
        Connection { message: String } => "proximity oracle connection failed: {message}",
        /// The distance query failed.
        Query { message: String } => "proximity oracle query failed: {message}",
    }
}

/// Distance between a caller and the place an offer belongs to.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProximityOracle: Send + Sync {
    /// Metres from `point` to the offer's place, or `None` when the offer has
    /// no place.
    async fn distance_meters(
        &self,
        offer_id: &OfferId,
        point: GeoPoint,
    ) -> Result<Option<f64>, ProximityOracleError>;
}

/// Oracle for deployments without places; every offer is placeless.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureProximityOracle;

#[async_trait]
impl ProximityOracle for FixtureProximityOracle {
    async fn distance_meters(
        &self,
        _offer_id: &OfferId,
        _point: GeoPoint,
    ) -> Result<Option<f64>, ProximityOracleError> {
        Ok(None)
    }
}
