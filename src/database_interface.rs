use crate::configuration::DatabaseConfig;
use crate::error::StoreError;
use crate::schema::{availability, properties, sellers};
use crate::types::{AvailabilitySlot, NewAvailability, Property, Seller};
use crate::backend::AvailabilityBackend;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sql_types::Timestamptz;
use diesel::PgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[derive(Clone)]
pub struct DatabaseInterface {
    pool: Pool<ConnectionManager<PgConnection>>,
}

impl DatabaseInterface {
    /// Opens the connection pool. Fails with `ConnectionFailure` when no
    /// connection can be made within the configured timeout.
    pub fn new(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let database_url = config
            .connection_url()
            .map_err(|err| StoreError::connection(format!("Invalid database URL: {err}")))?;

        let manager = ConnectionManager::<PgConnection>::new(database_url);
        let pool = Pool::builder()
            .max_size(config.pool_size.max(1))
            .connection_timeout(config.connect_timeout.max(Duration::from_secs(1)))
            .test_on_check_out(true)
            .build(manager)?;

        info!(database = %config.redacted_target(), "Database pool ready");
        Ok(Self { pool })
    }

    pub fn run_migrations(&self) -> Result<(), StoreError> {
        self.with_connection(|connection| {
            let applied = connection
                .run_pending_migrations(MIGRATIONS)
                .map_err(|err| StoreError::Migration(err.to_string()))?;
            for version in applied {
                info!(%version, "Applied migration");
            }
            Ok(())
        })
    }

    /// Checks a connection out of the pool for the duration of `operation`.
    /// The connection goes back to the pool on every exit path.
    fn with_connection<T>(
        &self,
        operation: impl FnOnce(&mut PgConnection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut connection = self.pool.get().map_err(|err| {
            warn!(%err, "Failed to get database connection from pool");
            StoreError::from(err)
        })?;
        operation(&mut connection)
    }
}

impl AvailabilityBackend for DatabaseInterface {
    fn save_availability(&self, slot: NewAvailability) -> Result<AvailabilitySlot, StoreError> {
        self.with_connection(|connection| {
            connection.transaction::<_, StoreError, _>(|connection| {
                // Concurrent saves may race on the same new parent, the loser
                // sees the row as already existing.
                let seller = Seller::provisioned(slot.seller_id);
                let created = diesel::insert_into(sellers::table)
                    .values(&seller)
                    .on_conflict_do_nothing()
                    .execute(connection)?;
                if created > 0 {
                    debug!(seller_id = %slot.seller_id, "Provisioned seller");
                }

                let property = Property::provisioned(slot.property_id, slot.seller_id);
                let created = diesel::insert_into(properties::table)
                    .values(&property)
                    .on_conflict_do_nothing()
                    .execute(connection)?;
                if created > 0 {
                    debug!(property_id = %slot.property_id, "Provisioned property");
                }

                let saved = diesel::insert_into(availability::table)
                    .values(&slot)
                    .returning(AvailabilitySlot::as_returning())
                    .get_result::<AvailabilitySlot>(connection)?;
                Ok(saved)
            })
        })
        .map_err(|err| {
            warn!(?err, property_id = %slot.property_id, seller_id = %slot.seller_id, "Availability slot can't be saved");
            err
        })
    }

    fn availability(
        &self,
        property_id: Uuid,
        seller_id: Option<Uuid>,
    ) -> Result<Vec<AvailabilitySlot>, StoreError> {
        self.with_connection(|connection| {
            let mut query = availability::table
                .filter(availability::property_id.eq(property_id))
                .into_boxed();
            if let Some(seller_id) = seller_id {
                query = query.filter(availability::seller_id.eq(seller_id));
            }

            let slots = query
                .order((availability::start_time.asc(), availability::id.asc()))
                .select(AvailabilitySlot::as_select())
                .load::<AvailabilitySlot>(connection)?;
            Ok(slots)
        })
    }

    fn delete_availability(
        &self,
        property_id: Uuid,
        seller_id: Option<Uuid>,
    ) -> Result<usize, StoreError> {
        self.with_connection(|connection| {
            let of_property = availability::table.filter(availability::property_id.eq(property_id));
            let deleted = match seller_id {
                Some(seller_id) => {
                    diesel::delete(of_property.filter(availability::seller_id.eq(seller_id)))
                        .execute(connection)?
                }
                None => diesel::delete(of_property).execute(connection)?,
            };
            debug!(%property_id, ?seller_id, deleted, "Deleted availability");
            Ok(deleted)
        })
    }

    fn availability_slot(&self, id: Uuid) -> Result<AvailabilitySlot, StoreError> {
        self.with_connection(|connection| {
            availability::table
                .find(id)
                .select(AvailabilitySlot::as_select())
                .first::<AvailabilitySlot>(connection)
                .optional()?
                .ok_or(StoreError::NotFound(id))
        })
    }

    fn remove_availability_slot(&self, id: Uuid) -> Result<Uuid, StoreError> {
        self.with_connection(|connection| {
            diesel::delete(availability::table.find(id))
                .returning(availability::id)
                .get_result::<Uuid>(connection)
                .optional()?
                .ok_or(StoreError::NotFound(id))
        })
    }

    fn seller_availability(&self, seller_id: Uuid) -> Result<Vec<AvailabilitySlot>, StoreError> {
        self.with_connection(|connection| {
            let slots = availability::table
                .filter(availability::seller_id.eq(seller_id))
                .order((availability::start_time.asc(), availability::id.asc()))
                .select(AvailabilitySlot::as_select())
                .load::<AvailabilitySlot>(connection)?;
            Ok(slots)
        })
    }

    fn seller(&self, id: Uuid) -> Result<Option<Seller>, StoreError> {
        self.with_connection(|connection| {
            let seller = sellers::table
                .find(id)
                .select(Seller::as_select())
                .first::<Seller>(connection)
                .optional()?;
            Ok(seller)
        })
    }

    fn property(&self, id: Uuid) -> Result<Option<Property>, StoreError> {
        self.with_connection(|connection| {
            let property = properties::table
                .find(id)
                .select(Property::as_select())
                .first::<Property>(connection)
                .optional()?;
            Ok(property)
        })
    }

    fn health_check(&self) -> Result<DateTime<Utc>, StoreError> {
        self.with_connection(|connection| {
            let now = diesel::select(diesel::dsl::sql::<Timestamptz>("NOW()"))
                .get_result::<DateTime<Utc>>(connection)?;
            Ok(now)
        })
    }
}
