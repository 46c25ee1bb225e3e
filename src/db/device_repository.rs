//! Device and device type repositories.

use serde_json::Value;
use sqlx::QueryBuilder;

use super::device::{
    Device, DeviceType, DeviceTypeUpdate, DeviceUpdate, NewDevice, NewDeviceType, PrivateData,
    StatusReport,
};
use super::DbPool;
use crate::{DevcloudError, Result};

const DEVICE_TYPE_COLUMNS: &str = "id, name, description, icon, created_at, updated_at";

const DEVICE_SELECT: &str = "SELECT d.id, d.device_uid, d.name, d.device_type_id, d.status, \
     d.private_data, d.firmware_version, d.last_online, d.is_online, d.created_at, d.updated_at, \
     t.name AS type_name, t.description AS type_description, t.icon AS type_icon, \
     t.created_at AS type_created_at, t.updated_at AS type_updated_at \
     FROM devices d LEFT JOIN device_types t ON t.id = d.device_type_id";

fn encode(data: &PrivateData) -> String {
    Value::Object(data.clone()).to_string()
}

/// Repository for device type CRUD operations.
pub struct DeviceTypeRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> DeviceTypeRepository<'a> {
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a device type and return it with its assigned ID.
    pub async fn create(&self, new_type: &NewDeviceType) -> Result<DeviceType> {
        let result =
            sqlx::query("INSERT INTO device_types (name, description, icon) VALUES (?, ?, ?)")
                .bind(&new_type.name)
                .bind(&new_type.description)
                .bind(&new_type.icon)
                .execute(self.pool)
                .await?;

        self.get_by_id(result.last_insert_rowid())
            .await?
            .ok_or_else(|| DevcloudError::NotFound("device type".to_string()))
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<DeviceType>> {
        let device_type = sqlx::query_as::<_, DeviceType>(&format!(
            "SELECT {DEVICE_TYPE_COLUMNS} FROM device_types WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(device_type)
    }

    /// Get a device type by name (case-insensitive).
    pub async fn get_by_name(&self, name: &str) -> Result<Option<DeviceType>> {
        let device_type = sqlx::query_as::<_, DeviceType>(&format!(
            "SELECT {DEVICE_TYPE_COLUMNS} FROM device_types WHERE name = ? COLLATE NOCASE"
        ))
        .bind(name)
        .fetch_optional(self.pool)
        .await?;

        Ok(device_type)
    }

    /// List device types ordered by ID.
    pub async fn list(&self, offset: i64, limit: i64) -> Result<Vec<DeviceType>> {
        let types = sqlx::query_as::<_, DeviceType>(&format!(
            "SELECT {DEVICE_TYPE_COLUMNS} FROM device_types ORDER BY id LIMIT ? OFFSET ?"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        Ok(types)
    }

    pub async fn count(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM device_types")
            .fetch_one(self.pool)
            .await?;
        Ok(count.0)
    }

    /// Update a device type by ID.
    ///
    /// Returns the updated type, or None if not found.
    pub async fn update(&self, id: i64, update: &DeviceTypeUpdate) -> Result<Option<DeviceType>> {
        if update.is_empty() {
            return self.get_by_id(id).await;
        }

        let mut query: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new("UPDATE device_types SET ");
        let mut separated = query.separated(", ");
        separated.push("updated_at = datetime('now')");

        if let Some(ref name) = update.name {
            separated.push("name = ");
            separated.push_bind_unseparated(name.clone());
        }
        if let Some(ref description) = update.description {
            separated.push("description = ");
            separated.push_bind_unseparated(description.clone());
        }
        if let Some(ref icon) = update.icon {
            separated.push("icon = ");
            separated.push_bind_unseparated(icon.clone());
        }

        query.push(" WHERE id = ");
        query.push_bind(id);

        let result = query.build().execute(self.pool).await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_by_id(id).await
    }

    /// Number of devices filed under a type.
    pub async fn device_count(&self, id: i64) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM devices WHERE device_type_id = ?")
            .bind(id)
            .fetch_one(self.pool)
            .await?;
        Ok(count.0)
    }

    /// Delete a device type. Returns false if it did not exist.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM device_types WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Repository for device CRUD and status operations.
pub struct DeviceRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> DeviceRepository<'a> {
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Register a device and return it with its assigned ID.
    pub async fn create(&self, new_device: &NewDevice) -> Result<Device> {
        let result = sqlx::query(
            "INSERT INTO devices (device_uid, name, device_type_id, private_data, firmware_version) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&new_device.device_uid)
        .bind(&new_device.name)
        .bind(new_device.device_type_id)
        .bind(encode(&new_device.private_data))
        .bind(&new_device.firmware_version)
        .execute(self.pool)
        .await?;

        self.get_by_id(result.last_insert_rowid())
            .await?
            .ok_or_else(|| DevcloudError::NotFound("device".to_string()))
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Device>> {
        let row = sqlx::query_as::<_, DeviceRow>(&format!("{DEVICE_SELECT} WHERE d.id = ?"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(DeviceRow::into_device))
    }

    /// Get a device by the identifier it reports itself with.
    pub async fn get_by_uid(&self, device_uid: &str) -> Result<Option<Device>> {
        let row =
            sqlx::query_as::<_, DeviceRow>(&format!("{DEVICE_SELECT} WHERE d.device_uid = ?"))
                .bind(device_uid)
                .fetch_optional(self.pool)
                .await?;

        Ok(row.map(DeviceRow::into_device))
    }

    pub async fn uid_exists(&self, device_uid: &str) -> Result<bool> {
        let exists: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM devices WHERE device_uid = ?)")
                .bind(device_uid)
                .fetch_one(self.pool)
                .await?;
        Ok(exists.0)
    }

    /// List devices ordered by ID, optionally only those of one type.
    pub async fn list(
        &self,
        device_type_id: Option<i64>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Device>> {
        let mut query: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(DEVICE_SELECT);
        if let Some(type_id) = device_type_id {
            query.push(" WHERE d.device_type_id = ");
            query.push_bind(type_id);
        }
        query.push(" ORDER BY d.id LIMIT ");
        query.push_bind(limit);
        query.push(" OFFSET ");
        query.push_bind(offset);

        let rows = query
            .build_query_as::<DeviceRow>()
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(DeviceRow::into_device).collect())
    }

    /// Count devices, optionally only those of one type.
    pub async fn count(&self, device_type_id: Option<i64>) -> Result<i64> {
        let mut query: QueryBuilder<sqlx::Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM devices");
        if let Some(type_id) = device_type_id {
            query.push(" WHERE device_type_id = ");
            query.push_bind(type_id);
        }

        let count = query
            .build_query_as::<(i64,)>()
            .fetch_one(self.pool)
            .await?;
        Ok(count.0)
    }

    /// Update a device by ID.
    ///
    /// Returns the updated device, or None if not found.
    pub async fn update(&self, id: i64, update: &DeviceUpdate) -> Result<Option<Device>> {
        if update.is_empty() {
            return self.get_by_id(id).await;
        }

        let mut query: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new("UPDATE devices SET ");
        let mut separated = query.separated(", ");
        separated.push("updated_at = datetime('now')");

        if let Some(ref name) = update.name {
            separated.push("name = ");
            separated.push_bind_unseparated(name.clone());
        }
        if let Some(type_id) = update.device_type_id {
            separated.push("device_type_id = ");
            separated.push_bind_unseparated(type_id);
        }
        if let Some(status) = update.status {
            separated.push("status = ");
            separated.push_bind_unseparated(status.as_str());
        }
        if let Some(ref data) = update.private_data {
            separated.push("private_data = ");
            separated.push_bind_unseparated(encode(data));
        }
        if let Some(ref version) = update.firmware_version {
            separated.push("firmware_version = ");
            separated.push_bind_unseparated(version.clone());
        }

        query.push(" WHERE id = ");
        query.push_bind(id);

        let result = query.build().execute(self.pool).await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_by_id(id).await
    }

    /// Record a status report. `last_online` defaults to now.
    pub async fn update_status(&self, id: i64, report: &StatusReport) -> Result<Option<Device>> {
        let result = sqlx::query(
            "UPDATE devices SET status = ?, is_online = ?, \
             last_online = COALESCE(?, datetime('now')), updated_at = datetime('now') \
             WHERE id = ?",
        )
        .bind(report.status.as_str())
        .bind(report.is_online)
        .bind(&report.last_online)
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_by_id(id).await
    }

    /// Merge keys into a device's private data, overwriting existing keys.
    pub async fn merge_private_data(&self, id: i64, data: &PrivateData) -> Result<Option<Device>> {
        let mut tx = self.pool.begin().await?;

        let stored: Option<(String,)> =
            sqlx::query_as("SELECT private_data FROM devices WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some((stored,)) = stored else {
            return Ok(None);
        };

        let mut merged: PrivateData = serde_json::from_str(&stored).unwrap_or_default();
        merged.extend(data.clone());

        sqlx::query("UPDATE devices SET private_data = ?, updated_at = datetime('now') WHERE id = ?")
            .bind(encode(&merged))
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        self.get_by_id(id).await
    }

    /// Delete a device. Returns false if it did not exist.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM devices WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Internal struct for mapping joined rows to Device.
#[derive(sqlx::FromRow)]
struct DeviceRow {
    id: i64,
    device_uid: String,
    name: String,
    device_type_id: i64,
    status: String,
    private_data: String,
    firmware_version: Option<String>,
    last_online: Option<String>,
    is_online: bool,
    created_at: String,
    updated_at: String,
    type_name: Option<String>,
    type_description: Option<String>,
    type_icon: Option<String>,
    type_created_at: Option<String>,
    type_updated_at: Option<String>,
}

impl DeviceRow {
    fn into_device(self) -> Device {
        let device_type = self.type_name.map(|name| DeviceType {
            id: self.device_type_id,
            name,
            description: self.type_description,
            icon: self.type_icon,
            created_at: self.type_created_at.unwrap_or_default(),
            updated_at: self.type_updated_at.unwrap_or_default(),
        });

        Device {
            id: self.id,
            device_uid: self.device_uid,
            name: self.name,
            device_type_id: self.device_type_id,
            device_type,
            status: self.status.parse().unwrap_or_default(),
            private_data: serde_json::from_str(&self.private_data).unwrap_or_default(),
            firmware_version: self.firmware_version,
            last_online: self.last_online,
            is_online: self.is_online,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DeviceStatus;
    use crate::Database;
    use serde_json::json;

    async fn setup() -> (Database, DeviceType) {
        let db = Database::open_in_memory().await.unwrap();
        let sensor = DeviceTypeRepository::new(db.pool())
            .create(&NewDeviceType::new("Temperature sensor").with_icon("temperature"))
            .await
            .unwrap();
        (db, sensor)
    }

    fn object(value: Value) -> PrivateData {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[tokio::test]
    async fn test_device_type_crud() {
        let (db, sensor) = setup().await;
        let repo = DeviceTypeRepository::new(db.pool());

        assert_eq!(sensor.name, "Temperature sensor");
        assert_eq!(sensor.icon.as_deref(), Some("temperature"));
        assert!(repo.get_by_name("TEMPERATURE SENSOR").await.unwrap().is_some());

        let updated = repo
            .update(
                sensor.id,
                &DeviceTypeUpdate::new()
                    .description(Some("Ambient".to_string()))
                    .icon(None),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.description.as_deref(), Some("Ambient"));
        assert!(updated.icon.is_none());

        assert!(repo.update(999, &DeviceTypeUpdate::new().name("x")).await.unwrap().is_none());
        assert!(repo.delete(sensor.id).await.unwrap());
        assert!(!repo.delete(sensor.id).await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_type_name_rejected() {
        let (db, _sensor) = setup().await;
        let repo = DeviceTypeRepository::new(db.pool());

        let result = repo.create(&NewDeviceType::new("temperature SENSOR")).await;
        assert!(matches!(result, Err(DevcloudError::Database(_))));
    }

    #[tokio::test]
    async fn test_device_create_and_lookup() {
        let (db, sensor) = setup().await;
        let repo = DeviceRepository::new(db.pool());

        let device = repo
            .create(
                &NewDevice::new("TEMP-001", "Living room", sensor.id)
                    .with_private_data(object(json!({"battery_level": 85})))
                    .with_firmware_version("v1.0.2"),
            )
            .await
            .unwrap();

        assert_eq!(device.status, DeviceStatus::Inactive);
        assert!(!device.is_online);
        assert!(device.last_online.is_none());
        assert_eq!(device.private_data["battery_level"], 85);
        assert_eq!(device.device_type.as_ref().unwrap().name, "Temperature sensor");

        let found = repo.get_by_uid("TEMP-001").await.unwrap().unwrap();
        assert_eq!(found.id, device.id);
        assert!(repo.uid_exists("TEMP-001").await.unwrap());
        assert!(repo.get_by_uid("temp-001").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_device_requires_existing_type() {
        let (db, _sensor) = setup().await;

        let result = DeviceRepository::new(db.pool())
            .create(&NewDevice::new("X-1", "Orphan", 999))
            .await;
        assert!(matches!(result, Err(DevcloudError::Database(_))));
    }

    #[tokio::test]
    async fn test_list_filters_by_type() {
        let (db, sensor) = setup().await;
        let switch = DeviceTypeRepository::new(db.pool())
            .create(&NewDeviceType::new("Switch"))
            .await
            .unwrap();
        let repo = DeviceRepository::new(db.pool());

        repo.create(&NewDevice::new("T-1", "a", sensor.id)).await.unwrap();
        repo.create(&NewDevice::new("S-1", "b", switch.id)).await.unwrap();
        repo.create(&NewDevice::new("T-2", "c", sensor.id)).await.unwrap();

        let all = repo.list(None, 0, 10).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(repo.count(None).await.unwrap(), 3);

        let sensors = repo.list(Some(sensor.id), 0, 10).await.unwrap();
        let uids: Vec<&str> = sensors.iter().map(|d| d.device_uid.as_str()).collect();
        assert_eq!(uids, vec!["T-1", "T-2"]);
        assert_eq!(repo.count(Some(switch.id)).await.unwrap(), 1);

        let page = repo.list(None, 1, 1).await.unwrap();
        assert_eq!(page[0].device_uid, "S-1");

        let types = DeviceTypeRepository::new(db.pool());
        assert_eq!(types.device_count(sensor.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_update_status_defaults_last_online() {
        let (db, sensor) = setup().await;
        let repo = DeviceRepository::new(db.pool());
        let device = repo.create(&NewDevice::new("T-1", "a", sensor.id)).await.unwrap();

        let updated = repo
            .update_status(
                device.id,
                &StatusReport {
                    status: DeviceStatus::Active,
                    is_online: true,
                    last_online: None,
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, DeviceStatus::Active);
        assert!(updated.is_online);
        assert!(updated.last_online.is_some());

        let updated = repo
            .update_status(
                device.id,
                &StatusReport {
                    status: DeviceStatus::Error,
                    is_online: false,
                    last_online: Some("2024-01-01 08:00:00".to_string()),
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.last_online.as_deref(), Some("2024-01-01 08:00:00"));

        let missing = repo
            .update_status(
                999,
                &StatusReport {
                    status: DeviceStatus::Active,
                    is_online: true,
                    last_online: None,
                },
            )
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_update_replaces_and_merge_extends_private_data() {
        let (db, sensor) = setup().await;
        let repo = DeviceRepository::new(db.pool());
        let device = repo
            .create(
                &NewDevice::new("T-1", "a", sensor.id)
                    .with_private_data(object(json!({"a": 1, "b": 2}))),
            )
            .await
            .unwrap();

        let merged = repo
            .merge_private_data(device.id, &object(json!({"b": 3, "c": 4})))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(Value::Object(merged.private_data), json!({"a": 1, "b": 3, "c": 4}));

        let replaced = repo
            .update(
                device.id,
                &DeviceUpdate::new()
                    .private_data(object(json!({"z": true})))
                    .status(DeviceStatus::Maintenance)
                    .firmware_version(Some("v2".to_string())),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(Value::Object(replaced.private_data), json!({"z": true}));
        assert_eq!(replaced.status, DeviceStatus::Maintenance);
        assert_eq!(replaced.firmware_version.as_deref(), Some("v2"));

        assert!(repo
            .merge_private_data(999, &PrivateData::new())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_delete_device() {
        let (db, sensor) = setup().await;
        let repo = DeviceRepository::new(db.pool());
        let device = repo.create(&NewDevice::new("T-1", "a", sensor.id)).await.unwrap();

        assert!(repo.delete(device.id).await.unwrap());
        assert!(repo.get_by_id(device.id).await.unwrap().is_none());
        assert!(!repo.delete(device.id).await.unwrap());
    }
}
