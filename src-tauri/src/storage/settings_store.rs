use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Result};
use serde::{Deserialize, Serialize};

use crate::providers::ProviderId;

const API_KEY: &str = "api_key";
const PROVIDER: &str = "provider";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredSettings {
  pub api_key: Option<String>,
  pub provider: ProviderId,
}

/// Last-used credential and provider, kept between launches.
pub struct SettingsStore {
  conn: Connection,
}

impl SettingsStore {
  pub fn open(path: &Path) -> Result<Self> {
    Self::init(Connection::open(path)?)
  }

  pub fn new_in_memory() -> Result<Self> {
    Self::init(Connection::open_in_memory()?)
  }

  fn init(conn: Connection) -> Result<Self> {
    conn.execute(
      "create table if not exists settings(key text primary key, value text not null)",
      [],
    )?;
    Ok(Self { conn })
  }

  pub fn load(&self) -> Result<StoredSettings> {
    let api_key = self.get(API_KEY)?.filter(|value| !value.is_empty());
    let provider = ProviderId::from_id(self.get(PROVIDER)?.as_deref());
    Ok(StoredSettings { api_key, provider })
  }

  pub fn save_api_key(&self, api_key: &str) -> Result<()> {
    self.set(API_KEY, api_key)
  }

  pub fn save_provider(&self, provider: ProviderId) -> Result<()> {
    self.set(PROVIDER, provider.as_str())
  }

  fn get(&self, key: &str) -> Result<Option<String>> {
    self
      .conn
      .query_row("select value from settings where key = ?1", [key], |row| row.get(0))
      .optional()
  }

  fn set(&self, key: &str, value: &str) -> Result<()> {
    self.conn.execute(
      "insert into settings(key,value) values (?1,?2)
       on conflict(key) do update set value = excluded.value",
      (key, value),
    )?;
    Ok(())
  }
}
