//! The `VendorApi` trait: the per-character and season lookups the pipeline
//! stages need from the vendor, so they can run against a fake in tests.

use std::future::Future;

use ookstats_blizzard::{BlizzardClient, CharacterStatus, Error, SeasonIndex};
use ookstats_core::{
  identity::AchievementRecord,
  model::{CharacterProfile, SeasonRecord},
};

pub trait VendorApi: Send + Sync {
  fn status(
    &self,
    name: &str,
    realm_slug: &str,
    region: &str,
  ) -> impl Future<Output = Result<CharacterStatus, Error>> + Send;

  fn achievements(
    &self,
    name: &str,
    realm_slug: &str,
    region: &str,
  ) -> impl Future<Output = Result<Vec<AchievementRecord>, Error>> + Send;

  /// Summary, equipment and avatar in one record.
  fn profile(
    &self,
    name: &str,
    realm_slug: &str,
    region: &str,
  ) -> impl Future<Output = Result<CharacterProfile, Error>> + Send;

  fn season_index(
    &self,
    region: &str,
  ) -> impl Future<Output = Result<SeasonIndex, Error>> + Send;

  fn season_detail(
    &self,
    region: &str,
    season_id: i64,
  ) -> impl Future<Output = Result<SeasonRecord, Error>> + Send;
}

impl VendorApi for BlizzardClient {
  async fn status(
    &self,
    name: &str,
    realm_slug: &str,
    region: &str,
  ) -> Result<CharacterStatus, Error> {
    self.fetch_character_status(name, realm_slug, region).await
  }

  async fn achievements(
    &self,
    name: &str,
    realm_slug: &str,
    region: &str,
  ) -> Result<Vec<AchievementRecord>, Error> {
    self.fetch_character_achievements(name, realm_slug, region).await
  }

  async fn profile(
    &self,
    name: &str,
    realm_slug: &str,
    region: &str,
  ) -> Result<CharacterProfile, Error> {
    self.fetch_character_profile(name, realm_slug, region).await
  }

  async fn season_index(&self, region: &str) -> Result<SeasonIndex, Error> {
    BlizzardClient::season_index(self, region).await
  }

  async fn season_detail(&self, region: &str, season_id: i64) -> Result<SeasonRecord, Error> {
    BlizzardClient::season_detail(self, region, season_id).await
  }
}
