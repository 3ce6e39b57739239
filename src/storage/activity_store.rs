use std::sync::Arc;

use tracing::info;

use crate::{
    catalog::ActivityFilter,
    error::{Error, Result},
    models::{Activity, FormConfiguration, GeneratedActivity},
    storage::{StorageBackend, load_or, save},
};

pub const ACTIVITIES_KEY: &str = "bncc-activities";

/// Saved activities, newest first.
pub struct ActivityStore {
    storage: Arc<dyn StorageBackend>,
}

impl ActivityStore {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }

    pub async fn list(&self) -> Result<Vec<Activity>> {
        load_or(self.storage.as_ref(), ACTIVITIES_KEY, Vec::new()).await
    }

    pub async fn get(&self, id: &str) -> Result<Option<Activity>> {
        Ok(self.list().await?.into_iter().find(|a| a.id == id))
    }

    pub async fn filtered(&self, filter: &ActivityFilter) -> Result<Vec<Activity>> {
        let mut all = self.list().await?;
        all.retain(|a| filter.matches(a));
        Ok(all)
    }

    /// Give generated activities an identity, merge the form they came from,
    /// and put them ahead of the existing ones.
    pub async fn add_generated(
        &self,
        form: &FormConfiguration,
        generated: Vec<GeneratedActivity>,
    ) -> Result<Vec<Activity>> {
        let _guard = self.storage.write_lock().lock().await;
        let added: Vec<Activity> = generated
            .into_iter()
            .map(|g| Activity::from_generated(g, form))
            .collect();

        let mut all = self.list().await?;
        all.splice(0..0, added.iter().cloned());
        save(self.storage.as_ref(), ACTIVITIES_KEY, &all).await?;

        info!(added = added.len(), total = all.len(), "activities saved");
        Ok(added)
    }

    pub async fn update(&self, activity: Activity) -> Result<()> {
        let _guard = self.storage.write_lock().lock().await;
        let mut all = self.list().await?;
        let slot = all
            .iter_mut()
            .find(|a| a.id == activity.id)
            .ok_or_else(|| Error::NotFound(format!("activity {}", activity.id)))?;
        *slot = activity;
        save(self.storage.as_ref(), ACTIVITIES_KEY, &all).await
    }

    /// Returns whether an activity was removed.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let _guard = self.storage.write_lock().lock().await;
        let mut all = self.list().await?;
        let before = all.len();
        all.retain(|a| a.id != id);
        if all.len() == before {
            return Ok(false);
        }
        save(self.storage.as_ref(), ACTIVITIES_KEY, &all).await?;
        Ok(true)
    }
}
