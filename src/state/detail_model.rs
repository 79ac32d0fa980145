use std::sync::Arc;
use uuid::Uuid;

use super::data::Crime;
use super::live::LiveQuery;
use super::repository::CrimeRepository;

/// State behind the crime detail screen.
///
/// Holds the id of the crime being shown. Setting a new id swaps the
/// live query, releasing the old one.
pub struct CrimeDetailViewModel {
    repository: Arc<CrimeRepository>,
    crime_id: Option<Uuid>,
    crime: Option<LiveQuery<Option<Crime>>>,
}

impl CrimeDetailViewModel {
    pub fn new(repository: Arc<CrimeRepository>) -> Self {
        Self {
            repository,
            crime_id: None,
            crime: None,
        }
    }

    /// Start following the crime with `crime_id`
    pub fn load_crime(&mut self, crime_id: Uuid) -> &LiveQuery<Option<Crime>> {
        self.crime_id = Some(crime_id);
        self.crime.insert(self.repository.get_crime(crime_id))
    }

    pub fn crime_id(&self) -> Option<Uuid> {
        self.crime_id
    }

    /// The live query for the current id, if one was loaded
    pub fn crime(&self) -> Option<&LiveQuery<Option<Crime>>> {
        self.crime.as_ref()
    }

    /// Write the edited crime back
    pub fn save_crime(&self, crime: Crime) {
        self.repository.update_crime(crime);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::repository::tests::{in_memory, next};

    #[tokio::test]
    async fn test_nothing_loaded_at_start() {
        let model = CrimeDetailViewModel::new(Arc::new(in_memory()));

        assert!(model.crime_id().is_none());
        assert!(model.crime().is_none());
    }

    #[tokio::test]
    async fn test_load_switches_to_new_id() {
        let repository = Arc::new(in_memory());
        let first = Crime::new();
        let mut second = Crime::new();
        second.title = "Second".to_string();
        repository.add_crime(first.clone());
        repository.add_crime(second.clone());

        let mut model = CrimeDetailViewModel::new(Arc::clone(&repository));
        let query = model.load_crime(first.id);
        assert_eq!(next(query).await, Some(first));

        let query = model.load_crime(second.id);
        assert_eq!(next(query).await, Some(second.clone()));
        assert_eq!(model.crime_id(), Some(second.id));
    }

    #[tokio::test]
    async fn test_unknown_id_delivers_none() {
        let mut model = CrimeDetailViewModel::new(Arc::new(in_memory()));

        let query = model.load_crime(Uuid::new_v4());

        assert_eq!(next(query).await, None);
    }

    #[tokio::test]
    async fn test_save_updates_loaded_crime() {
        let repository = Arc::new(in_memory());
        let mut crime = Crime::new();
        repository.add_crime(crime.clone());

        let mut model = CrimeDetailViewModel::new(repository);
        assert_eq!(next(model.load_crime(crime.id)).await, Some(crime.clone()));

        crime.suspect = "Mallory".to_string();
        model.save_crime(crime.clone());

        let query = model.crime().unwrap();
        assert_eq!(next(query).await, Some(crime));
    }
}
