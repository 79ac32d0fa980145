use std::sync::Arc;

use super::data::Crime;
use super::live::LiveQuery;
use super::repository::CrimeRepository;

/// State behind the crime list screen
pub struct CrimeListViewModel {
    repository: Arc<CrimeRepository>,
    crimes: LiveQuery<Vec<Crime>>,
}

impl CrimeListViewModel {
    pub fn new(repository: Arc<CrimeRepository>) -> Self {
        let crimes = repository.get_crimes();
        Self { repository, crimes }
    }

    /// Every crime, re-delivered after each write
    pub fn crimes(&self) -> &LiveQuery<Vec<Crime>> {
        &self.crimes
    }

    pub fn add_crime(&self, crime: Crime) {
        self.repository.add_crime(crime);
    }
}
