use once_cell::sync::OnceCell;
use std::sync::Arc;

use super::config::Config;
use super::error::RepositoryError;
use super::repository::CrimeRepository;

/// Owns the one repository of the running application.
///
/// `main` creates a single context, initializes it once, and hands
/// `Arc<CrimeRepository>` clones to every screen.
#[derive(Debug, Default)]
pub struct AppContext {
    repository: OnceCell<Arc<CrimeRepository>>,
}

impl AppContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the repository on first call. Later calls return the
    /// existing repository and ignore `config`.
    pub fn initialize(&self, config: &Config) -> Result<Arc<CrimeRepository>, RepositoryError> {
        let repository = self.repository.get_or_try_init(|| {
            tracing::info!(path = %config.database_path.display(), "initializing crime repository");
            CrimeRepository::open(config).map(Arc::new)
        })?;

        Ok(Arc::clone(repository))
    }

    /// The repository, if `initialize` has been called
    pub fn get(&self) -> Result<Arc<CrimeRepository>, RepositoryError> {
        self.repository
            .get()
            .cloned()
            .ok_or(RepositoryError::NotInitialized)
    }
}
