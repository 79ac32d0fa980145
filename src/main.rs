use iced::widget::{column, container, text};
use iced::{Element, Length, Task, Theme};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::Mutex;
use uuid::Uuid;

mod logging;
mod state;
mod ui;

use state::config::Config;
use state::context::AppContext;
use state::data::Crime;
use state::error::{ConfigError, RepositoryError};
use state::live::SubscriptionId;
use state::repository::CrimeRepository;
use state::worker::WriteFailure;
use ui::crime_detail::{CrimeDetail, DetailMessage, Loaded};
use ui::crime_list::CrimeList;

/// Errors that stop the application before or while the window runs
#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("user interface failed: {0}")]
    Ui(#[from] iced::Error),
}

/// Main application state
struct CriminalIntent {
    repository: Arc<CrimeRepository>,
    /// The list screen stays alive underneath the detail screen
    list: CrimeList,
    /// Shown on top of the list while Some
    detail: Option<CrimeDetail>,
    failures: Arc<Mutex<broadcast::Receiver<WriteFailure>>>,
    /// Status message to display to the user
    status: String,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    /// The crime list query delivered (None once it closed)
    CrimesChanged(SubscriptionId, Option<Vec<Crime>>),
    /// User asked for a new crime
    AddCrime,
    /// User picked a crime from the list
    CrimeSelected(Uuid),
    /// User pressed "Contact police" on a serious crime
    ContactPolice(Uuid),
    /// User left the detail screen
    Back,
    Detail(DetailMessage),
    /// A queued write failed (None once the worker is gone)
    WriteFailed(Option<WriteFailure>),
}

impl CriminalIntent {
    /// Create a new instance of the application
    fn new(repository: Arc<CrimeRepository>) -> (Self, Task<Message>) {
        let (list, list_task) = CrimeList::new(Arc::clone(&repository));
        let failures = Arc::new(Mutex::new(repository.write_failures()));

        let app = CriminalIntent {
            repository,
            list,
            detail: None,
            failures,
            status: String::from("Ready."),
        };
        let failure_task = app.watch_failures();

        (app, Task::batch([list_task, failure_task]))
    }

    fn watch_failures(&self) -> Task<Message> {
        Task::perform(next_failure(Arc::clone(&self.failures)), Message::WriteFailed)
    }

    fn open_detail(&mut self, crime_id: Uuid) -> Task<Message> {
        let (detail, task) = CrimeDetail::new(Arc::clone(&self.repository), crime_id);
        self.detail = Some(detail);
        task
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::CrimesChanged(subscription, crimes) => {
                self.list.crimes_changed(subscription, crimes)
            }
            Message::AddCrime => {
                let crime_id = self.list.add_crime();
                self.status = String::from("New crime added.");
                self.open_detail(crime_id)
            }
            Message::CrimeSelected(crime_id) => {
                tracing::debug!(%crime_id, "crime selected");
                self.open_detail(crime_id)
            }
            Message::ContactPolice(crime_id) => {
                let title = self
                    .list
                    .rows()
                    .iter()
                    .map(|row| row.crime())
                    .find(|crime| crime.id == crime_id)
                    .map(|crime| crime.title.clone())
                    .unwrap_or_default();
                tracing::info!(%crime_id, "contacting police");
                self.status = format!("Contacting police about \"{title}\"...");
                Task::none()
            }
            Message::Back => {
                // Dropping the screen releases its live query
                if let Some(detail) = self.detail.take() {
                    tracing::debug!(crime_id = ?detail.crime_id(), "closing crime");
                }
                Task::none()
            }
            Message::Detail(message) => match &mut self.detail {
                Some(detail) => detail.update(message),
                None => Task::none(),
            },
            Message::WriteFailed(Some(failure)) => {
                self.status = format!("Could not save crime ({}): {}", failure.op, failure.message);
                self.watch_failures()
            }
            Message::WriteFailed(None) => Task::none(),
        }
    }

    /// Build the user interface
    fn view(&self) -> Element<'_, Message> {
        let screen = match &self.detail {
            Some(detail) => detail.view(),
            None => self.list.view(),
        };

        let title = match self.detail.as_ref().map(CrimeDetail::loaded) {
            Some(Loaded::Crime(crime)) if !crime.title.is_empty() => crime.title.as_str(),
            _ => "Criminal Intent",
        };

        let content = column![
            text(title).size(14),
            container(screen).height(Length::Fill),
            text(&self.status).size(14),
        ]
        .spacing(10)
        .padding(10);

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

/// Wait for the next failed write, skipping over any we fell behind on
async fn next_failure(failures: Arc<Mutex<broadcast::Receiver<WriteFailure>>>) -> Option<WriteFailure> {
    let mut failures = failures.lock().await;
    loop {
        match failures.recv().await {
            Ok(failure) => return Some(failure),
            Err(RecvError::Lagged(missed)) => {
                tracing::warn!(missed, "write failures dropped before display");
            }
            Err(RecvError::Closed) => return None,
        }
    }
}

fn main() -> Result<(), AppError> {
    let config = Config::load()?;
    logging::init_logging(&config.log_filter);

    let context = AppContext::new();
    context.initialize(&config)?;
    let repository = context.get()?;

    tracing::info!(path = %config.database_path.display(), "Criminal Intent starting");

    let app_repository = Arc::clone(&repository);
    let result = iced::application("Criminal Intent", CriminalIntent::update, CriminalIntent::view)
        .theme(CriminalIntent::theme)
        .centered()
        .run_with(move || CriminalIntent::new(app_repository));

    // Edits queued just before the window closed must still reach the disk
    repository.flush_blocking();
    tracing::info!("Criminal Intent stopped");

    result?;
    Ok(())
}
