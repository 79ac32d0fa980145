use iced::widget::{button, checkbox, column, row, text, text_input};
use iced::{Alignment, Element, Length, Task};
use std::sync::Arc;
use uuid::Uuid;

use crate::state::data::Crime;
use crate::state::detail_model::CrimeDetailViewModel;
use crate::state::live::SubscriptionId;
use crate::state::repository::CrimeRepository;
use crate::ui::pickers::{self, DatePicker, Picker, PickerMessage, TimePicker};
use crate::Message;

/// Detail screen events
#[derive(Debug, Clone)]
pub enum DetailMessage {
    /// A live query delivered; None once the query has closed
    Loaded(SubscriptionId, Option<Option<Crime>>),
    TitleChanged(String),
    SuspectChanged(String),
    SolvedToggled(bool),
    PoliceToggled(bool),
    OpenDatePicker,
    OpenTimePicker,
    Picker(PickerMessage),
}

/// What the screen currently knows about its crime
#[derive(Debug, Clone, PartialEq)]
pub enum Loaded {
    Waiting,
    Missing,
    Crime(Crime),
}

/// The crime detail screen.
///
/// The first delivered value becomes the local copy. From then on every
/// edit changes the local copy and is written straight through.
pub struct CrimeDetail {
    model: CrimeDetailViewModel,
    loaded: Loaded,
    picker: Option<Picker>,
}

impl CrimeDetail {
    pub fn new(repository: Arc<CrimeRepository>, crime_id: Uuid) -> (Self, Task<Message>) {
        let mut detail = Self {
            model: CrimeDetailViewModel::new(repository),
            loaded: Loaded::Waiting,
            picker: None,
        };
        let task = detail.load(crime_id);
        (detail, task)
    }

    /// Show another crime
    pub fn load(&mut self, crime_id: Uuid) -> Task<Message> {
        self.loaded = Loaded::Waiting;
        self.picker = None;
        self.model.load_crime(crime_id);
        self.listen()
    }

    pub fn crime_id(&self) -> Option<Uuid> {
        self.model.crime_id()
    }

    pub fn loaded(&self) -> &Loaded {
        &self.loaded
    }

    fn listen(&self) -> Task<Message> {
        match self.model.crime() {
            Some(query) => {
                let id = query.id();
                Task::perform(query.changes(), move |value| {
                    Message::Detail(DetailMessage::Loaded(id, value))
                })
            }
            None => Task::none(),
        }
    }

    pub fn update(&mut self, message: DetailMessage) -> Task<Message> {
        match message {
            DetailMessage::Loaded(id, value) => {
                // Deliveries for a query we already replaced
                if self.model.crime().map(|query| query.id()) != Some(id) {
                    return Task::none();
                }
                let Some(value) = value else {
                    return Task::none();
                };

                match (&self.loaded, value) {
                    (Loaded::Crime(_), _) => {}
                    (_, Some(crime)) => {
                        tracing::debug!(id = %crime.id, "crime loaded");
                        self.loaded = Loaded::Crime(crime);
                    }
                    (_, None) => self.loaded = Loaded::Missing,
                }
                self.listen()
            }
            DetailMessage::TitleChanged(title) => {
                self.edit(|crime| crime.title = title);
                Task::none()
            }
            DetailMessage::SuspectChanged(suspect) => {
                self.edit(|crime| crime.suspect = suspect);
                Task::none()
            }
            DetailMessage::SolvedToggled(solved) => {
                self.edit(|crime| crime.is_solved = solved);
                Task::none()
            }
            DetailMessage::PoliceToggled(requires_police) => {
                self.edit(|crime| crime.requires_police = requires_police);
                Task::none()
            }
            DetailMessage::OpenDatePicker => {
                if let Loaded::Crime(crime) = &self.loaded {
                    let local = pickers::to_local(crime.date);
                    self.picker = Some(Picker::Date(DatePicker::new(local.date())));
                }
                Task::none()
            }
            DetailMessage::OpenTimePicker => {
                if let Loaded::Crime(crime) = &self.loaded {
                    let local = pickers::to_local(crime.date);
                    self.picker = Some(Picker::Time(TimePicker::new(local)));
                }
                Task::none()
            }
            DetailMessage::Picker(PickerMessage::Cancel) => {
                self.picker = None;
                Task::none()
            }
            DetailMessage::Picker(PickerMessage::Confirm) => {
                if let Some(picker) = self.picker.take() {
                    self.edit(|crime| crime.date = picker.apply(crime.date));
                }
                Task::none()
            }
            DetailMessage::Picker(step) => {
                if let Some(picker) = &mut self.picker {
                    picker.step(step);
                }
                Task::none()
            }
        }
    }

    /// Change the local copy and write it through
    fn edit(&mut self, change: impl FnOnce(&mut Crime)) {
        if let Loaded::Crime(crime) = &mut self.loaded {
            change(crime);
            self.model.save_crime(crime.clone());
        }
    }

    pub fn view(&self) -> Element<'_, Message> {
        let back = button("< Crimes").on_press(Message::Back);

        let body: Element<'_, Message> = match &self.loaded {
            Loaded::Waiting => text("Loading crime...").into(),
            Loaded::Missing => text("This crime does not exist.").into(),
            Loaded::Crime(crime) => self.form(crime),
        };

        column![back, body].spacing(20).padding(30).into()
    }

    fn form<'a>(&'a self, crime: &'a Crime) -> Element<'a, Message> {
        let local = pickers::to_local(crime.date);

        let title = text_input("Crime title", &crime.title)
            .on_input(|value| Message::Detail(DetailMessage::TitleChanged(value)))
            .padding(8);

        let when = row![
            button(text(local.format("%A, %B %e, %Y").to_string()))
                .on_press(Message::Detail(DetailMessage::OpenDatePicker))
                .width(Length::Fill),
            button(text(local.format("%H:%M").to_string()))
                .on_press(Message::Detail(DetailMessage::OpenTimePicker)),
        ]
        .spacing(10)
        .align_y(Alignment::Center);

        let flags = row![
            checkbox("Solved", crime.is_solved)
                .on_toggle(|value| Message::Detail(DetailMessage::SolvedToggled(value))),
            checkbox("Requires police", crime.requires_police)
                .on_toggle(|value| Message::Detail(DetailMessage::PoliceToggled(value))),
        ]
        .spacing(20);

        let suspect = text_input("Suspect", &crime.suspect)
            .on_input(|value| Message::Detail(DetailMessage::SuspectChanged(value)))
            .padding(8);

        let mut form = column![
            text("Title").size(14),
            title,
            text("Details").size(14),
            when,
            flags,
            suspect,
            text(format!("Photo: {}", crime.photo_file_name())).size(12),
        ]
        .spacing(10);

        if let Some(picker) = &self.picker {
            form = form.push(picker.view());
        }

        form.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::repository::tests::{in_memory, next};
    use chrono::NaiveDate;

    async fn deliver(detail: &mut CrimeDetail) {
        let query = detail.model.crime().unwrap();
        let id = query.id();
        let value = next(query).await;
        let _ = detail.update(DetailMessage::Loaded(id, Some(value)));
    }

    #[tokio::test]
    async fn test_edits_are_written_through() {
        let repository = Arc::new(in_memory());
        let crime = Crime::new();
        repository.add_crime(crime.clone());

        let (mut detail, _) = CrimeDetail::new(Arc::clone(&repository), crime.id);
        deliver(&mut detail).await;
        assert_eq!(detail.loaded(), &Loaded::Crime(crime.clone()));

        let _ = detail.update(DetailMessage::TitleChanged("Stolen yogurt".to_string()));
        let _ = detail.update(DetailMessage::SolvedToggled(true));
        repository.flush().await;

        let stored = next(&repository.get_crime(crime.id)).await.unwrap();
        assert_eq!(stored.title, "Stolen yogurt");
        assert!(stored.is_solved);
        assert_eq!(stored.id, crime.id);
    }

    #[tokio::test]
    async fn test_missing_crime_is_a_normal_state() {
        let repository = Arc::new(in_memory());

        let (mut detail, _) = CrimeDetail::new(repository, Uuid::new_v4());
        assert_eq!(detail.loaded(), &Loaded::Waiting);

        deliver(&mut detail).await;
        assert_eq!(detail.loaded(), &Loaded::Missing);

        // Edits without a crime go nowhere
        let _ = detail.update(DetailMessage::TitleChanged("x".to_string()));
        assert_eq!(detail.loaded(), &Loaded::Missing);
    }

    #[tokio::test]
    async fn test_stale_delivery_is_ignored() {
        let repository = Arc::new(in_memory());
        let crime = Crime::new();

        let (mut detail, _) = CrimeDetail::new(repository, crime.id);
        let _ = detail.update(DetailMessage::Loaded(SubscriptionId(u64::MAX), Some(Some(crime))));

        assert_eq!(detail.loaded(), &Loaded::Waiting);
    }

    #[tokio::test]
    async fn test_time_picker_confirm_changes_only_time() {
        let repository = Arc::new(in_memory());
        let mut crime = Crime::new();
        let late = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(23, 20, 45)
            .unwrap();
        crime.date = pickers::from_local(late);
        repository.add_crime(crime.clone());

        let (mut detail, _) = CrimeDetail::new(Arc::clone(&repository), crime.id);
        deliver(&mut detail).await;

        let _ = detail.update(DetailMessage::OpenTimePicker);
        let _ = detail.update(DetailMessage::Picker(PickerMessage::Hour(1)));
        let _ = detail.update(DetailMessage::Picker(PickerMessage::Confirm));
        repository.flush().await;

        let stored = next(&repository.get_crime(crime.id)).await.unwrap();
        let after = pickers::to_local(stored.date);
        // 23h + 1 wraps to midnight of the same day
        assert_eq!(after, late.date().and_hms_opt(0, 20, 0).unwrap());
    }
}
