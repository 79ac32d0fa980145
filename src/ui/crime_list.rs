use chrono::Local;
use iced::widget::{button, column, container, horizontal_space, row, scrollable, text, Column};
use iced::{Alignment, Element, Length, Task};
use std::sync::Arc;
use uuid::Uuid;

use crate::state::data::Crime;
use crate::state::list_model::CrimeListViewModel;
use crate::state::live::SubscriptionId;
use crate::state::repository::CrimeRepository;
use crate::ui::diff::{self, ListDiffer, RowChange};
use crate::Message;

/// One row of the crime list. Crimes that require the police get their
/// own layout with a contact action.
#[derive(Debug, Clone, PartialEq)]
pub enum CrimeRow {
    Standard(Crime),
    Escalated(Crime),
}

impl From<Crime> for CrimeRow {
    fn from(crime: Crime) -> Self {
        if crime.requires_police {
            CrimeRow::Escalated(crime)
        } else {
            CrimeRow::Standard(crime)
        }
    }
}

impl CrimeRow {
    pub fn crime(&self) -> &Crime {
        match self {
            CrimeRow::Standard(crime) | CrimeRow::Escalated(crime) => crime,
        }
    }

    pub fn view(&self) -> Element<'_, Message> {
        match self {
            CrimeRow::Standard(crime) => button(summary(crime))
                .on_press(Message::CrimeSelected(crime.id))
                .width(Length::Fill)
                .style(button::secondary)
                .into(),
            CrimeRow::Escalated(crime) => row![
                button(summary(crime))
                    .on_press(Message::CrimeSelected(crime.id))
                    .width(Length::Fill)
                    .style(button::secondary),
                button("Contact police")
                    .on_press(Message::ContactPolice(crime.id))
                    .style(button::danger),
            ]
            .spacing(10)
            .align_y(Alignment::Center)
            .into(),
        }
    }
}

/// Title, date and solved mark
fn summary(crime: &Crime) -> Element<'_, Message> {
    let title = if crime.title.is_empty() {
        "(untitled)"
    } else {
        crime.title.as_str()
    };
    let date = crime
        .date
        .with_timezone(&Local)
        .format("%a %b %e %H:%M %Y")
        .to_string();

    let mut line = row![column![text(title).size(18), text(date).size(12)], horizontal_space()]
        .align_y(Alignment::Center);

    if crime.is_solved {
        line = line.push(text("Solved").size(14));
    }

    line.into()
}

/// The crime list screen.
///
/// Keeps the rows of the last delivered list and patches them with the
/// changes between deliveries.
pub struct CrimeList {
    model: CrimeListViewModel,
    crimes: ListDiffer<Crime>,
    rows: Vec<CrimeRow>,
    loaded: bool,
}

impl CrimeList {
    pub fn new(repository: Arc<CrimeRepository>) -> (Self, Task<Message>) {
        let list = Self {
            model: CrimeListViewModel::new(repository),
            crimes: ListDiffer::new(),
            rows: Vec::new(),
            loaded: false,
        };
        let task = list.listen();
        (list, task)
    }

    fn listen(&self) -> Task<Message> {
        let query = self.model.crimes();
        let id = query.id();
        Task::perform(query.changes(), move |crimes| Message::CrimesChanged(id, crimes))
    }

    /// A new list arrived. Returns the task waiting for the next one.
    pub fn crimes_changed(
        &mut self,
        subscription: SubscriptionId,
        crimes: Option<Vec<Crime>>,
    ) -> Task<Message> {
        if subscription != self.model.crimes().id() {
            return Task::none();
        }
        let Some(crimes) = crimes else {
            tracing::warn!("crime list query closed");
            return Task::none();
        };

        tracing::info!(count = crimes.len(), "got crimes");
        let changes = self.crimes.submit(crimes);
        tracing::debug!(changes = changes.len(), "patching crime rows");

        diff::apply(&mut self.rows, changes.into_iter().map(row_change).collect());
        self.loaded = true;

        self.listen()
    }

    /// Create a crime with default values and store it. Returns its id.
    pub fn add_crime(&self) -> Uuid {
        let crime = Crime::new();
        let id = crime.id;
        self.model.add_crime(crime);
        id
    }

    pub fn rows(&self) -> &[CrimeRow] {
        &self.rows
    }

    pub fn view(&self) -> Element<'_, Message> {
        let header = row![
            text("Crimes").size(32),
            horizontal_space(),
            button("New crime").on_press(Message::AddCrime),
        ]
        .align_y(Alignment::Center);

        let body: Element<'_, Message> = if !self.loaded {
            text("Loading...").into()
        } else if self.rows.is_empty() {
            container(
                column![
                    text("No crimes yet."),
                    button("Add a crime").on_press(Message::AddCrime).padding(10),
                ]
                .spacing(10)
                .align_x(Alignment::Center),
            )
            .width(Length::Fill)
            .center_x(Length::Fill)
            .into()
        } else {
            scrollable(Column::with_children(self.rows.iter().map(CrimeRow::view)).spacing(6)).into()
        };

        column![header, body].spacing(20).padding(30).into()
    }
}

fn row_change(change: RowChange<Crime>) -> RowChange<CrimeRow> {
    match change {
        RowChange::Insert { index, item } => RowChange::Insert {
            index,
            item: item.into(),
        },
        RowChange::Remove { index } => RowChange::Remove { index },
        RowChange::Change { index, item } => RowChange::Change {
            index,
            item: item.into(),
        },
    }
}
