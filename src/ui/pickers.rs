/// Date and time pickers for the detail screen
///
/// Both pickers work on local wall-clock time and only touch their own
/// half of the timestamp: the date picker keeps the time of day, the time
/// picker keeps the calendar day.
use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use iced::widget::{button, column, row, text};
use iced::{Alignment, Element};

use crate::ui::crime_detail::DetailMessage;
use crate::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerMessage {
    Year(i32),
    Month(i32),
    Day(i32),
    Hour(i32),
    Minute(i32),
    Confirm,
    Cancel,
}

/// Which picker is open
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Picker {
    Date(DatePicker),
    Time(TimePicker),
}

impl Picker {
    /// Apply a stepper message. Confirm and Cancel are handled by the owner.
    pub fn step(&mut self, message: PickerMessage) {
        match (self, message) {
            (Picker::Date(picker), PickerMessage::Year(delta)) => picker.step_year(delta),
            (Picker::Date(picker), PickerMessage::Month(delta)) => picker.step_month(delta),
            (Picker::Date(picker), PickerMessage::Day(delta)) => picker.step_day(delta),
            (Picker::Time(picker), PickerMessage::Hour(delta)) => picker.step_hour(delta),
            (Picker::Time(picker), PickerMessage::Minute(delta)) => picker.step_minute(delta),
            _ => {}
        }
    }

    /// New timestamp for a crime currently dated `current`
    pub fn apply(&self, current: DateTime<Utc>) -> DateTime<Utc> {
        let local = to_local(current);
        let picked = match self {
            Picker::Date(picker) => picker.apply(local),
            Picker::Time(picker) => picker.apply(local),
        };
        from_local(picked)
    }

    pub fn view(&self) -> Element<'_, Message> {
        let steppers = match self {
            Picker::Date(picker) => column![
                stepper("Year", picker.year.to_string(), PickerMessage::Year),
                stepper("Month", format!("{:02}", picker.month), PickerMessage::Month),
                stepper("Day", format!("{:02}", picker.date().day()), PickerMessage::Day),
            ],
            Picker::Time(picker) => column![
                stepper("Hour", format!("{:02}", picker.hour), PickerMessage::Hour),
                stepper("Minute", format!("{:02}", picker.minute), PickerMessage::Minute),
            ],
        };

        column![
            steppers.spacing(8),
            row![
                button("Cancel").on_press(picker_message(PickerMessage::Cancel)),
                button("OK").on_press(picker_message(PickerMessage::Confirm)),
            ]
            .spacing(10),
        ]
        .spacing(12)
        .into()
    }
}

fn picker_message(message: PickerMessage) -> Message {
    Message::Detail(DetailMessage::Picker(message))
}

fn stepper<'a>(label: &'a str, value: String, step: fn(i32) -> PickerMessage) -> Element<'a, Message> {
    row![
        text(label).width(70),
        button("-").on_press(picker_message(step(-1))),
        text(value).width(50),
        button("+").on_press(picker_message(step(1))),
    ]
    .spacing(8)
    .align_y(Alignment::Center)
    .into()
}

/// Year/month/day selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatePicker {
    year: i32,
    month: u32,
    day: u32,
}

impl DatePicker {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
            day: date.day(),
        }
    }

    pub fn step_year(&mut self, delta: i32) {
        self.year = (self.year + delta).clamp(1, 9999);
    }

    /// Months wrap into the neighbouring year
    pub fn step_month(&mut self, delta: i32) {
        let months = self.year * 12 + self.month as i32 - 1 + delta;
        self.year = months.div_euclid(12).clamp(1, 9999);
        self.month = months.rem_euclid(12) as u32 + 1;
    }

    /// Days wrap within the month
    pub fn step_day(&mut self, delta: i32) {
        let len = days_in_month(self.year, self.month) as i32;
        let current = self.day.min(len as u32) as i32 - 1;
        self.day = (current + delta).rem_euclid(len) as u32 + 1;
    }

    /// Selected date, with the day clamped to the month length
    pub fn date(&self) -> NaiveDate {
        let day = self.day.min(days_in_month(self.year, self.month));
        NaiveDate::from_ymd_opt(self.year, self.month, day).unwrap_or_default()
    }

    pub fn apply(&self, current: NaiveDateTime) -> NaiveDateTime {
        self.date().and_time(current.time())
    }
}

/// 24-hour hour/minute selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimePicker {
    hour: u32,
    minute: u32,
}

impl TimePicker {
    pub fn new(time: NaiveDateTime) -> Self {
        Self {
            hour: time.hour(),
            minute: time.minute(),
        }
    }

    pub fn step_hour(&mut self, delta: i32) {
        self.hour = (self.hour as i32 + delta).rem_euclid(24) as u32;
    }

    pub fn step_minute(&mut self, delta: i32) {
        self.minute = (self.minute as i32 + delta).rem_euclid(60) as u32;
    }

    /// Same day, picked hour and minute, seconds reset
    pub fn apply(&self, current: NaiveDateTime) -> NaiveDateTime {
        current
            .date()
            .and_hms_opt(self.hour, self.minute, 0)
            .unwrap_or(current)
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

/// Wall-clock time of a stored timestamp
pub fn to_local(date: DateTime<Utc>) -> NaiveDateTime {
    date.with_timezone(&Local).naive_local()
}

/// Stored timestamp for a wall-clock time. Times skipped by a DST change
/// are read as UTC.
pub fn from_local(naive: NaiveDateTime) -> DateTime<Utc> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}
