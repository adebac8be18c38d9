pub mod age;
pub mod calculator;
pub mod card;
pub mod config;
pub mod error;
pub mod logger;
pub mod registration;
pub mod scheduler;
pub mod sensor;
pub mod store;

pub use calculator::{AnniversaryWindow, BirthInstant, ProgressResult, evaluate};
pub use error::{BirthdayError, Result};
pub use registration::{BirthEdit, BirthdayStore, MemoryStore, Registration, RegistrationForm};
pub use scheduler::{Clock, Scheduler, StateBoard, SystemClock};
pub use store::JsonFileStore;
