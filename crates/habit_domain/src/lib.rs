pub mod error;
pub mod repo;
pub mod service;
pub mod store;

pub use crate::error::{StoreError, StoreResult};
pub use crate::repo::{HabitRepository, InMemoryHabitRepository};
pub use crate::service::{HabitService, HabitServiceBuilder, NewHabit};
pub use crate::store::JsonFileHabitRepository;
